//! Core types for external resource reconciliation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Connection details published by an external resource.
///
/// Values are bytes because they usually end up in a secret.
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// What an external client found when it looked at the real world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    /// The external resource exists
    pub exists: bool,
    /// The external resource matches the desired spec
    pub up_to_date: bool,
    /// Details to publish alongside the resource
    pub connection_details: ConnectionDetails,
}

impl Observation {
    /// Nothing exists yet.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// A managed resource as handed over by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Managed<S> {
    /// Stable identity of the resource
    pub name: String,
    /// The resource is being deleted
    #[serde(default)]
    pub deleting: bool,
    /// Desired state
    pub spec: S,
}

impl<S> Managed<S> {
    /// A live (not deleting) resource.
    pub fn new(name: impl Into<String>, spec: S) -> Self {
        Self {
            name: name.into(),
            deleting: false,
            spec,
        }
    }

    /// The same resource, marked for deletion.
    #[must_use]
    pub fn deleting(mut self) -> Self {
        self.deleting = true;
        self
    }
}

/// Result of one reconcile pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ReconcileOutcome {
    /// Resource did not exist and was created
    Created,
    /// Resource existed but drifted and was updated
    Updated,
    /// Resource was deleted
    Deleted,
    /// Resource already matched the desired state
    UpToDate,
    /// Resource is being deleted and was already gone
    Absent,
    /// The pass failed
    Failed { error: String },
}

impl ReconcileOutcome {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Updated | Self::Deleted)
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Deleted => f.write_str("deleted"),
            Self::UpToDate => f.write_str("up to date"),
            Self::Absent => f.write_str("absent"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// Outcome of reconciling one named resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Resource name
    pub name: String,
    /// What happened
    pub outcome: ReconcileOutcome,
    /// Details published by the last successful step
    pub connection_details: ConnectionDetails,
}

impl ReconcileReport {
    /// A report for a failed pass.
    pub fn failed(name: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            outcome: ReconcileOutcome::Failed {
                error: error.to_string(),
            },
            connection_details: ConnectionDetails::new(),
        }
    }
}

/// Summary of reconcile results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub up_to_date: usize,
    pub absent: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Check if the batch was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.up_to_date + self.absent + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ReconcileSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.up_to_date += other.up_to_date;
        self.absent += other.absent;
        self.failed += other.failed;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Deleted => self.deleted += 1,
            ReconcileOutcome::UpToDate => self.up_to_date += 1,
            ReconcileOutcome::Absent => self.absent += 1,
            ReconcileOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Summarize a batch of reports.
    pub fn from_reports(reports: &[ReconcileReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.add_result(&report.outcome);
        }
        summary
    }
}

/// Options for batch reconciliation
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Number of resources reconciled in parallel
    pub jobs: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { jobs: 4 }
    }
}
