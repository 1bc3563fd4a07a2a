//! Decide whether the external resource exists and is up to date.

use crate::error::{Error, Result};
use crate::spec::{DesiredSpec, ObservePolicy};
use declarative::{ConnectionDetails, Observation};
use std::collections::BTreeMap;
use tfkit::{ExecutionResult, Interrupt, Phase, Session};

/// Initialize the workspace and select the spec's engine workspace.
pub fn prepare(session: &mut Session<'_>, spec: &DesiredSpec, interrupt: &dyn Interrupt) -> Result<()> {
    session.init(interrupt).map_err(Error::execution(Phase::Init))?;
    session
        .select_workspace(spec.selected_workspace(), interrupt)
        .map_err(Error::execution(Phase::Workspace))
}

/// Observe the state behind a rendered workspace.
///
/// A failing or empty `show` means nothing exists yet; that is the signal
/// for the scheduler to create. Cancellation and deadline errors are still
/// returned so an interrupted observe is never mistaken for absence.
pub fn observe(
    session: &mut Session<'_>,
    spec: &DesiredSpec,
    policy: ObservePolicy,
    interrupt: &dyn Interrupt,
) -> Result<Observation> {
    prepare(session, spec, interrupt)?;

    if let Err(e) = session.show(interrupt) {
        if e.is_interruption() {
            return Err(Error::execution(Phase::Show)(e));
        }
        log::debug!("{}: show failed, treating as absent: {}", session.dir().display(), e);
        return Ok(Observation::absent());
    }

    if !session.result().current_state_exists {
        return Ok(Observation::absent());
    }

    if policy == ObservePolicy::Plan {
        session.plan(interrupt).map_err(Error::execution(Phase::Plan))?;
    }

    Ok(observation(session.result(), policy))
}

/// Observation derived from the signals a session gathered.
fn observation(result: &ExecutionResult, policy: ObservePolicy) -> Observation {
    if !result.current_state_exists {
        return Observation::absent();
    }
    let up_to_date = match policy {
        ObservePolicy::Existence => true,
        ObservePolicy::Plan => !result.has_changes,
    };
    Observation {
        exists: true,
        up_to_date,
        connection_details: to_connection_details(&result.outputs),
    }
}

/// Outputs as connection details.
pub fn to_connection_details(outputs: &BTreeMap<String, String>) -> ConnectionDetails {
    outputs
        .iter()
        .map(|(name, value)| (name.clone(), value.clone().into_bytes()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(has_changes: bool) -> ExecutionResult {
        ExecutionResult {
            initialized: true,
            has_changes,
            outputs: BTreeMap::from([("id".to_string(), "abc".to_string())]),
            current_state_exists: true,
        }
    }

    #[test]
    fn test_existence_ignores_plan_signal() {
        let obs = observation(&found(true), ObservePolicy::Existence);
        assert!(obs.exists);
        assert!(obs.up_to_date);
        assert_eq!(obs.connection_details["id"], b"abc");
    }

    #[test]
    fn test_plan_changes_mean_drift() {
        assert!(!observation(&found(true), ObservePolicy::Plan).up_to_date);
        assert!(observation(&found(false), ObservePolicy::Plan).up_to_date);
    }

    #[test]
    fn test_no_state_is_absent() {
        let obs = observation(&ExecutionResult::default(), ObservePolicy::Plan);
        assert_eq!(obs, Observation::absent());
    }
}
