//! # Declarative
//!
//! A contract for reconciling external resources.
//!
//! This crate provides the abstractions a reconcile scheduler drives: look at
//! the real world, then create, update or delete until it matches the
//! desired state.
//!
//! ## Core Concepts
//!
//! - **Connector**: Opens a client for one resource identity
//! - **ExternalClient**: observe / create / update / delete / disconnect for
//!   that identity
//! - **Observation**: Whether the resource exists and is up to date
//! - **Context**: Cancellation token and optional deadline passed to every call
//! - **reconcile / reconcile_all**: A single observe-then-converge pass, for
//!   one resource or many in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Context, Managed, ReconcileOptions, NoProgress, reconcile_all};
//!
//! let connector = MyConnector::new();
//! let resources = vec![Managed::new("db", spec_a), Managed::new("cache", spec_b)];
//!
//! let reports = reconcile_all(
//!     &connector,
//!     &Context::background(),
//!     &resources,
//!     &ReconcileOptions { jobs: 2 },
//!     &mut NoProgress,
//! )?;
//! ```
//!
//! ## Concurrency
//!
//! The driver assumes at most one in-flight pass per identity. Distinct
//! identities are independent and may run in parallel.

pub mod context;
pub mod error;
pub mod reconciler;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{CancelToken, Context, Done, NoProgress, ProgressCallback};
pub use error::{Error, Result};
pub use reconciler::{reconcile, reconcile_all};
pub use resource::{Connector, ExternalClient};
pub use types::{
    ConnectionDetails, Managed, Observation, ReconcileOptions, ReconcileOutcome, ReconcileReport,
    ReconcileSummary,
};
