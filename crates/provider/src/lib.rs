//! # provider
//!
//! Reconcile Terraform configurations against the real world.
//!
//! Given a desired spec and an identity, the provider:
//! - keeps an isolated, owner-only workspace per identity ([`WorkspaceManager`])
//! - renders the spec into engine inputs ([`render()`])
//! - drives `init`/`plan`/`apply`/`destroy`/`show` through [`tfkit`]
//! - reports existence and drift as an [`Observation`](declarative::Observation)
//!
//! The lifecycle operations are exposed through the [`declarative`] traits:
//! [`TerraformConnector`] implements [`Connector`](declarative::Connector) and
//! hands out [`TerraformExternal`] clients.
//!
//! ## Example
//!
//! ```no_run
//! use declarative::{Connector, Context, ExternalClient};
//! use provider::{DesiredSpec, ProviderOptions, TerraformConnector, WorkspaceManager};
//! use std::sync::Arc;
//!
//! let backend = tfkit::backend::default_backend().expect("terraform not available");
//! let connector = TerraformConnector::new(
//!     Arc::new(WorkspaceManager::new("/var/lib/tfreconcile")),
//!     Arc::new(backend),
//!     ProviderOptions::default(),
//! );
//!
//! let ctx = Context::background();
//! let spec = DesiredSpec::new("resource \"null_resource\" \"x\" {}\n");
//! let client = connector.connect(&ctx, "demo").expect("connect");
//! if !client.observe(&ctx, &spec).expect("observe").exists {
//!     client.create(&ctx, &spec).expect("create");
//! }
//! ```
//!
//! ## Concurrency
//!
//! Distinct identities never share a directory and may be reconciled in
//! parallel. For one identity the caller is expected to run one operation at
//! a time; workspace creation and removal are additionally guarded by a
//! per-identity lock.

pub mod cancel;
pub mod error;
pub mod external;
pub mod identity;
pub mod manifest;
pub mod observe;
pub mod render;
pub mod spec;
pub mod workspace;

pub use error::{Error, ErrorKind, Result};
pub use external::{TerraformConnector, TerraformExternal};
pub use identity::Identity;
pub use manifest::{Format, Manifest, load_managed};
pub use render::{parse_assignments, render};
pub use spec::{
    BackendSpec, DEFAULT_WORKSPACE, DesiredSpec, GitSource, HttpSource, KIND, ModuleSource,
    ObservePolicy, ProviderOptions,
};
pub use workspace::{Workspace, WorkspaceManager};
