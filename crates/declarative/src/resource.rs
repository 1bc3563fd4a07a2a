//! Lifecycle traits for external resources
//!
//! A [`Connector`] opens an [`ExternalClient`] for one resource identity. The
//! client exposes the operations a reconcile scheduler drives: observe the
//! real world, then create, update or delete to converge it.

use crate::context::Context;
use crate::types::{ConnectionDetails, Observation};

/// Operations on one external resource.
///
/// Every call receives the current desired spec snapshot; implementations
/// must not assume the spec is the same between calls.
///
/// # Example
///
/// ```ignore
/// use declarative::{Context, ConnectionDetails, ExternalClient, Observation};
/// use std::path::PathBuf;
///
/// struct FileClient { path: PathBuf }
///
/// impl ExternalClient for FileClient {
///     type Spec = String;
///     type Error = std::io::Error;
///
///     fn observe(&self, _ctx: &Context, spec: &String) -> Result<Observation, Self::Error> {
///         match std::fs::read_to_string(&self.path) {
///             Ok(current) => Ok(Observation {
///                 exists: true,
///                 up_to_date: &current == spec,
///                 ..Default::default()
///             }),
///             Err(_) => Ok(Observation::absent()),
///         }
///     }
///
///     fn create(&self, _ctx: &Context, spec: &String) -> Result<ConnectionDetails, Self::Error> {
///         std::fs::write(&self.path, spec)?;
///         Ok(ConnectionDetails::new())
///     }
///
///     fn update(&self, ctx: &Context, spec: &String) -> Result<ConnectionDetails, Self::Error> {
///         self.create(ctx, spec)
///     }
///
///     fn delete(&self, _ctx: &Context, _spec: &String) -> Result<(), Self::Error> {
///         std::fs::remove_file(&self.path)
///     }
/// }
/// ```
pub trait ExternalClient: Send + Sync {
    /// Desired state type this client understands
    type Spec;
    /// Error returned by every operation
    type Error: std::error::Error + Send + Sync + 'static;

    /// Report whether the resource exists and matches `spec`.
    ///
    /// Must not change the external resource.
    fn observe(&self, ctx: &Context, spec: &Self::Spec) -> Result<Observation, Self::Error>;

    /// Create the resource; returns its connection details.
    fn create(&self, ctx: &Context, spec: &Self::Spec) -> Result<ConnectionDetails, Self::Error>;

    /// Converge an existing resource to `spec`; returns its connection details.
    fn update(&self, ctx: &Context, spec: &Self::Spec) -> Result<ConnectionDetails, Self::Error>;

    /// Delete the resource.
    fn delete(&self, ctx: &Context, spec: &Self::Spec) -> Result<(), Self::Error>;

    /// Release whatever [`Connector::connect`] acquired.
    fn disconnect(&self, _ctx: &Context) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Opens clients for resource identities.
pub trait Connector: Send + Sync {
    /// Desired state type
    type Spec: Send + Sync;
    /// Error returned by connect and by the clients
    type Error: std::error::Error + Send + Sync + 'static;
    /// Client type produced by [`connect`](Self::connect)
    type Client: ExternalClient<Spec = Self::Spec, Error = Self::Error>;

    /// Prepare a client for `identity`.
    fn connect(&self, ctx: &Context, identity: &str) -> Result<Self::Client, Self::Error>;
}
