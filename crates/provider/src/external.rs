//! Lifecycle operations for Terraform resources.
//!
//! [`TerraformConnector`] turns an identity into a [`TerraformExternal`]
//! bound to that identity's workspace. Each operation renders the current
//! spec first, so the engine always sees the latest desired state.

use crate::cancel::ContextInterrupt;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::observe::{self, prepare, to_connection_details};
use crate::render::render;
use crate::spec::{DesiredSpec, ProviderOptions};
use crate::workspace::{Workspace, WorkspaceManager};
use declarative::{ConnectionDetails, Connector, Context, ExternalClient, Observation};
use std::sync::Arc;
use tfkit::{Backend, Phase, Session};

/// Opens [`TerraformExternal`] clients.
pub struct TerraformConnector {
    workspaces: Arc<WorkspaceManager>,
    backend: Arc<dyn Backend>,
    options: ProviderOptions,
}

impl TerraformConnector {
    /// Connector running `backend` in workspaces managed by `workspaces`.
    pub fn new(
        workspaces: Arc<WorkspaceManager>,
        backend: Arc<dyn Backend>,
        options: ProviderOptions,
    ) -> Self {
        Self {
            workspaces,
            backend,
            options,
        }
    }

    /// The workspace manager.
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }
}

impl Connector for TerraformConnector {
    type Spec = DesiredSpec;
    type Error = Error;
    type Client = TerraformExternal;

    fn connect(&self, _ctx: &Context, identity: &str) -> Result<TerraformExternal> {
        let run = || -> Result<TerraformExternal> {
            let identity = Identity::new(identity)?;
            let workspace = self.workspaces.ensure(&identity)?;
            Ok(TerraformExternal {
                workspace,
                workspaces: Arc::clone(&self.workspaces),
                backend: Arc::clone(&self.backend),
                options: self.options.clone(),
            })
        };
        run().map_err(|e| e.in_operation("connect"))
    }
}

/// Client for one identity's workspace.
///
/// Holds no engine session between calls; every operation starts a fresh one.
pub struct TerraformExternal {
    workspace: Workspace,
    workspaces: Arc<WorkspaceManager>,
    backend: Arc<dyn Backend>,
    options: ProviderOptions,
}

impl TerraformExternal {
    /// Workspace this client works in.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn session(&self) -> Session<'_> {
        Session::new(self.backend.as_ref(), self.workspace.path())
    }

    /// Render, plan, apply when the plan has changes, read outputs.
    fn converge(&self, ctx: &Context, spec: &DesiredSpec) -> Result<ConnectionDetails> {
        let interrupt = ContextInterrupt(ctx);
        render(&self.workspace, spec)?;

        let mut session = self.session();
        prepare(&mut session, spec, &interrupt)?;

        if session.plan(&interrupt).map_err(Error::execution(Phase::Plan))? {
            session.apply(&interrupt).map_err(Error::execution(Phase::Apply))?;
            log::info!("{}: applied changes", self.workspace.identity());
        } else {
            log::debug!("{}: plan has no changes", self.workspace.identity());
        }

        session
            .outputs(&interrupt)
            .map_err(Error::execution(Phase::Output))?;
        Ok(to_connection_details(&session.into_result().outputs))
    }

    fn destroy(&self, ctx: &Context, spec: &DesiredSpec) -> Result<()> {
        let interrupt = ContextInterrupt(ctx);
        render(&self.workspace, spec)?;

        let mut session = self.session();
        prepare(&mut session, spec, &interrupt)?;
        session
            .destroy(&interrupt)
            .map_err(Error::execution(Phase::Destroy))?;
        log::info!("{}: destroy complete", self.workspace.identity());

        // The resource is gone; a leftover directory is only clutter
        if let Err(e) = self.workspaces.teardown(self.workspace.identity()) {
            log::warn!("{}: workspace teardown failed: {}", self.workspace.identity(), e);
        }
        Ok(())
    }
}

impl ExternalClient for TerraformExternal {
    type Spec = DesiredSpec;
    type Error = Error;

    fn observe(&self, ctx: &Context, spec: &DesiredSpec) -> Result<Observation> {
        let run = || -> Result<Observation> {
            render(&self.workspace, spec)?;
            let mut session = self.session();
            observe::observe(
                &mut session,
                spec,
                self.options.observe_policy,
                &ContextInterrupt(ctx),
            )
        };
        run().map_err(|e| e.in_operation("observe"))
    }

    fn create(&self, ctx: &Context, spec: &DesiredSpec) -> Result<ConnectionDetails> {
        self.converge(ctx, spec)
            .map_err(|e| e.in_operation("create"))
    }

    // Same procedure as create: the engine converges whatever exists.
    fn update(&self, ctx: &Context, spec: &DesiredSpec) -> Result<ConnectionDetails> {
        self.converge(ctx, spec)
            .map_err(|e| e.in_operation("update"))
    }

    fn delete(&self, ctx: &Context, spec: &DesiredSpec) -> Result<()> {
        self.destroy(ctx, spec)
            .map_err(|e| e.in_operation("delete"))
    }

    fn disconnect(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}
