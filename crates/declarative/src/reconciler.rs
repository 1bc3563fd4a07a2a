//! Reconcile driver - one observe/converge pass per resource

use crate::context::{Context, ProgressCallback};
use crate::error::Result;
use crate::resource::{Connector, ExternalClient};
use crate::types::{
    ConnectionDetails, Managed, ReconcileOutcome, ReconcileOptions, ReconcileReport,
};
use rayon::prelude::*;

/// Run one reconcile pass for a single resource.
///
/// Connects, observes, then:
/// - deleting: deletes (also when nothing exists, so the client can release
///   whatever it keeps locally) and reports `Deleted` or `Absent`
/// - missing: creates
/// - drifted: updates
/// - otherwise: reports `UpToDate` with the observed connection details
///
/// The client is disconnected whatever the outcome; a disconnect failure is
/// logged and does not change the result.
pub fn reconcile<C: Connector>(
    connector: &C,
    ctx: &Context,
    resource: &Managed<C::Spec>,
) -> std::result::Result<ReconcileReport, C::Error> {
    let client = connector.connect(ctx, &resource.name)?;
    let result = drive(&client, ctx, resource);

    if let Err(e) = client.disconnect(ctx) {
        log::warn!("{}: disconnect failed: {}", resource.name, e);
    }

    result
}

fn drive<T: ExternalClient>(
    client: &T,
    ctx: &Context,
    resource: &Managed<T::Spec>,
) -> std::result::Result<ReconcileReport, T::Error> {
    let observation = client.observe(ctx, &resource.spec)?;
    log::debug!(
        "{}: exists={} up_to_date={}",
        resource.name,
        observation.exists,
        observation.up_to_date
    );

    let (outcome, connection_details) = if resource.deleting {
        client.delete(ctx, &resource.spec)?;
        let outcome = if observation.exists {
            ReconcileOutcome::Deleted
        } else {
            ReconcileOutcome::Absent
        };
        (outcome, ConnectionDetails::new())
    } else if !observation.exists {
        (ReconcileOutcome::Created, client.create(ctx, &resource.spec)?)
    } else if !observation.up_to_date {
        (ReconcileOutcome::Updated, client.update(ctx, &resource.spec)?)
    } else {
        (ReconcileOutcome::UpToDate, observation.connection_details)
    };

    log::info!("{}: {}", resource.name, outcome);
    Ok(ReconcileReport {
        name: resource.name.clone(),
        outcome,
        connection_details,
    })
}

/// Reconcile many resources, each independently.
///
/// Resources run on a dedicated pool of `opts.jobs` threads. A failing
/// resource is reported as [`ReconcileOutcome::Failed`] and does not stop the
/// others. Reports come back in input order.
///
/// The caller must not pass the same name twice: the driver relies on at
/// most one pass per identity being in flight.
pub fn reconcile_all<C, P>(
    connector: &C,
    ctx: &Context,
    resources: &[Managed<C::Spec>],
    opts: &ReconcileOptions,
    progress: &mut P,
) -> Result<Vec<ReconcileReport>>
where
    C: Connector,
    P: ProgressCallback,
{
    progress.on_batch_start(resources.len());

    let reports = if opts.jobs <= 1 || resources.len() <= 1 {
        // Sequential execution
        let mut reports = Vec::with_capacity(resources.len());
        for resource in resources {
            let report = reconcile_one(connector, ctx, resource);
            progress.on_resource_complete(&report);
            reports.push(report);
        }
        reports
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.jobs)
            .build()?;

        let reports: Vec<ReconcileReport> = pool.install(|| {
            resources
                .par_iter()
                .map(|resource| reconcile_one(connector, ctx, resource))
                .collect()
        });

        // The callback is not thread-safe; report after the pool is done
        for report in &reports {
            progress.on_resource_complete(report);
        }
        reports
    };

    progress.on_batch_complete();
    Ok(reports)
}

fn reconcile_one<C: Connector>(
    connector: &C,
    ctx: &Context,
    resource: &Managed<C::Spec>,
) -> ReconcileReport {
    if let Some(done) = ctx.status() {
        return ReconcileReport::failed(&resource.name, format!("not started: {done}"));
    }

    match reconcile(connector, ctx, resource) {
        Ok(report) => report,
        Err(e) => {
            log::warn!("{}: reconcile failed: {}", resource.name, e);
            ReconcileReport::failed(&resource.name, e)
        }
    }
}
