//! Process lifecycle glue: ties a shutdown signal to a run and persists the
//! report.

use std::{future::Future, path::Path};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::Config, domain::ChannelPair, pipeline::orchestrator::Replicator, report::RunReport,
    Result,
};

/// Run once, cancelling when `shutdown` resolves first.
///
/// The report is written to `report_path` whatever the outcome; a failure to
/// write it is logged and does not mask the run's own result.
pub async fn run_until_shutdown<F>(
    replicator: &Replicator,
    pair: ChannelPair,
    report_path: Option<&Path>,
    shutdown: F,
) -> Result<RunReport>
where
    F: Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let run = replicator.run_reported(pair, cancel.clone());
    tokio::pin!(run);
    tokio::pin!(shutdown);

    let (report, result) = tokio::select! {
        out = &mut run => out,
        () = &mut shutdown => {
            info!("shutdown requested, cancelling run");
            cancel.cancel();
            run.await
        }
    };

    if let Some(path) = report_path {
        match report.write_json(path) {
            Ok(()) => info!(path = %path.display(), "run report written"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write run report"),
        }
    }

    result.map(|()| report)
}

/// Run with Ctrl-C as the shutdown signal, using the configured channels and
/// report path.
pub async fn run_until_ctrl_c(replicator: &Replicator, cfg: &Config) -> Result<RunReport> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for ctrl-c, running without it");
            std::future::pending::<()>().await;
        }
    };
    run_until_shutdown(
        replicator,
        cfg.pair(),
        cfg.run_report_path.as_deref(),
        shutdown,
    )
    .await
}
