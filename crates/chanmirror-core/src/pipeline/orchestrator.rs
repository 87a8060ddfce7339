//! One replication run: resolve both channels, read the whole source history,
//! push it through the batcher/dispatcher, report.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::Config,
    domain::ChannelPair,
    pipeline::{
        context::RunContext, dispatch::Dispatcher, history::HistoryFetcher,
        limiter::RateLimiter, resolver::ChannelResolver,
    },
    report::{DispatchStats, RunReport},
    rewrite::CaptionRewriter,
    transport::port::Transport,
    Result,
};

/// Pacing and content knobs for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicationSettings {
    pub sends_per_minute: u32,
    pub page_delay: Duration,
    pub page_limit: usize,
    pub link_preview: bool,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            sends_per_minute: 20,
            page_delay: Duration::from_millis(100),
            page_limit: 100,
            link_preview: false,
        }
    }
}

impl From<&Config> for ReplicationSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            sends_per_minute: cfg.send_rate_per_minute,
            page_delay: cfg.history_page_delay,
            page_limit: cfg.history_page_limit,
            link_preview: cfg.link_preview,
        }
    }
}

pub struct Replicator {
    transport: Arc<dyn Transport>,
    settings: ReplicationSettings,
    rewriter: Arc<CaptionRewriter>,
}

impl Replicator {
    pub fn new(transport: Arc<dyn Transport>, settings: ReplicationSettings) -> Self {
        Self {
            transport,
            settings,
            rewriter: Arc::new(CaptionRewriter::default()),
        }
    }

    pub fn with_rewriter(mut self, rewriter: CaptionRewriter) -> Self {
        self.rewriter = Arc::new(rewriter);
        self
    }

    /// Build from config, loading rewrite rules if a file is configured.
    pub fn from_config(transport: Arc<dyn Transport>, cfg: &Config) -> Result<Self> {
        let header = cfg.caption_header.clone();
        let footer = cfg.caption_footer.clone();
        let rewriter = match &cfg.rewrite_rules_file {
            Some(path) => CaptionRewriter::load(path, header, footer)?,
            None => CaptionRewriter::new(Vec::new(), header, footer)?,
        };
        Ok(Self::new(transport, ReplicationSettings::from(cfg)).with_rewriter(rewriter))
    }

    /// Run to completion and return the report alongside the outcome.
    ///
    /// The report is produced for failed and cancelled runs too, with the
    /// counters reached before the run stopped.
    pub async fn run_reported(
        &self,
        pair: ChannelPair,
        cancel: CancellationToken,
    ) -> (RunReport, Result<()>) {
        let started_at = Utc::now();
        let mut fetched = 0usize;
        let mut stats = DispatchStats::default();

        let result = self.execute(pair, cancel, &mut fetched, &mut stats).await;
        match result {
            Ok(()) => {
                info!(
                    source = pair.source.0,
                    destination = pair.destination.0,
                    fetched,
                    texts = stats.texts_sent,
                    media = stats.media_sent,
                    albums = stats.batches_sent,
                    album_items = stats.batch_items_sent,
                    restricted = stats.restricted_skipped,
                    unsupported = stats.unsupported_dropped,
                    empty = stats.empty_skipped,
                    "replication finished"
                );
                (RunReport::completed(pair, started_at, fetched, stats), Ok(()))
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!(fetched, sent = stats.sends(), "replication cancelled");
                } else {
                    error!(fetched, sent = stats.sends(), error = %e, "replication failed");
                }
                (
                    RunReport::aborted(pair, started_at, fetched, stats, &e),
                    Err(e),
                )
            }
        }
    }

    pub async fn run(&self, pair: ChannelPair, cancel: CancellationToken) -> Result<RunReport> {
        let (report, result) = self.run_reported(pair, cancel).await;
        result.map(|()| report)
    }

    async fn execute(
        &self,
        pair: ChannelPair,
        cancel: CancellationToken,
        fetched: &mut usize,
        stats: &mut DispatchStats,
    ) -> Result<()> {
        let limiter = RateLimiter::per_minute(self.settings.sends_per_minute);
        info!(
            source = pair.source.0,
            destination = pair.destination.0,
            send_interval_ms = limiter.interval().as_millis() as u64,
            "replication started"
        );

        let mut ctx = RunContext::new(
            self.transport.clone(),
            limiter,
            cancel,
            self.settings.link_preview,
        );

        let resolver = ChannelResolver;
        let destination = resolver.resolve(&ctx, pair.destination).await?;
        let source = resolver.resolve(&ctx, pair.source).await?;

        let fetcher = HistoryFetcher::new(self.settings.page_limit, self.settings.page_delay);
        let messages = fetcher.fetch(&ctx, &source).await?;
        *fetched = messages.len();

        let mut dispatcher = Dispatcher::new(destination, self.rewriter.clone());
        let result = dispatcher.dispatch_all(&mut ctx, messages).await;
        *stats = dispatcher.stats();
        result
    }
}
