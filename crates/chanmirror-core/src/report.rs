use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{domain::ChannelPair, errors::Error, Result};

/// Counters collected while dispatching one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub texts_sent: usize,
    pub media_sent: usize,
    pub batches_sent: usize,
    pub batch_items_sent: usize,
    pub restricted_skipped: usize,
    pub unsupported_dropped: usize,
    pub empty_skipped: usize,
}

impl DispatchStats {
    pub fn sends(&self) -> usize {
        self.texts_sent + self.media_sent + self.batches_sent
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed { error: String },
}

/// Terminal result of a run, as handed to whoever launched it.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub pair: ChannelPair,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub stats: DispatchStats,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn completed(
        pair: ChannelPair,
        started_at: DateTime<Utc>,
        fetched: usize,
        stats: DispatchStats,
    ) -> Self {
        Self {
            pair,
            started_at,
            finished_at: Utc::now(),
            fetched,
            stats,
            outcome: RunOutcome::Completed,
        }
    }

    /// Report for a run that stopped early; counters cover what was done
    /// before the error.
    pub fn aborted(
        pair: ChannelPair,
        started_at: DateTime<Utc>,
        fetched: usize,
        stats: DispatchStats,
        err: &Error,
    ) -> Self {
        let outcome = if err.is_cancelled() {
            RunOutcome::Cancelled
        } else {
            RunOutcome::Failed {
                error: err.to_string(),
            }
        };
        Self {
            pair,
            started_at,
            finished_at: Utc::now(),
            fetched,
            stats,
            outcome,
        }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body)?;
        Ok(())
    }
}
