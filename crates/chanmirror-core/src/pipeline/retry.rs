//! Flood-wait retry combinator.
//!
//! The remote service tells us exactly how long to back off, so retries are
//! unbounded and never grow the delay. Any error without a wait duration is
//! handed back to the caller untouched.

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    errors::{Error, TransportError, TransportResult},
    Result,
};

/// Sleep for `wait`, or fail with `Error::Cancelled` as soon as the run is cancelled.
pub async fn sleep_or_cancel(cancel: &CancellationToken, wait: Duration) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = sleep(wait) => Ok(()),
    }
}

/// Run `op` until it succeeds or fails with an error `wait_of` does not map to
/// a wait duration.
///
/// The call itself is raced against `cancel`, so a hung request does not keep
/// a cancelled run alive.
pub async fn retry_transient<T, E, Op, Fut, W>(
    cancel: &CancellationToken,
    action: &str,
    wait_of: W,
    mut op: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    W: Fn(&E) -> Option<Duration>,
    Error: From<E>,
{
    let mut retries = 0u32;
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            res = op() => res,
        };

        match outcome {
            Ok(v) => {
                if retries > 0 {
                    debug!(action, retries, "succeeded after flood wait");
                }
                return Ok(v);
            }
            Err(e) => {
                let Some(wait) = wait_of(&e) else {
                    return Err(e.into());
                };
                retries += 1;
                warn!(
                    action,
                    retries,
                    wait_secs = wait.as_secs_f64(),
                    "flood wait triggered"
                );
                sleep_or_cancel(cancel, wait).await?;
            }
        }
    }
}

/// `retry_transient` keyed on `TransportError::FloodWait`.
pub async fn retry_flood_wait<T, Op, Fut>(
    cancel: &CancellationToken,
    action: &str,
    op: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = TransportResult<T>>,
{
    retry_transient(cancel, action, TransportError::flood_wait, op).await
}
