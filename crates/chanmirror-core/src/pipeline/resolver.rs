use tracing::debug;

use crate::{
    domain::{ChannelHandle, ChannelId},
    errors::{Error, TransportError},
    pipeline::{context::RunContext, retry::retry_flood_wait},
    Result,
};

/// Maps a numeric channel id to a handle usable for fetch/send calls.
///
/// Resolves on every call: access hashes are session-scoped, so nothing is
/// cached across runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelResolver;

impl ChannelResolver {
    pub async fn resolve(&self, ctx: &RunContext, channel: ChannelId) -> Result<ChannelHandle> {
        let transport = ctx.transport();
        let resolved = retry_flood_wait(ctx.cancel_token(), "resolve_channel", || {
            transport.resolve_channel(channel)
        })
        .await
        .map_err(|e| match e {
            Error::Transport(TransportError::ChannelInaccessible(reason)) => {
                Error::Resolution { channel, reason }
            }
            Error::Transport(TransportError::UnexpectedResponse(detail)) => {
                Error::UnexpectedResponse(detail)
            }
            Error::Transport(other) => Error::Resolution {
                channel,
                reason: other.to_string(),
            },
            other => other,
        })?;

        if resolved.id != channel {
            return Err(Error::UnexpectedResponse(format!(
                "asked for channel {channel}, got {}",
                resolved.id
            )));
        }
        let Some(access_hash) = resolved.access_hash else {
            return Err(Error::Resolution {
                channel,
                reason: "no access hash returned (not a member?)".to_string(),
            });
        };

        debug!(channel = channel.0, "channel resolved");
        Ok(ChannelHandle {
            channel_id: channel,
            access_hash,
        })
    }
}
