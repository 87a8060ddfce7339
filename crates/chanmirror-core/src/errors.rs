use std::time::Duration;

use crate::domain::ChannelId;

/// Failure reported by a transport call.
///
/// Adapters map their protocol-specific errors into this closed set so the
/// pipeline can decide between retrying, skipping and aborting without
/// inspecting error strings.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("flood wait: retry after {0:?}")]
    FloodWait(Duration),

    #[error("forwarding restricted: {0}")]
    ForwardsRestricted(String),

    #[error("channel inaccessible: {0}")]
    ChannelInaccessible(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("rpc error {code}: {name}")]
    Rpc { code: i32, name: String },
}

impl TransportError {
    /// Wait duration requested by the remote service, if this is a flood wait.
    pub fn flood_wait(&self) -> Option<Duration> {
        match self {
            Self::FloodWait(d) => Some(*d),
            _ => None,
        }
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Core error type.
///
/// Everything except `Transport(ForwardsRestricted)` aborts a run; flood waits
/// never reach this type because the retry combinator absorbs them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("cannot resolve channel {channel}: {reason}")]
    Resolution { channel: ChannelId, reason: String },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("run cancelled")]
    Cancelled,
}

impl Error {
    /// True when the destination refused the content because forwarding from
    /// the source is restricted.
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::Transport(TransportError::ForwardsRestricted(_)))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
