use std::fmt;

use serde::Serialize;

const DIALOG_CHANNEL_BASE: i64 = 1_000_000_000_000;

/// Channel id (numeric, raw MTProto form without the `-100` dialog prefix).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId(pub i64);

impl ChannelId {
    /// Accept either a raw channel id or its `-100<id>` dialog form.
    ///
    /// Returns `None` for zero and for ids that address users or basic groups.
    pub fn from_dialog_id(id: i64) -> Option<Self> {
        if id <= -DIALOG_CHANNEL_BASE {
            let raw = -id - DIALOG_CHANNEL_BASE;
            (raw > 0).then_some(Self(raw))
        } else if id > 0 {
            Some(Self(id))
        } else {
            None
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message id inside one channel; strictly increasing over time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageId(pub i32);

/// Album identifier shared by every member of a grouped post.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupedId(pub i64);

impl GroupedId {
    /// Zero means "standalone" on the wire.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }
}

/// Resolved peer (id + access hash). Only valid inside the session that
/// resolved it, so it is never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelHandle {
    pub channel_id: ChannelId,
    pub access_hash: i64,
}

/// Input of one replication run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelPair {
    pub source: ChannelId,
    pub destination: ChannelId,
}

/// Per-send random value the remote service uses to deduplicate retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub i64);
