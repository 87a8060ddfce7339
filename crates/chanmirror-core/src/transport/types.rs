use crate::domain::{ChannelId, CorrelationId, GroupedId, MessageId};

/// Formatting range over a message body, in UTF-16 code units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEntity {
    pub offset: i32,
    pub length: i32,
    pub kind: EntityKind,
}

impl TextEntity {
    pub fn new(offset: i32, length: i32, kind: EntityKind) -> Self {
        Self {
            offset,
            length,
            kind,
        }
    }

    pub fn end(&self) -> i32 {
        self.offset.saturating_add(self.length)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    Pre { language: String },
    TextUrl { url: String },
    Url,
    Mention,
    Hashtag,
    Cashtag,
    Email,
    Phone,
    BotCommand,
    Blockquote { collapsed: bool },
    CustomEmoji { document_id: i64 },
}

/// Remote identity of a stored media object.
///
/// Sends re-reference this handle; bytes are never downloaded or uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaHandle {
    pub id: i64,
    pub access_hash: i64,
    pub file_reference: Vec<u8>,
}

/// Media attached to a source message, as reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaRef {
    Photo(MediaHandle),
    Document(MediaHandle),
    /// Anything the pipeline cannot re-send by handle (polls, geo, web pages,
    /// empty photos...). `kind` is only used for logging.
    Unsupported { kind: String },
}

impl MediaRef {
    pub fn sendable(&self) -> Option<SendableMedia> {
        match self {
            Self::Photo(h) => Some(SendableMedia::Photo(h.clone())),
            Self::Document(h) => Some(SendableMedia::Document(h.clone())),
            Self::Unsupported { .. } => None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Photo(_) => "photo",
            Self::Document(_) => "document",
            Self::Unsupported { kind } => kind,
        }
    }
}

/// Media that can be sent by handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendableMedia {
    Photo(MediaHandle),
    Document(MediaHandle),
}

/// One historical message from the source channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceMessage {
    pub id: MessageId,
    pub text: String,
    pub entities: Vec<TextEntity>,
    pub media: Option<MediaRef>,
    pub grouped_id: Option<GroupedId>,
}

/// Entry of a history page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryItem {
    Message(SourceMessage),
    /// Service or empty entry: advances the cursor, never forwarded.
    Skipped(MessageId),
}

impl HistoryItem {
    pub fn id(&self) -> MessageId {
        match self {
            Self::Message(m) => m.id,
            Self::Skipped(id) => *id,
        }
    }
}

/// One page of history, newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryPage {
    Messages(Vec<HistoryItem>),
    /// The remote answered with a shape the transport could not map to a
    /// channel message list. Pagination stops here.
    Unrecognized,
}

/// Raw answer to a channel lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub id: ChannelId,
    pub access_hash: Option<i64>,
}

/// Member of a batched (album) send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchEntry {
    pub media: SendableMedia,
    pub caption: String,
    pub entities: Vec<TextEntity>,
    pub random_id: CorrelationId,
}
