//! Album state machine.
//!
//! Consumes messages oldest first and turns them into send-ready items.
//! Consecutive messages sharing a grouped id are held back and released as a
//! single batch when the group ends (different id, standalone message, or end
//! of stream).

use std::mem;

use tracing::warn;

use crate::{
    domain::{GroupedId, MessageId},
    transport::types::{SendableMedia, SourceMessage, TextEntity},
};

/// Normalised unit of work for the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchItem {
    Text {
        source: MessageId,
        body: String,
        entities: Vec<TextEntity>,
    },
    Media {
        source: MessageId,
        media: SendableMedia,
        caption: String,
        entities: Vec<TextEntity>,
    },
    /// One grouped post. The caption belongs to the first item only.
    Batch {
        items: Vec<BatchItem>,
        caption: String,
        entities: Vec<TextEntity>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchItem {
    pub source: MessageId,
    pub media: SendableMedia,
}

#[derive(Debug, Default)]
enum AlbumState {
    #[default]
    Idle,
    Accumulating {
        grouped_id: GroupedId,
        buffer: Vec<SourceMessage>,
    },
}

#[derive(Debug, Default)]
pub struct AlbumBatcher {
    state: AlbumState,
    dropped_unsupported: usize,
}

impl AlbumBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next message; returns whatever became ready to send.
    pub fn push(&mut self, msg: SourceMessage) -> Vec<DispatchItem> {
        let Some(grouped_id) = msg.grouped_id else {
            let mut out = self.flush();
            out.extend(self.standalone(msg));
            return out;
        };

        if let AlbumState::Accumulating {
            grouped_id: current,
            buffer,
        } = &mut self.state
        {
            if *current == grouped_id {
                buffer.push(msg);
                return Vec::new();
            }
        }

        let out = self.flush();
        self.state = AlbumState::Accumulating {
            grouped_id,
            buffer: vec![msg],
        };
        out
    }

    /// End of stream: release any pending album.
    pub fn finish(&mut self) -> Vec<DispatchItem> {
        self.flush()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, AlbumState::Idle)
    }

    /// Media dropped so far because it cannot be re-sent by handle.
    pub fn dropped_unsupported(&self) -> usize {
        self.dropped_unsupported
    }

    fn standalone(&mut self, msg: SourceMessage) -> Option<DispatchItem> {
        let SourceMessage {
            id,
            text,
            entities,
            media,
            ..
        } = msg;

        let Some(media) = media else {
            return Some(DispatchItem::Text {
                source: id,
                body: text,
                entities,
            });
        };

        match media.sendable() {
            Some(media) => Some(DispatchItem::Media {
                source: id,
                media,
                caption: text,
                entities,
            }),
            None => {
                warn!(message = id.0, kind = media.kind(), "unsupported media, skipping");
                self.dropped_unsupported += 1;
                None
            }
        }
    }

    fn flush(&mut self) -> Vec<DispatchItem> {
        let AlbumState::Accumulating { grouped_id, buffer } = mem::take(&mut self.state) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut items = Vec::new();
        let mut caption = None;

        for msg in buffer {
            let Some(media) = msg.media else {
                // Text cannot join a media group; it goes out on its own.
                out.push(DispatchItem::Text {
                    source: msg.id,
                    body: msg.text,
                    entities: msg.entities,
                });
                continue;
            };

            let Some(sendable) = media.sendable() else {
                warn!(
                    message = msg.id.0,
                    album = grouped_id.0,
                    kind = media.kind(),
                    "unsupported media in album, dropping item"
                );
                self.dropped_unsupported += 1;
                continue;
            };

            if caption.is_none() {
                caption = Some((msg.text, msg.entities));
            }
            items.push(BatchItem {
                source: msg.id,
                media: sendable,
            });
        }

        if let Some((caption, entities)) = caption {
            out.push(DispatchItem::Batch {
                items,
                caption,
                entities,
            });
        }
        out
    }
}

/// Run a whole ordered history through a fresh batcher.
pub fn plan(messages: impl IntoIterator<Item = SourceMessage>) -> Vec<DispatchItem> {
    let mut batcher = AlbumBatcher::new();
    let mut out = Vec::new();
    for msg in messages {
        out.extend(batcher.push(msg));
    }
    out.extend(batcher.finish());
    out
}
