//! Scripted transport and message builders shared by unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChannelHandle, ChannelId, CorrelationId, GroupedId, MessageId},
    errors::{TransportError, TransportResult},
    pipeline::{context::RunContext, limiter::RateLimiter},
    transport::{
        port::Transport,
        types::{
            BatchEntry, HistoryPage, MediaHandle, MediaRef, ResolvedChannel, SendableMedia,
            SourceMessage, TextEntity,
        },
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Resolve(ChannelId),
    History {
        peer: ChannelId,
        offset: Option<MessageId>,
    },
    Text {
        peer: ChannelId,
        text: String,
        entities: Vec<TextEntity>,
        link_preview: bool,
        random_id: CorrelationId,
    },
    Media {
        peer: ChannelId,
        media: SendableMedia,
        caption: String,
        entities: Vec<TextEntity>,
        random_id: CorrelationId,
    },
    Batch {
        peer: ChannelId,
        entries: Vec<BatchEntry>,
    },
}

impl Call {
    pub fn is_send(&self) -> bool {
        matches!(self, Call::Text { .. } | Call::Media { .. } | Call::Batch { .. })
    }
}

#[derive(Default)]
pub struct FakeTransport {
    channels: Mutex<HashMap<ChannelId, ResolvedChannel>>,
    history: Mutex<VecDeque<TransportResult<HistoryPage>>>,
    resolve_failures: Mutex<VecDeque<TransportError>>,
    send_failures: Mutex<VecDeque<TransportError>>,
    batch_failures: Mutex<VecDeque<TransportError>>,
    calls: Mutex<Vec<Call>>,
    next_id: Mutex<i32>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, id: ChannelId, access_hash: i64) {
        self.set_resolved(ResolvedChannel {
            id,
            access_hash: Some(access_hash),
        });
    }

    pub fn set_resolved(&self, resolved: ResolvedChannel) {
        self.channels.lock().unwrap().insert(resolved.id, resolved);
    }

    /// Pages are served in order; once exhausted every request gets an empty page.
    pub fn push_history(&self, page: TransportResult<HistoryPage>) {
        self.history.lock().unwrap().push_back(page);
    }

    pub fn fail_next_resolve(&self, err: TransportError) {
        self.resolve_failures.lock().unwrap().push_back(err);
    }

    /// Fail the next send of any kind.
    pub fn fail_next_send(&self, err: TransportError) {
        self.send_failures.lock().unwrap().push_back(err);
    }

    /// Fail the next batch send only.
    pub fn fail_next_batch(&self, err: TransportError) {
        self.batch_failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Send attempts, including failed ones.
    pub fn sends(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_send).collect()
    }

    pub fn resolve_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Resolve(_)))
            .count()
    }

    pub fn history_offsets(&self) -> Vec<Option<MessageId>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::History { offset, .. } => Some(offset),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn sent(&self) -> TransportResult<MessageId> {
        if let Some(err) = self.send_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(MessageId(*next))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn resolve_channel(&self, channel: ChannelId) -> TransportResult<ResolvedChannel> {
        self.record(Call::Resolve(channel));
        if let Some(err) = self.resolve_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.channels
            .lock()
            .unwrap()
            .get(&channel)
            .copied()
            .ok_or_else(|| TransportError::ChannelInaccessible("CHANNEL_INVALID".to_string()))
    }

    async fn get_history(
        &self,
        peer: &ChannelHandle,
        offset_id: Option<MessageId>,
        _limit: usize,
    ) -> TransportResult<HistoryPage> {
        self.record(Call::History {
            peer: peer.channel_id,
            offset: offset_id,
        });
        self.history
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(HistoryPage::Messages(Vec::new())))
    }

    async fn send_text(
        &self,
        peer: &ChannelHandle,
        text: &str,
        entities: &[TextEntity],
        link_preview: bool,
        random_id: CorrelationId,
    ) -> TransportResult<MessageId> {
        self.record(Call::Text {
            peer: peer.channel_id,
            text: text.to_string(),
            entities: entities.to_vec(),
            link_preview,
            random_id,
        });
        self.sent()
    }

    async fn send_media(
        &self,
        peer: &ChannelHandle,
        media: &SendableMedia,
        caption: &str,
        entities: &[TextEntity],
        random_id: CorrelationId,
    ) -> TransportResult<MessageId> {
        self.record(Call::Media {
            peer: peer.channel_id,
            media: media.clone(),
            caption: caption.to_string(),
            entities: entities.to_vec(),
            random_id,
        });
        self.sent()
    }

    async fn send_batch(
        &self,
        peer: &ChannelHandle,
        entries: &[BatchEntry],
    ) -> TransportResult<MessageId> {
        self.record(Call::Batch {
            peer: peer.channel_id,
            entries: entries.to_vec(),
        });
        if let Some(err) = self.batch_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.sent()
    }
}

/// Context with an unthrottled limiter and a fresh token.
pub fn test_context(fake: Arc<FakeTransport>) -> RunContext {
    RunContext::new(
        fake,
        RateLimiter::new(Duration::ZERO),
        CancellationToken::new(),
        false,
    )
}

pub fn photo_handle(n: i64) -> MediaHandle {
    MediaHandle {
        id: n,
        access_hash: n * 10,
        file_reference: vec![n as u8],
    }
}

pub fn text(id: i32, body: &str) -> SourceMessage {
    SourceMessage {
        id: MessageId(id),
        text: body.to_string(),
        entities: Vec::new(),
        media: None,
        grouped_id: None,
    }
}

pub fn photo(id: i32, caption: &str, handle: i64) -> SourceMessage {
    SourceMessage {
        media: Some(MediaRef::Photo(photo_handle(handle))),
        ..text(id, caption)
    }
}

pub fn album_photo(id: i32, group: i64, caption: &str) -> SourceMessage {
    SourceMessage {
        grouped_id: Some(GroupedId(group)),
        ..photo(id, caption, id as i64)
    }
}

pub fn album_doc(id: i32, group: i64) -> SourceMessage {
    SourceMessage {
        media: Some(MediaRef::Document(photo_handle(id as i64))),
        grouped_id: Some(GroupedId(group)),
        ..text(id, "")
    }
}

pub fn album_text(id: i32, group: i64, body: &str) -> SourceMessage {
    SourceMessage {
        grouped_id: Some(GroupedId(group)),
        ..text(id, body)
    }
}

pub fn album_unsupported(id: i32, group: i64) -> SourceMessage {
    SourceMessage {
        media: Some(MediaRef::Unsupported {
            kind: "poll".to_string(),
        }),
        grouped_id: Some(GroupedId(group)),
        ..text(id, "")
    }
}
