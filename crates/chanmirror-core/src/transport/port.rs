use async_trait::async_trait;

use crate::{
    domain::{ChannelHandle, ChannelId, CorrelationId, MessageId},
    errors::TransportResult,
    transport::types::{
        BatchEntry, HistoryPage, ResolvedChannel, SendableMedia, TextEntity,
    },
};

/// Port to a connected, authenticated messaging session.
///
/// Implementations must not retry flood waits themselves: they report
/// `TransportError::FloodWait` and the pipeline decides.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Look up a channel and its current access hash.
    async fn resolve_channel(&self, channel: ChannelId) -> TransportResult<ResolvedChannel>;

    /// Page of history strictly older than `offset_id` (latest messages when
    /// `None`), newest first.
    async fn get_history(
        &self,
        peer: &ChannelHandle,
        offset_id: Option<MessageId>,
        limit: usize,
    ) -> TransportResult<HistoryPage>;

    async fn send_text(
        &self,
        peer: &ChannelHandle,
        text: &str,
        entities: &[TextEntity],
        link_preview: bool,
        random_id: CorrelationId,
    ) -> TransportResult<MessageId>;

    async fn send_media(
        &self,
        peer: &ChannelHandle,
        media: &SendableMedia,
        caption: &str,
        entities: &[TextEntity],
        random_id: CorrelationId,
    ) -> TransportResult<MessageId>;

    /// Send one grouped post. Returns the id of the first created message.
    async fn send_batch(
        &self,
        peer: &ChannelHandle,
        entries: &[BatchEntry],
    ) -> TransportResult<MessageId>;
}
