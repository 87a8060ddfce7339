use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChannelHandle, CorrelationId, MessageId},
    pipeline::{limiter::RateLimiter, retry::retry_flood_wait},
    transport::{
        port::Transport,
        types::{BatchEntry, SendableMedia, TextEntity},
    },
    Result,
};

/// Source of correlation ids: 63-bit, non-negative, from the OS CSPRNG.
#[derive(Debug, Default)]
pub struct CorrelationIds;

impl CorrelationIds {
    pub fn next_id(&mut self) -> CorrelationId {
        CorrelationId((OsRng.next_u64() >> 1) as i64)
    }
}

/// State shared by every pipeline component for the lifetime of one run.
///
/// Sends take `&mut self`, so drawing a correlation id and issuing the send
/// always happen under a single owner.
pub struct RunContext {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    ids: CorrelationIds,
    cancel: CancellationToken,
    link_preview: bool,
}

impl RunContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: RateLimiter,
        cancel: CancellationToken,
        link_preview: bool,
    ) -> Self {
        Self {
            transport,
            limiter,
            ids: CorrelationIds,
            cancel,
            link_preview,
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn send_text(
        &mut self,
        peer: &ChannelHandle,
        text: &str,
        entities: &[TextEntity],
    ) -> Result<MessageId> {
        self.limiter.acquire(&self.cancel).await?;
        // One id per logical send; flood-wait retries of the same send reuse it.
        let random_id = self.ids.next_id();
        let link_preview = self.link_preview;
        let transport = self.transport.as_ref();
        retry_flood_wait(&self.cancel, "send_text", || {
            transport.send_text(peer, text, entities, link_preview, random_id)
        })
        .await
    }

    pub async fn send_media(
        &mut self,
        peer: &ChannelHandle,
        media: &SendableMedia,
        caption: &str,
        entities: &[TextEntity],
    ) -> Result<MessageId> {
        self.limiter.acquire(&self.cancel).await?;
        let random_id = self.ids.next_id();
        let transport = self.transport.as_ref();
        retry_flood_wait(&self.cancel, "send_media", || {
            transport.send_media(peer, media, caption, entities, random_id)
        })
        .await
    }

    /// Send a grouped post. `items` are `(media, caption, entities)`; ids are
    /// assigned here, one per member.
    pub async fn send_batch(
        &mut self,
        peer: &ChannelHandle,
        items: Vec<(SendableMedia, String, Vec<TextEntity>)>,
    ) -> Result<MessageId> {
        self.limiter.acquire(&self.cancel).await?;
        let entries: Vec<BatchEntry> = items
            .into_iter()
            .map(|(media, caption, entities)| BatchEntry {
                media,
                caption,
                entities,
                random_id: self.ids.next_id(),
            })
            .collect();
        let transport = self.transport.as_ref();
        retry_flood_wait(&self.cancel, "send_batch", || {
            transport.send_batch(peer, &entries)
        })
        .await
    }
}
