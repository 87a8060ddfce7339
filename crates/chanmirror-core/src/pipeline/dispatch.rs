use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    domain::{ChannelHandle, MessageId},
    errors::Error,
    pipeline::{
        batcher::{AlbumBatcher, DispatchItem},
        context::RunContext,
    },
    report::DispatchStats,
    rewrite::CaptionRewriter,
    transport::types::SourceMessage,
    utils::preview,
    Result,
};

/// Drives the album batcher and sends whatever it releases to the destination.
///
/// Restricted-content rejections are logged and skipped; every other error
/// stops the run.
pub struct Dispatcher {
    destination: ChannelHandle,
    rewriter: Arc<CaptionRewriter>,
    batcher: AlbumBatcher,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(destination: ChannelHandle, rewriter: Arc<CaptionRewriter>) -> Self {
        Self {
            destination,
            rewriter,
            batcher: AlbumBatcher::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            unsupported_dropped: self.batcher.dropped_unsupported(),
            ..self.stats
        }
    }

    /// Push every message through, oldest first, then flush the last album.
    pub async fn dispatch_all(
        &mut self,
        ctx: &mut RunContext,
        messages: Vec<SourceMessage>,
    ) -> Result<()> {
        for msg in messages {
            self.dispatch(ctx, msg).await?;
        }
        self.finish(ctx).await
    }

    pub async fn dispatch(&mut self, ctx: &mut RunContext, msg: SourceMessage) -> Result<()> {
        if ctx.cancel_token().is_cancelled() {
            return Err(Error::Cancelled);
        }
        for item in self.batcher.push(msg) {
            self.execute(ctx, item).await?;
        }
        Ok(())
    }

    pub async fn finish(&mut self, ctx: &mut RunContext) -> Result<()> {
        for item in self.batcher.finish() {
            self.execute(ctx, item).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, ctx: &mut RunContext, item: DispatchItem) -> Result<()> {
        let first_source = match &item {
            DispatchItem::Text { source, .. } | DispatchItem::Media { source, .. } => *source,
            DispatchItem::Batch { items, .. } => items.first().map(|i| i.source).unwrap_or(MessageId(0)),
        };

        match self.send(ctx, item).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_restricted() => {
                warn!(
                    source = first_source.0,
                    error = %e,
                    "destination refused restricted content, skipping"
                );
                self.stats.restricted_skipped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn send(&mut self, ctx: &mut RunContext, item: DispatchItem) -> Result<()> {
        let peer = self.destination;
        match item {
            DispatchItem::Text {
                source,
                body,
                entities,
            } => {
                let (body, entities) = self.rewriter.apply(&body, &entities);
                if body.trim().is_empty() {
                    debug!(source = source.0, "empty message, skipping");
                    self.stats.empty_skipped += 1;
                    return Ok(());
                }
                let sent = ctx.send_text(&peer, &body, &entities).await?;
                self.stats.texts_sent += 1;
                info!(
                    source = source.0,
                    sent = sent.0,
                    text = %preview(&body, 80),
                    "text forwarded"
                );
            }
            DispatchItem::Media {
                source,
                media,
                caption,
                entities,
            } => {
                let (caption, entities) = self.rewriter.apply(&caption, &entities);
                let sent = ctx.send_media(&peer, &media, &caption, &entities).await?;
                self.stats.media_sent += 1;
                info!(source = source.0, sent = sent.0, "media forwarded");
            }
            DispatchItem::Batch {
                items,
                caption,
                entities,
            } => {
                let (caption, entities) = self.rewriter.apply(&caption, &entities);
                let count = items.len();
                let first = items.first().map(|i| i.source.0).unwrap_or_default();
                let mut caption = Some((caption, entities));
                let payload = items
                    .into_iter()
                    .map(|item| {
                        let (c, e) = caption.take().unwrap_or_default();
                        (item.media, c, e)
                    })
                    .collect();
                let sent = ctx.send_batch(&peer, payload).await?;
                self.stats.batches_sent += 1;
                self.stats.batch_items_sent += count;
                info!(source = first, sent = sent.0, items = count, "album forwarded");
            }
        }
        Ok(())
    }
}
