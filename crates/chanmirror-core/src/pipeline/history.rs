use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    domain::{ChannelHandle, MessageId},
    errors::Error,
    pipeline::{
        context::RunContext,
        retry::{retry_flood_wait, sleep_or_cancel},
    },
    transport::types::{HistoryItem, HistoryPage, SourceMessage},
    Result,
};

pub const MAX_PAGE_LIMIT: usize = 100;

/// Walks a channel's history backwards page by page and returns it oldest first.
#[derive(Clone, Copy, Debug)]
pub struct HistoryFetcher {
    page_limit: usize,
    page_delay: Duration,
}

impl HistoryFetcher {
    pub fn new(page_limit: usize, page_delay: Duration) -> Self {
        Self {
            page_limit: page_limit.clamp(1, MAX_PAGE_LIMIT),
            page_delay,
        }
    }

    pub async fn fetch(&self, ctx: &RunContext, source: &ChannelHandle) -> Result<Vec<SourceMessage>> {
        let transport = ctx.transport();
        let cancel = ctx.cancel_token();
        let limit = self.page_limit;

        let mut result = Vec::new();
        let mut offset: Option<MessageId> = None;
        let mut pages = 0usize;

        loop {
            let page = retry_flood_wait(cancel, "get_history", || {
                transport.get_history(source, offset, limit)
            })
            .await?;

            let items = match page {
                HistoryPage::Messages(items) => items,
                HistoryPage::Unrecognized => {
                    warn!(
                        channel = source.channel_id.0,
                        pages, "unrecognized history page, stopping pagination"
                    );
                    break;
                }
            };
            let Some(oldest) = items.iter().map(HistoryItem::id).min() else {
                break;
            };

            // The cursor must strictly move backwards or we would page forever.
            if let Some(prev) = offset {
                if items.iter().any(|item| item.id() >= prev) {
                    return Err(Error::UnexpectedResponse(format!(
                        "history page for channel {} is not older than cursor {}",
                        source.channel_id, prev.0
                    )));
                }
            }

            let before = result.len();
            result.extend(items.into_iter().filter_map(|item| match item {
                HistoryItem::Message(m) => Some(m),
                HistoryItem::Skipped(_) => None,
            }));
            pages += 1;
            debug!(
                channel = source.channel_id.0,
                page = pages,
                kept = result.len() - before,
                oldest = oldest.0,
                "history page fetched"
            );

            offset = Some(oldest);
            sleep_or_cancel(cancel, self.page_delay).await?;
        }

        result.reverse();
        info!(
            channel = source.channel_id.0,
            pages,
            messages = result.len(),
            "history fetched"
        );
        Ok(result)
    }
}
