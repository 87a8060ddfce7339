//! Replication pipeline: pacing, retries, history paging, album batching and
//! dispatch, tied together by the orchestrator.

pub mod batcher;
pub mod context;
pub mod dispatch;
pub mod history;
pub mod limiter;
pub mod orchestrator;
pub mod resolver;
pub mod retry;
