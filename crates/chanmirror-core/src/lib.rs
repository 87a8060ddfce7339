//! Core logic for replicating a Telegram channel's history into another
//! channel.
//!
//! The crate is transport-agnostic: the remote service is reached through the
//! `transport::port::Transport` trait, implemented by adapter crates that own a
//! connected MTProto session.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod rewrite;
pub mod runtime;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod fakes;

pub use errors::{Error, Result};
