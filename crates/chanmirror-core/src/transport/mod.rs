//! Boundary to the remote messaging service.
//!
//! The pipeline only talks to an already connected, authenticated session
//! through the `Transport` port; MTProto adapters implement it elsewhere.

pub mod port;
pub mod types;
