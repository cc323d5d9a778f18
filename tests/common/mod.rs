//! Integration test support.
//!
//! Provides a recording message type and handler helpers for asserting on
//! dispatch outcomes and replies.

pub mod message;

#[allow(unused_imports)]
pub use message::{BOT_ID, Recorder, TestMessage};
