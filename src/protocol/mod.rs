//! Protocol types for hls-dl
//!
//! This module contains all types that cross the coordinator boundary:
//! - Events published on the event bus
//! - The per-key status state machine
//! - The download key and progress-reporting primitives
//!
//! These types are designed for serialization and can be carried over IPC,
//! RPC, or any message-passing interface.

mod events;
mod status;
mod types;

pub use events::DownloadEvent;
pub use status::DownloadStatus;
pub use types::{DownloadKey, TimeRange};
