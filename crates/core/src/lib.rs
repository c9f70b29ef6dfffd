//! Event model for shutwatch
//!
//! This crate provides:
//! - The inotify event mask and its canonical rendering order
//! - Decoded event records and watch handles
//! - A bounds-checked decoder for packed inotify record buffers
//! - Shutdown timer state owned by the dispatcher

pub mod codec;
pub mod event;
pub mod mask;
pub mod timer;

// Re-exports
pub use codec::{decode_all, encode_record, DecodeError, EventCursor, RawEventBuffer};
pub use codec::{BUF_LEN, EVENT_HEADER_SIZE, NAME_MAX};
pub use event::{describe, NotifyEvent, WatchHandle};
pub use mask::EventMask;
pub use timer::ShutdownTimerState;
