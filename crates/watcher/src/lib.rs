//! inotify watching for shutwatch
//!
//! This crate provides:
//! - The watch registry (one inotify instance, one watch per path)
//! - A cancellable reader over the inotify descriptor
//! - The dispatcher applying the access-triggers-shutdown policy
//! - The event loop tying them together

pub mod dispatch;
pub mod error;
pub mod event_loop;
pub mod reader;
pub mod registry;
pub mod shutdown;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::WatchError;
pub use event_loop::{EventLoop, LoopExit, LoopState, RetryPolicy};
pub use reader::{read_next, ReadOutcome};
pub use registry::{RegistrationPolicy, WatchRegistry};
pub use shutdown::{CommandExecutor, NoticeOnly, ShutdownExecutor};
pub use source::{EventSource, InotifySource};

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
