//! Error types for the watcher

use shutwatch_core::DecodeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from registering watches and running the event loop
///
/// Messages name the failing operation; the OS error is the `source`, so
/// a `{:#}` chain renders `op: os error`.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("{op}")]
    ChannelInit {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{op} {}", .path.display())]
    Registration {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("no path could be watched")]
    NoWatches,

    #[error("{op}")]
    Read {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("read() from inotify fd returned 0!")]
    UnexpectedEof,

    #[error("malformed event buffer")]
    Decode(#[from] DecodeError),

    #[error("failed to write trace output")]
    Output(#[source] io::Error),
}

impl WatchError {
    /// Whether another read attempt could succeed
    ///
    /// Only transient read failures qualify. A zero-length read means the
    /// channel is gone and is never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            WatchError::Read { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::OutOfMemory
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_registration_message_names_path() {
        let err = WatchError::Registration {
            path: PathBuf::from("/no/such/file"),
            op: "inotify_add_watch",
            source: io::Error::from(io::ErrorKind::NotFound),
        };

        assert_eq!(err.to_string(), "inotify_add_watch /no/such/file");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_eof_and_read_error_are_distinct() {
        let eof = WatchError::UnexpectedEof;
        let read = WatchError::Read {
            op: "read",
            source: io::Error::from_raw_os_error(5),
        };

        assert_ne!(eof.to_string(), read.to_string());
        assert!(eof.source().is_none());
        assert!(read.source().is_some());
    }

    #[test]
    fn test_retryable_kinds() {
        let transient = WatchError::Read {
            op: "read",
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        let hard = WatchError::Read {
            op: "read",
            source: io::Error::from_raw_os_error(9),
        };

        assert!(transient.is_retryable());
        assert!(!hard.is_retryable());
        assert!(!WatchError::UnexpectedEof.is_retryable());
        assert!(!WatchError::NoWatches.is_retryable());
    }
}
