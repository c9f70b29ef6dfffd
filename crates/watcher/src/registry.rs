//! Watch registry
//!
//! Owns the process's single inotify instance and the watches added to it.
//! Watches are only ever added; they go away with the descriptor.

use crate::error::WatchError;
use crate::source::InotifySource;
use nix::errno::Errno;
use nix::libc;
use shutwatch_core::{EventMask, WatchHandle};
use std::collections::HashMap;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What to do when one of several paths cannot be watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPolicy {
    /// The first failure aborts registration
    #[default]
    Strict,
    /// Failures are logged and skipped; at least one path must succeed
    Lenient,
}

pub struct WatchRegistry {
    fd: OwnedFd,
    watches: Vec<(WatchHandle, PathBuf)>,
}

impl WatchRegistry {
    /// Open the inotify instance
    pub fn initialize() -> Result<Self, WatchError> {
        // SAFETY: no pointers are passed
        let flags = libc::IN_NONBLOCK | libc::IN_CLOEXEC;
        let raw = Errno::result(unsafe { libc::inotify_init1(flags) })
            .map_err(|errno| WatchError::ChannelInit {
                op: "inotify_init1",
                source: io::Error::from(errno),
            })?;

        // SAFETY: inotify_init1 returned a fresh descriptor nobody else owns
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        debug!(fd = raw, "Opened inotify instance");

        Ok(Self {
            fd,
            watches: Vec::new(),
        })
    }

    /// Watch `path` for the events in `mask`
    ///
    /// On success writes `Watching <path> using wd <n>` to `out`. Adding
    /// the same inode twice returns the existing handle.
    pub fn add_watch<W: Write>(
        &mut self,
        path: &Path,
        mask: EventMask,
        out: &mut W,
    ) -> Result<WatchHandle, WatchError> {
        let registration_error = |source: io::Error| WatchError::Registration {
            path: path.to_path_buf(),
            op: "inotify_add_watch",
            source,
        };

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| registration_error(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        // SAFETY: c_path is a valid NUL-terminated string for the call's duration
        let wd = Errno::result(unsafe {
            libc::inotify_add_watch(self.fd.as_raw_fd(), c_path.as_ptr(), mask.bits())
        })
        .map_err(|errno| registration_error(io::Error::from(errno)))?;

        let handle = WatchHandle::from_raw(wd);
        writeln!(out, "Watching {} using wd {}", path.display(), handle)
            .map_err(WatchError::Output)?;

        if !self.watches.iter().any(|(h, _)| *h == handle) {
            self.watches.push((handle, path.to_path_buf()));
        }

        Ok(handle)
    }

    /// Watch every path, in order
    ///
    /// Returns the handles of the watches that were added.
    pub fn register_all<W: Write>(
        &mut self,
        paths: &[PathBuf],
        mask: EventMask,
        policy: RegistrationPolicy,
        out: &mut W,
    ) -> Result<Vec<WatchHandle>, WatchError> {
        let mut handles = Vec::with_capacity(paths.len());

        for path in paths {
            match self.add_watch(path, mask, out) {
                Ok(handle) => handles.push(handle),
                Err(e @ WatchError::Registration { .. })
                    if policy == RegistrationPolicy::Lenient =>
                {
                    warn!("Skipping path: {:#}", anyhow::Error::new(e));
                }
                Err(e) => return Err(e),
            }
        }

        if handles.is_empty() {
            return Err(WatchError::NoWatches);
        }

        Ok(handles)
    }

    /// Path registered under `handle`
    pub fn path_for(&self, handle: WatchHandle) -> Option<&Path> {
        self.watches
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, path)| path.as_path())
    }

    /// Handle to path map, for log context
    pub fn labels(&self) -> HashMap<WatchHandle, PathBuf> {
        self.watches.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Hand the descriptor to the reactor
    ///
    /// Must be called from inside a tokio runtime.
    pub fn into_source(self) -> io::Result<InotifySource> {
        InotifySource::new(self.fd)
    }
}
