//! Decoded inotify events

use crate::mask::EventMask;
use std::fmt::{self, Write as _};

/// Watch descriptor assigned by the kernel when a path is registered
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct WatchHandle(i32);

impl WatchHandle {
    /// Wrap a raw watch descriptor
    pub const fn from_raw(wd: i32) -> Self {
        Self(wd)
    }

    /// The raw watch descriptor
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One decoded event record
///
/// Materialized from a read buffer, handed to the dispatcher, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyEvent {
    /// Watch this event pertains to
    pub handle: WatchHandle,
    /// Correlates `MOVED_FROM`/`MOVED_TO` pairs; 0 means none
    pub cookie: u32,
    /// Flags present on the record
    pub mask: EventMask,
    /// Directory entry name, only for events on entries of a watched directory
    pub name: Option<String>,
}

impl NotifyEvent {
    /// Create an event with no cookie and no name
    pub fn new(handle: WatchHandle, mask: EventMask) -> Self {
        Self {
            handle,
            cookie: 0,
            mask,
            name: None,
        }
    }

    /// Set the rename cookie
    pub fn with_cookie(mut self, cookie: u32) -> Self {
        self.cookie = cookie;
        self
    }

    /// Set the directory entry name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the record carries the access flag
    pub fn is_access(&self) -> bool {
        self.mask.contains(EventMask::ACCESS)
    }

    /// Human-readable multi-line description, see [`describe`]
    pub fn describe(&self) -> String {
        describe(self)
    }
}

/// Render an event as trace text
///
/// ```text
///     wd = 1; cookie = 42; mask = IN_MOVED_FROM IN_ISDIR
///         name = build
/// ```
///
/// The cookie clause appears only for a non-zero cookie and the name line
/// only when the record carries a name. Every line ends with `\n`.
pub fn describe(event: &NotifyEvent) -> String {
    let mut out = String::with_capacity(96);

    // Writing into a String cannot fail
    let _ = write!(out, "    wd = {}; ", event.handle);
    if event.cookie > 0 {
        let _ = write!(out, "cookie = {}; ", event.cookie);
    }

    out.push_str("mask = ");
    for name in event.mask.symbolic_names() {
        out.push_str(name);
        out.push(' ');
    }
    out.push('\n');

    if let Some(name) = &event.name {
        let _ = writeln!(out, "        name = {}", name);
    }

    out
}
