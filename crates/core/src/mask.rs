//! inotify event mask
//!
//! Bit values are the Linux kernel ABI (`<sys/inotify.h>`).

use bitflags::bitflags;

bitflags! {
    /// Set of event flags carried by a record or requested for a watch
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// File was accessed
        const ACCESS = 0x0000_0001;
        /// File was modified
        const MODIFY = 0x0000_0002;
        /// Metadata changed
        const ATTRIB = 0x0000_0004;
        /// Writable file was closed
        const CLOSE_WRITE = 0x0000_0008;
        /// Unwritable file was closed
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File was opened
        const OPEN = 0x0000_0020;
        /// Entry moved out of a watched directory
        const MOVED_FROM = 0x0000_0040;
        /// Entry moved into a watched directory
        const MOVED_TO = 0x0000_0080;
        /// Entry created in a watched directory
        const CREATE = 0x0000_0100;
        /// Entry deleted from a watched directory
        const DELETE = 0x0000_0200;
        /// Watched object was deleted
        const DELETE_SELF = 0x0000_0400;
        /// Watched object was moved
        const MOVE_SELF = 0x0000_0800;
        /// Backing filesystem was unmounted
        const UNMOUNT = 0x0000_2000;
        /// Kernel event queue overflowed
        const Q_OVERFLOW = 0x0000_4000;
        /// Watch was removed
        const IGNORED = 0x0000_8000;
        /// Subject of the event is a directory
        const ISDIR = 0x4000_0000;

        /// Every event category a watch can request
        const ALL_EVENTS = Self::ACCESS.bits()
            | Self::MODIFY.bits()
            | Self::ATTRIB.bits()
            | Self::CLOSE_WRITE.bits()
            | Self::CLOSE_NOWRITE.bits()
            | Self::OPEN.bits()
            | Self::MOVED_FROM.bits()
            | Self::MOVED_TO.bits()
            | Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::DELETE_SELF.bits()
            | Self::MOVE_SELF.bits();
    }
}

/// Rendering order for flag names, independent of bit values
const CANONICAL_ORDER: [(EventMask, &str); 16] = [
    (EventMask::ACCESS, "IN_ACCESS"),
    (EventMask::ATTRIB, "IN_ATTRIB"),
    (EventMask::CLOSE_NOWRITE, "IN_CLOSE_NOWRITE"),
    (EventMask::CLOSE_WRITE, "IN_CLOSE_WRITE"),
    (EventMask::CREATE, "IN_CREATE"),
    (EventMask::DELETE, "IN_DELETE"),
    (EventMask::DELETE_SELF, "IN_DELETE_SELF"),
    (EventMask::IGNORED, "IN_IGNORED"),
    (EventMask::ISDIR, "IN_ISDIR"),
    (EventMask::MODIFY, "IN_MODIFY"),
    (EventMask::MOVE_SELF, "IN_MOVE_SELF"),
    (EventMask::MOVED_FROM, "IN_MOVED_FROM"),
    (EventMask::MOVED_TO, "IN_MOVED_TO"),
    (EventMask::OPEN, "IN_OPEN"),
    (EventMask::Q_OVERFLOW, "IN_Q_OVERFLOW"),
    (EventMask::UNMOUNT, "IN_UNMOUNT"),
];

impl EventMask {
    /// Symbolic names of the flags present, in canonical order
    ///
    /// Bits without a symbolic name are skipped.
    pub fn symbolic_names(self) -> impl Iterator<Item = &'static str> {
        CANONICAL_ORDER
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}
