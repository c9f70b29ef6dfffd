//! Packed inotify record codec
//!
//! A read from an inotify descriptor returns zero or more records laid out
//! back to back:
//!
//! ```text
//! +--------+--------+--------+--------+------------------------+
//! | wd i32 | mask   | cookie | len    | name[len] (NUL padded) |
//! +--------+--------+--------+--------+------------------------+
//! ```
//!
//! All header fields are native-endian. The decoder never trusts `len`:
//! each record is checked against the bytes left in the buffer before the
//! cursor advances.

use crate::event::{NotifyEvent, WatchHandle};
use crate::mask::EventMask;
use std::iter::FusedIterator;
use thiserror::Error;

/// Size of the fixed record header (`struct inotify_event` without name)
pub const EVENT_HEADER_SIZE: usize = 16;

/// Longest directory entry name the kernel reports
pub const NAME_MAX: usize = 255;

/// Read buffer capacity: room for ten maximal records
pub const BUF_LEN: usize = 10 * (EVENT_HEADER_SIZE + NAME_MAX + 1);

/// Framing violations found while decoding a buffer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated event header at offset {offset}: {remaining} bytes left, header needs 16")]
    TruncatedHeader { offset: usize, remaining: usize },

    #[error("event at offset {offset} declares a {declared}-byte name, {remaining} bytes follow")]
    NameOverrun {
        offset: usize,
        declared: usize,
        remaining: usize,
    },
}

/// Fixed-capacity buffer a single read fills
///
/// Only the first `len()` bytes are meaningful; they are exactly what the
/// last read returned.
pub struct RawEventBuffer {
    bytes: Box<[u8]>,
    filled: usize,
}

impl RawEventBuffer {
    /// Buffer of [`BUF_LEN`] bytes
    pub fn new() -> Self {
        Self::with_capacity(BUF_LEN)
    }

    /// Buffer of arbitrary capacity
    ///
    /// The kernel rejects reads into buffers that cannot hold the next
    /// record, so anything smaller than one maximal record is only useful
    /// for tests.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Discard the previous contents and expose the whole buffer for a read
    pub fn read_target(&mut self) -> &mut [u8] {
        self.filled = 0;
        &mut self.bytes
    }

    /// Record how many bytes the read produced
    ///
    /// Clamped to capacity.
    pub fn set_filled(&mut self, len: usize) {
        self.filled = len.min(self.bytes.len());
    }

    /// Bytes produced by the last read
    pub fn filled(&self) -> &[u8] {
        &self.bytes[..self.filled]
    }

    /// Decode the filled bytes
    pub fn events(&self) -> EventCursor<'_> {
        decode_all(self.filled())
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Default for RawEventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode every record in `bytes`, in order
pub fn decode_all(bytes: &[u8]) -> EventCursor<'_> {
    EventCursor {
        bytes,
        pos: 0,
        failed: false,
    }
}

/// Single-pass cursor over packed records
///
/// Yields one `Err` on the first framing violation and then stops.
pub struct EventCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> EventCursor<'a> {
    /// Bytes consumed by the records decoded so far
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Bytes not yet decoded
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn decode_next(&mut self) -> Result<NotifyEvent, DecodeError> {
        let offset = self.pos;
        let rest = &self.bytes[offset..];

        if rest.len() < EVENT_HEADER_SIZE {
            return Err(DecodeError::TruncatedHeader {
                offset,
                remaining: rest.len(),
            });
        }

        let wd = read_u32(rest, 0) as i32;
        let mask = EventMask::from_bits_retain(read_u32(rest, 4));
        let cookie = read_u32(rest, 8);
        let declared = read_u32(rest, 12) as usize;

        let body = &rest[EVENT_HEADER_SIZE..];
        if declared > body.len() {
            return Err(DecodeError::NameOverrun {
                offset,
                declared,
                remaining: body.len(),
            });
        }

        let name = decode_name(&body[..declared]);
        self.pos += EVENT_HEADER_SIZE + declared;

        Ok(NotifyEvent {
            handle: WatchHandle::from_raw(wd),
            cookie,
            mask,
            name,
        })
    }
}

impl<'a> Iterator for EventCursor<'a> {
    type Item = Result<NotifyEvent, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }

        let result = self.decode_next();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl<'a> FusedIterator for EventCursor<'a> {}

/// Append one record in kernel layout
///
/// Names are NUL terminated and padded to a multiple of the header size,
/// the same way the kernel pads them.
pub fn encode_record(event: &NotifyEvent, out: &mut Vec<u8>) {
    let name = event.name.as_deref().unwrap_or("").as_bytes();
    let padded = if name.is_empty() {
        0
    } else {
        (name.len() + 1).div_ceil(EVENT_HEADER_SIZE) * EVENT_HEADER_SIZE
    };

    out.extend_from_slice(&event.handle.as_raw().to_ne_bytes());
    out.extend_from_slice(&event.mask.bits().to_ne_bytes());
    out.extend_from_slice(&event.cookie.to_ne_bytes());
    out.extend_from_slice(&(padded as u32).to_ne_bytes());
    out.extend_from_slice(name);
    out.resize(out.len() + padded - name.len(), 0);
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Strip the NUL padding; an all-padding name counts as absent
fn decode_name(raw: &[u8]) -> Option<String> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&raw[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(events: &[NotifyEvent]) -> Vec<u8> {
        let mut out = Vec::new();
        for event in events {
            encode_record(event, &mut out);
        }
        out
    }

    fn header(wd: i32, mask: u32, cookie: u32, len: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&wd.to_ne_bytes());
        out.extend_from_slice(&mask.to_ne_bytes());
        out.extend_from_slice(&cookie.to_ne_bytes());
        out.extend_from_slice(&len.to_ne_bytes());
        out
    }

    #[test]
    fn test_buffer_capacity() {
        assert_eq!(BUF_LEN, 2720);
        assert_eq!(RawEventBuffer::new().capacity(), BUF_LEN);
    }

    #[test]
    fn test_single_access_record() {
        let bytes = header(1, EventMask::ACCESS.bits(), 0, 0);
        let events: Vec<_> = decode_all(&bytes).collect::<Result<_, _>>().unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].handle, WatchHandle::from_raw(1));
        assert_eq!(events[0].cookie, 0);
        assert!(events[0].is_access());
        assert_eq!(events[0].name, None);
    }

    #[test]
    fn test_decode_consumes_every_byte() {
        let input = vec![
            NotifyEvent::new(WatchHandle::from_raw(1), EventMask::OPEN),
            NotifyEvent::new(WatchHandle::from_raw(2), EventMask::CREATE | EventMask::ISDIR)
                .with_name("a"),
            NotifyEvent::new(WatchHandle::from_raw(2), EventMask::MOVED_FROM)
                .with_cookie(9)
                .with_name("exactly-fifteen"),
            NotifyEvent::new(WatchHandle::from_raw(2), EventMask::MOVED_TO)
                .with_cookie(9)
                .with_name("x".repeat(NAME_MAX)),
            NotifyEvent::new(WatchHandle::from_raw(1), EventMask::ACCESS),
        ];
        let bytes = pack(&input);
        assert!(bytes.len() <= BUF_LEN);

        let mut cursor = decode_all(&bytes);
        let decoded: Vec<_> = cursor.by_ref().collect::<Result<_, _>>().unwrap();

        assert_eq!(decoded, input);
        assert_eq!(cursor.consumed(), bytes.len());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_name_padding_is_stripped() {
        let mut bytes = header(4, EventMask::CREATE.bits(), 0, 16);
        bytes.extend_from_slice(b"report.pdf\0\0\0\0\0\0");

        let event = decode_all(&bytes).next().unwrap().unwrap();
        assert_eq!(event.name.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_encoded_names_are_padded() {
        let event = NotifyEvent::new(WatchHandle::from_raw(1), EventMask::CREATE)
            .with_name("exactly-fifteen");
        let bytes = pack(&[event]);

        // 15 bytes + NUL fills one 16-byte block exactly
        assert_eq!(bytes.len(), EVENT_HEADER_SIZE + 16);

        let event = NotifyEvent::new(WatchHandle::from_raw(1), EventMask::CREATE)
            .with_name("sixteen-chars-xx");
        let bytes = pack(&[event]);
        assert_eq!(bytes.len(), EVENT_HEADER_SIZE + 32);
    }

    #[test]
    fn test_truncated_header_is_an_error() {
        let mut bytes = header(1, EventMask::ACCESS.bits(), 0, 0);
        bytes.extend_from_slice(&[1, 0, 0]);

        let results: Vec<_> = decode_all(&bytes).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(DecodeError::TruncatedHeader {
                offset: 16,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_name_overrun_is_an_error() {
        let mut bytes = header(1, EventMask::CREATE.bits(), 0, 64);
        bytes.extend_from_slice(b"short\0\0\0");

        let mut cursor = decode_all(&bytes);
        assert_eq!(
            cursor.next(),
            Some(Err(DecodeError::NameOverrun {
                offset: 0,
                declared: 64,
                remaining: 8
            }))
        );
        // Fused after the first error
        assert_eq!(cursor.next(), None);
        assert_eq!(cursor.consumed(), 0);
    }

    #[test]
    fn test_empty_buffer_yields_nothing() {
        assert_eq!(decode_all(&[]).count(), 0);
        assert!(RawEventBuffer::new().events().next().is_none());
    }

    #[test]
    fn test_buffer_tracks_filled_bytes() {
        let bytes = pack(&[NotifyEvent::new(WatchHandle::from_raw(7), EventMask::MODIFY)]);

        let mut buffer = RawEventBuffer::new();
        buffer.read_target()[..bytes.len()].copy_from_slice(&bytes);
        buffer.set_filled(bytes.len());

        assert_eq!(buffer.len(), EVENT_HEADER_SIZE);
        assert_eq!(buffer.filled(), bytes.as_slice());
        assert_eq!(buffer.events().count(), 1);

        // A new read discards the previous contents
        buffer.read_target();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_unknown_mask_bits_survive_decoding() {
        let bits = EventMask::ACCESS.bits() | 0x0100_0000;
        let bytes = header(1, bits, 0, 0);

        let event = decode_all(&bytes).next().unwrap().unwrap();
        assert_eq!(event.mask.bits(), bits);
        assert!(event.is_access());
    }
}
