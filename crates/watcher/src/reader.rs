//! One read from the notification channel

use crate::error::WatchError;
use crate::source::EventSource;
use shutwatch_core::RawEventBuffer;
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a call to [`read_next`] produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The buffer now holds this many bytes
    Filled(usize),
    /// The token fired before data arrived
    Cancelled,
}

/// Fill `buffer` with the next batch of records
///
/// Waits for the channel to become readable or for `cancel` to fire,
/// whichever comes first. `EINTR` is retried here. On success writes
/// `Read <n> bytes from inotify fd` to `out`.
pub async fn read_next<S, W>(
    source: &mut S,
    buffer: &mut RawEventBuffer,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<ReadOutcome, WatchError>
where
    S: EventSource + ?Sized,
    W: Write,
{
    let num_read = loop {
        let target = buffer.read_target();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ReadOutcome::Cancelled),
            result = source.read_into(target) => result,
        };

        match result {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("read interrupted, retrying");
                continue;
            }
            Err(e) => return Err(WatchError::Read { op: "read", source: e }),
        }
    };

    if num_read == 0 {
        return Err(WatchError::UnexpectedEof);
    }

    buffer.set_filled(num_read);
    writeln!(out, "Read {} bytes from inotify fd", num_read).map_err(WatchError::Output)?;

    Ok(ReadOutcome::Filled(num_read))
}
