//! Readable notification channels

use async_trait::async_trait;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;

/// A channel that delivers packed event records
#[async_trait]
pub trait EventSource: Send {
    /// Wait until the channel is readable, then read once into `buf`
    ///
    /// Returns the byte count of that single read, `Ok(0)` included.
    async fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// An inotify descriptor driven by the tokio reactor
///
/// The descriptor must be non-blocking. It is closed on drop.
pub struct InotifySource {
    fd: AsyncFd<OwnedFd>,
}

impl InotifySource {
    /// Register a non-blocking inotify descriptor with the current runtime
    pub fn new(fd: OwnedFd) -> io::Result<Self> {
        Ok(Self {
            fd: AsyncFd::try_with_interest(fd, Interest::READABLE)?,
        })
    }
}

#[async_trait]
impl EventSource for InotifySource {
    async fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.fd.readable().await?;

            let attempt = guard.try_io(|inner| {
                nix::unistd::read(inner.get_ref().as_raw_fd(), buf).map_err(io::Error::from)
            });

            match attempt {
                Ok(result) => return result,
                // Readiness was stale; try_io cleared it
                Err(_would_block) => continue,
            }
        }
    }
}
