//! The read / decode / dispatch loop

use crate::dispatch::Dispatcher;
use crate::error::WatchError;
use crate::reader::{read_next, ReadOutcome};
use crate::source::EventSource;
use shutwatch_core::RawEventBuffer;
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Watches registered, nothing read yet
    Init,
    /// Reading and dispatching
    Watching,
}

/// Why [`EventLoop::run`] returned without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
}

/// How transient read failures are handled
///
/// With `max_retries == 0` every read error is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), doubling each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

pub struct EventLoop<S, W> {
    source: S,
    buffer: RawEventBuffer,
    dispatcher: Dispatcher<W>,
    retry: RetryPolicy,
    state: LoopState,
}

impl<S: EventSource, W: Write> EventLoop<S, W> {
    pub fn new(source: S, dispatcher: Dispatcher<W>) -> Self {
        Self {
            source,
            buffer: RawEventBuffer::new(),
            dispatcher,
            retry: RetryPolicy::default(),
            state: LoopState::Init,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn dispatcher(&self) -> &Dispatcher<W> {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher<W> {
        self.dispatcher
    }

    /// Run until `cancel` fires or a fatal error occurs
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopExit, WatchError> {
        self.state = LoopState::Watching;
        info!("Watching for events");

        let mut failures = 0u32;
        loop {
            let outcome = read_next(
                &mut self.source,
                &mut self.buffer,
                cancel,
                self.dispatcher.output_mut(),
            )
            .await;

            match outcome {
                Ok(ReadOutcome::Filled(_)) => failures = 0,
                Ok(ReadOutcome::Cancelled) => {
                    info!("Event loop cancelled");
                    return Ok(LoopExit::Cancelled);
                }
                Err(e) if e.is_retryable() && failures < self.retry.max_retries => {
                    let delay = self.retry.backoff(failures);
                    failures += 1;
                    warn!(
                        attempt = failures,
                        max = self.retry.max_retries,
                        "Read failed, retrying in {:?}: {:#}",
                        delay,
                        anyhow::Error::new(e)
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
                Err(e) => return Err(e),
            }

            let count = self.process_buffer(cancel).await?;
            debug!(events = count, bytes = self.buffer.len(), "Buffer processed");
        }
    }

    /// Describe and dispatch every record in the buffer
    async fn process_buffer(&mut self, cancel: &CancellationToken) -> Result<usize, WatchError> {
        let mut count = 0;
        for event in self.buffer.events() {
            let event = event?;
            self.dispatcher.describe(&event)?;
            self.dispatcher.dispatch(&event, cancel).await?;
            count += 1;
        }
        Ok(count)
    }
}
