//! Per-event policy: an access means shut down
//!
//! The dispatcher owns the trace writer, the shutdown timer state and the
//! executor. Every decoded event is first described, then dispatched.

use crate::error::WatchError;
use crate::shutdown::ShutdownExecutor;
use chrono::Utc;
use shutwatch_core::{NotifyEvent, ShutdownTimerState, WatchHandle};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Notice written to the trace when an access event triggers a shutdown
pub const SHUTDOWN_NOTICE: &str = "        ISSUE SHUTDOWN COMMAND!!!";

/// Result of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No policy applies to this event
    Ignored,
    /// The event was an access; a shutdown was requested
    ShutdownIssued,
}

pub struct Dispatcher<W> {
    out: W,
    timer: ShutdownTimerState,
    executor: Box<dyn ShutdownExecutor>,
    /// Registered path per watch, for log context only
    labels: HashMap<WatchHandle, PathBuf>,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(out: W, executor: Box<dyn ShutdownExecutor>) -> Self {
        Self {
            out,
            timer: ShutdownTimerState::new(),
            executor,
            labels: HashMap::new(),
        }
    }

    /// Attach the registered paths so logs can name them
    pub fn with_labels(mut self, labels: HashMap<WatchHandle, PathBuf>) -> Self {
        self.labels = labels;
        self
    }

    pub fn timer(&self) -> &ShutdownTimerState {
        &self.timer
    }

    /// Trace writer, shared with the reader's byte-count lines
    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Write the event's description to the trace
    pub fn describe(&mut self, event: &NotifyEvent) -> Result<(), WatchError> {
        self.out
            .write_all(event.describe().as_bytes())
            .map_err(WatchError::Output)
    }

    /// Apply the policy to one event
    ///
    /// An access event writes the shutdown notice, records the access in
    /// the timer state and calls the executor. Executor failures are
    /// logged, not returned: the watch keeps running. A running executor
    /// is abandoned when `cancel` fires.
    pub async fn dispatch(
        &mut self,
        event: &NotifyEvent,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, WatchError> {
        if !event.is_access() {
            return Ok(DispatchOutcome::Ignored);
        }

        writeln!(self.out, "{}", SHUTDOWN_NOTICE).map_err(WatchError::Output)?;
        record_access(&mut self.timer);

        match self.labels.get(&event.handle) {
            Some(path) => {
                info!(wd = event.handle.as_raw(), path = %path.display(), "Access observed")
            }
            None => info!(wd = event.handle.as_raw(), "Access observed"),
        }

        if let Err(e) = self.executor.issue_shutdown(event, cancel).await {
            error!("Shutdown executor failed: {:#}", e);
        }
        debug!(last_access = ?self.timer.last_access(), "Shutdown timer updated");

        Ok(DispatchOutcome::ShutdownIssued)
    }
}

fn record_access(timer: &mut ShutdownTimerState) {
    timer.record_access(Utc::now());
}
