//! Test doubles shared by the module tests

use crate::shutdown::ShutdownExecutor;
use crate::source::EventSource;
use async_trait::async_trait;
use shutwatch_core::{encode_record, NotifyEvent};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Replays scripted read results, then blocks forever
pub struct ScriptedSource {
    script: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
        }
    }

    /// Queue one read returning these records
    pub fn events(mut self, events: &[NotifyEvent]) -> Self {
        let mut bytes = Vec::new();
        for event in events {
            encode_record(event, &mut bytes);
        }
        self.script.push_back(Ok(bytes));
        self
    }

    /// Queue one read returning raw bytes
    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.script.push_back(Ok(bytes));
        self
    }

    /// Queue one failing read
    pub fn error(mut self, err: io::Error) -> Self {
        self.script.push_back(Err(err));
        self
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn read_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            Some(Ok(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(Err(err)) => Err(err),
            None => std::future::pending().await,
        }
    }
}

/// Counts shutdown requests
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    pub calls: Arc<Mutex<Vec<NotifyEvent>>>,
}

impl RecordingExecutor {
    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ShutdownExecutor for RecordingExecutor {
    async fn issue_shutdown(
        &mut self,
        trigger: &NotifyEvent,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(trigger.clone());
        Ok(())
    }
}
