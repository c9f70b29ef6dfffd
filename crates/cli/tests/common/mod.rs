//! Helpers for driving the `shutwatch` binary
//!
//! The binary never exits on its own, so tests spawn it, follow stdout
//! line by line and stop it with a signal.

use anyhow::{Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Path of the binary under test
pub fn shutwatch_binary() -> &'static str {
    env!("CARGO_BIN_EXE_shutwatch")
}

/// Run to completion (for invocations expected to fail fast)
pub fn run(args: &[&str]) -> Result<Output> {
    Command::new(shutwatch_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .context("Failed to execute shutwatch")
}

/// A running `shutwatch` process with its stdout followed line by line
pub struct Running {
    child: Child,
    lines: Receiver<String>,
    seen: Vec<String>,
}

impl Running {
    /// Spawn with `paths` as arguments, plus the given config file
    pub fn spawn(config: &Path, paths: &[&Path]) -> Result<Self> {
        let mut child = Command::new(shutwatch_binary())
            .arg("--config")
            .arg(config)
            .args(paths)
            .env_remove("RUST_LOG")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn shutwatch")?;

        let stdout = child.stdout.take().context("stdout not captured")?;
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            child,
            lines,
            seen: Vec::new(),
        })
    }

    /// Wait for a stdout line containing `needle`
    pub fn wait_for(&mut self, needle: &str, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(left) {
                Ok(line) => {
                    self.seen.push(line.clone());
                    if line.contains(needle) {
                        return Ok(line);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    anyhow::bail!("Timed out waiting for {:?}; saw {:?}", needle, self.seen)
                }
                Err(RecvTimeoutError::Disconnected) => {
                    anyhow::bail!("stdout closed before {:?}; saw {:?}", needle, self.seen)
                }
            }
        }
    }

    /// Lines seen so far
    pub fn seen(&self) -> &[String] {
        &self.seen
    }

    /// Send SIGTERM and wait for exit
    pub fn terminate(mut self) -> Result<ExitStatus> {
        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM)
            .context("Failed to signal shutwatch")?;
        let status = self.child.wait().context("Failed to wait for shutwatch")?;
        Ok(status)
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        // No-op if already reaped
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
