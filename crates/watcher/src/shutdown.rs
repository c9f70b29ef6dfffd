//! Shutdown executors
//!
//! The dispatcher decides *when* a shutdown is due; an executor decides
//! what that means on this machine.

use anyhow::{Context, Result};
use async_trait::async_trait;
use shutwatch_core::NotifyEvent;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Carries out a shutdown request raised by an access event
#[async_trait]
pub trait ShutdownExecutor: Send {
    /// Called once per access event
    ///
    /// Must return promptly once `cancel` fires.
    async fn issue_shutdown(
        &mut self,
        trigger: &NotifyEvent,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Logs the request and does nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct NoticeOnly;

#[async_trait]
impl ShutdownExecutor for NoticeOnly {
    async fn issue_shutdown(
        &mut self,
        trigger: &NotifyEvent,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        info!(
            wd = trigger.handle.as_raw(),
            "Shutdown requested (notice only, no command executed)"
        );
        Ok(())
    }
}

/// Runs an external command, e.g. `shutdown -h now`
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl ShutdownExecutor for CommandExecutor {
    async fn issue_shutdown(
        &mut self,
        trigger: &NotifyEvent,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(
            wd = trigger.handle.as_raw(),
            program = %self.program,
            "Executing shutdown command"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .spawn()
            .with_context(|| format!("Failed to run shutdown command '{}'", self.program))?;

        // The child is left running if we stop waiting; the runtime reaps it
        let pid = child.id();
        let waited = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(?pid, "Cancelled while the shutdown command was running");
                return Ok(());
            }
            waited = child.wait() => waited,
        };
        let status = waited
            .with_context(|| format!("Failed to wait for shutdown command '{}'", self.program))?;

        if !status.success() {
            warn!(%status, "Shutdown command reported failure");
            anyhow::bail!("Shutdown command '{}' exited with {}", self.program, status);
        }

        Ok(())
    }
}
