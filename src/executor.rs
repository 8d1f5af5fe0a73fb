//! Command Executor boundary.
//!
//! The bridge does not perform platform actions itself; it hands command
//! tokens to an external handler. `ActionRunner` is that seam, with a
//! process-spawning implementation for real deployments and a log-only one
//! for running stand-alone (and for tests).

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::Command;

/// Errors from invoking the platform action handler.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("failed to spawn action handler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// The platform-action seam. `invoke` must not block: real implementations
/// hand the token off (spawn, IPC) and return.
pub trait ActionRunner: Send + Sync + 'static {
    fn invoke(&self, command: Command) -> Result<(), ActionError>;
}

/// Spawns the configured handler program with the command token as its
/// single argument. Fire-and-forget: the child is not awaited and its exit
/// status is not observed.
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ActionRunner for ProcessRunner {
    fn invoke(&self, command: Command) -> Result<(), ActionError> {
        debug!("invoking '{}' with token '{}'", self.program, command);
        tokio::process::Command::new(&self.program)
            .arg(command.token())
            .spawn()
            .map_err(|source| ActionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Used when no handler program is configured: logs the token and does
/// nothing else, so the stream side of the bridge still runs.
pub struct NullRunner;

impl ActionRunner for NullRunner {
    fn invoke(&self, command: Command) -> Result<(), ActionError> {
        info!("no action handler configured, ignoring command '{}'", command);
        Ok(())
    }
}

/// Single consumer of the command channel. Runs until every producer handle
/// is dropped. Runner failures are logged and the loop continues; by the
/// time a command gets here its trigger has already been answered.
pub async fn run_executor(mut rx: mpsc::Receiver<Command>, runner: Arc<dyn ActionRunner>) {
    while let Some(command) = rx.recv().await {
        debug!("executing command '{}'", command);
        if let Err(e) = runner.invoke(command) {
            warn!("action handler failed for '{}': {}", command, e);
        }
    }
    debug!("command bus closed, executor stopping");
}
