use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

use crate::model::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("empty path")]
    EmptyPath,
    #[error("path does not exist: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("unknown built-in action: {0}")]
    UnknownAction(String),
    #[error("execution failed: {0}")]
    Failed(String),
}

/// Receives resolved payloads. The core never launches anything itself.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionSink: Send + Sync {
    fn execute(&self, payload: &Payload) -> Result<(), LaunchError>;
}

pub fn launch_path(path: &str) -> Result<(), LaunchError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(LaunchError::EmptyPath);
    }

    let candidate = Path::new(trimmed);
    if !candidate.exists() {
        return Err(LaunchError::MissingPath(candidate.to_path_buf()));
    }

    Ok(())
}

/// Rejects payloads that cannot possibly succeed before they reach a sink.
pub fn validate_payload(payload: &Payload) -> Result<(), LaunchError> {
    match payload {
        Payload::OpenFile(path) | Payload::OpenDirectory(path) => launch_path(path),
        Payload::LaunchProgram(program) => {
            let trimmed = program.trim();
            if trimmed.is_empty() {
                return Err(LaunchError::EmptyPath);
            }
            // Bare program names resolve through PATH at launch time.
            if Path::new(trimmed).is_absolute() {
                launch_path(trimmed)
            } else {
                Ok(())
            }
        }
        Payload::OpenUrl(target) | Payload::RunShell(target) | Payload::Calculator(target) => {
            if target.trim().is_empty() {
                Err(LaunchError::EmptyPath)
            } else {
                Ok(())
            }
        }
        Payload::CopyText(_) | Payload::PasteClipboard(_) | Payload::ShowQr(_) => Ok(()),
        Payload::BuiltIn(id) => Err(LaunchError::UnknownAction(id.clone())),
    }
}

/// Sink for headless front ends: validates and logs the action, leaving the
/// launch to whoever consumes the response.
#[derive(Default)]
pub struct LoggingSink;

impl ExecutionSink for LoggingSink {
    fn execute(&self, payload: &Payload) -> Result<(), LaunchError> {
        validate_payload(payload)?;
        info!(?payload, "dispatching action");
        Ok(())
    }
}

/// Keeps every payload it receives, in order.
#[derive(Default)]
pub struct RecordingSink {
    executed: Mutex<Vec<Payload>>,
}

impl RecordingSink {
    pub fn executed(&self) -> Vec<Payload> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

impl ExecutionSink for RecordingSink {
    fn execute(&self, payload: &Payload) -> Result<(), LaunchError> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(payload.clone());
        }
        Ok(())
    }
}
