use std::path::PathBuf;
use thiserror::Error;

use crate::pomodoro::{BlockState, Flash};

/// A command that is not valid in the timer's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("cannot {command} while {state}")]
    Rejected {
        command: &'static str,
        state: BlockState,
    },
    #[error("block duration must be greater than zero")]
    ZeroDuration,
}

impl TimerError {
    /// How loudly the status line should complain about this rejection.
    pub fn flash(&self) -> Flash {
        match self {
            TimerError::Rejected {
                state: BlockState::Cooldown,
                ..
            } => Flash::Error,
            _ => Flash::Warn,
        }
    }
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("window query failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("window query returned malformed output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("window query exited with {0}")]
    Status(std::process::ExitStatus),
    #[error("window query timed out")]
    Timeout,
    #[error("no focused window")]
    Empty,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("invalid value for {flag}: {value}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("invalid color {0:?}, expected #rrggbb")]
    Color(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("daemon closed the connection without replying")]
    Closed,
}
