//! Translation of inbound control commands into session operations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::activity::LogReport;
use crate::clock::Stamp;
use crate::error::TimerError;
use crate::pomodoro::{BlockState, SharedSession, lock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    StartBlock { duration: u64 },
    PauseBlock,
    ResumeBlock,
    CancelBlock,
    TaskLogAdd { label: String },
    TaskLogRemove,
    TaskLogOutput {
        #[serde(default)]
        reset: bool,
    },
    TaskLogOutputLong {
        #[serde(default)]
        reset: bool,
    },
    Status,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<LogReport>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            report: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            report: None,
        }
    }

    fn report(report: LogReport) -> Self {
        Self {
            success: true,
            message: Some(report.to_string()),
            report: Some(report),
        }
    }
}

impl From<Result<String, TimerError>> for Response {
    fn from(result: Result<String, TimerError>) -> Self {
        match result {
            Ok(message) => Response::ok(message),
            Err(e) => Response::rejected(e.to_string()),
        }
    }
}

/// One handler per command; every call takes the session lock exactly once.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    session: SharedSession,
}

impl Dispatcher {
    pub fn new(session: SharedSession) -> Self {
        Self { session }
    }

    pub fn start_block(&self, duration_secs: u64) -> Result<String, TimerError> {
        lock(&self.session).start_block(Duration::from_secs(duration_secs), Stamp::now())?;
        Ok(format!("started {duration_secs}s block"))
    }

    pub fn pause_block(&self) -> Result<String, TimerError> {
        match lock(&self.session).pause_block(Stamp::now())? {
            BlockState::Paused => Ok("paused block".to_string()),
            _ => Ok("resumed block".to_string()),
        }
    }

    pub fn resume_block(&self) -> Result<String, TimerError> {
        lock(&self.session).resume_block(Stamp::now())?;
        Ok("resumed block".to_string())
    }

    pub fn cancel_block(&self) -> Result<String, TimerError> {
        lock(&self.session).cancel_block(Stamp::now())?;
        Ok("cancelled block".to_string())
    }

    pub fn task_log_add(&self, label: &str) -> String {
        lock(&self.session).task_log_add(label, Stamp::now());
        format!("logging activity as {label:?}")
    }

    pub fn task_log_remove(&self) -> String {
        lock(&self.session).task_log_remove();
        "activity logging stopped".to_string()
    }

    pub fn task_log_output(&self, reset: bool) -> LogReport {
        lock(&self.session).task_log_output(reset, Stamp::now())
    }

    pub fn task_log_output_long(&self, reset: bool) -> LogReport {
        lock(&self.session).task_log_output_long(reset, Stamp::now())
    }

    pub fn status(&self) -> String {
        let snap = lock(&self.session).snapshot(Stamp::now());
        let rem = snap.remaining.as_secs();
        match snap.state {
            BlockState::Idle => "idle".to_string(),
            state => format!("{} {:02}:{:02}", state.as_str(), rem / 60, rem % 60),
        }
    }

    pub fn dispatch(&self, command: Command) -> Response {
        match command {
            Command::StartBlock { duration } => self.start_block(duration).into(),
            Command::PauseBlock => self.pause_block().into(),
            Command::ResumeBlock => self.resume_block().into(),
            Command::CancelBlock => self.cancel_block().into(),
            Command::TaskLogAdd { label } => Response::ok(self.task_log_add(&label)),
            Command::TaskLogRemove => Response::ok(self.task_log_remove()),
            Command::TaskLogOutput { reset } => Response::report(self.task_log_output(reset)),
            Command::TaskLogOutputLong { reset } => {
                Response::report(self.task_log_output_long(reset))
            }
            Command::Status => Response::ok(self.status()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pomodoro::Session;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Session::shared(Duration::from_secs(300)))
    }

    #[test]
    fn test_command_wire_format() {
        let cmd: Command = serde_json::from_str(r#"{"command":"start_block","duration":1500}"#).unwrap();
        assert_eq!(cmd, Command::StartBlock { duration: 1500 });
        let cmd: Command = serde_json::from_str(r#"{"command":"task_log_output"}"#).unwrap();
        assert_eq!(cmd, Command::TaskLogOutput { reset: false });
        let cmd: Command = serde_json::from_str(r#"{"command":"task_log_add","label":"review"}"#).unwrap();
        assert_eq!(cmd, Command::TaskLogAdd { label: "review".to_string() });
        assert!(serde_json::from_str::<Command>(r#"{"command":"reboot"}"#).is_err());
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let d = dispatcher();
        assert!(d.dispatch(Command::StartBlock { duration: 60 }).success);
        let resp = d.dispatch(Command::StartBlock { duration: 60 });
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("cannot start a block while running"));
    }

    #[test]
    fn test_pause_toggles() {
        let d = dispatcher();
        assert!(d.pause_block().is_err());
        d.start_block(60).unwrap();
        assert_eq!(d.pause_block().unwrap(), "paused block");
        assert!(d.status().starts_with("paused "));
        assert_eq!(d.pause_block().unwrap(), "resumed block");
        assert!(d.resume_block().is_err());
        assert_eq!(d.cancel_block().unwrap(), "cancelled block");
        assert_eq!(d.status(), "idle");
    }

    #[test]
    fn test_log_output_response_carries_report() {
        let d = dispatcher();
        d.task_log_add("review");
        let resp = d.dispatch(Command::TaskLogOutput { reset: true });
        assert!(resp.success);
        let report = resp.report.unwrap();
        assert_eq!(report.name.as_deref(), Some("review"));
        assert!(resp.message.unwrap().starts_with("task log: review (enabled)"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["enabled"], true);
    }

    #[test]
    fn test_long_log_output() {
        let d = dispatcher();
        let cmd: Command =
            serde_json::from_str(r#"{"command":"task_log_output_long","reset":true}"#).unwrap();
        assert_eq!(cmd, Command::TaskLogOutputLong { reset: true });
        let resp = d.dispatch(cmd);
        assert!(resp.success);
        assert!(resp.message.unwrap().starts_with("task log: long-term (enabled)"));
    }
}
