use notify_rust::Notification;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{info, warn};

/// Runs the user's end-of-block command without waiting for it.
pub trait ShellRunner: Send + Sync + 'static {
    fn run(&self, command: &str);
}

/// Shows a desktop notification, best effort.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, summary: &str, body: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Bash;

impl ShellRunner for Bash {
    fn run(&self, command: &str) {
        let command = command.to_string();
        // stdout belongs to the status bar, so the hook must not write there
        thread::spawn(move || {
            let status = Command::new("bash")
                .arg("-c")
                .arg(&command)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .status();
            match status {
                Ok(status) if status.success() => info!(command = %command, "end-of-block command finished"),
                Ok(status) => warn!(command = %command, %status, "end-of-block command failed"),
                Err(e) => warn!(command = %command, error = %e, "failed to run end-of-block command"),
            }
        });
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Desktop;

impl Notifier for Desktop {
    fn notify(&self, summary: &str, body: &str) {
        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .appname("blockbar")
            .show()
        {
            warn!(error = %e, "failed to send notification");
        }
    }
}

/// Notifier that drops everything, for `--no-notify`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn notify(&self, _summary: &str, _body: &str) {}
}
