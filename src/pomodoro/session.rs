use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::pomodoro::{BlockState, BlockTimer, Flash, Snapshot, Transition};
use crate::activity::{ActivityLog, LogReport};
use crate::clock::Stamp;
use crate::error::TimerError;
use crate::status::{self, Palette};

pub type SharedSession = Arc<Mutex<Session>>;

/// Lock the session, recovering the state if another task panicked with it.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the tick loop and the command dispatcher share.
#[derive(Debug)]
pub struct Session {
    timer: BlockTimer,
    log: ActivityLog,
    /// Every running second, regardless of the task log; only reset on request.
    long_log: ActivityLog,
    flash: Option<(Flash, u8)>,
    journal: Vec<String>,
}

impl Session {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            timer: BlockTimer::new(cooldown),
            log: ActivityLog::new(),
            long_log: ActivityLog::enabled("long-term"),
            flash: None,
            journal: Vec::new(),
        }
    }

    pub fn shared(cooldown: Duration) -> SharedSession {
        Arc::new(Mutex::new(Self::new(cooldown)))
    }

    pub fn state(&self) -> BlockState {
        self.timer.state()
    }

    pub fn snapshot(&self, now: Stamp) -> Snapshot {
        self.timer.snapshot(now)
    }

    pub fn cooldown(&self) -> Duration {
        self.timer.cooldown()
    }

    pub fn start_block(&mut self, duration: Duration, now: Stamp) -> Result<(), TimerError> {
        self.timer
            .start(duration, now)
            .map_err(|e| self.rejected(e))?;
        self.journal.clear();
        self.note(now, format!("started block ({}s)", duration.as_secs()));
        self.anchor_logs(now);
        Ok(())
    }

    /// Toggle between running and paused. Returns the new state.
    pub fn pause_block(&mut self, now: Stamp) -> Result<BlockState, TimerError> {
        let state = self.timer.toggle_pause(now).map_err(|e| self.rejected(e))?;
        self.entered(state, now);
        Ok(state)
    }

    pub fn resume_block(&mut self, now: Stamp) -> Result<(), TimerError> {
        self.timer.resume(now).map_err(|e| self.rejected(e))?;
        self.entered(BlockState::Running, now);
        Ok(())
    }

    pub fn cancel_block(&mut self, now: Stamp) -> Result<(), TimerError> {
        self.timer.cancel().map_err(|e| self.rejected(e))?;
        self.interrupt_logs();
        self.note(now, "cancelled block".to_string());
        Ok(())
    }

    /// Apply a due block or cooldown expiry.
    pub fn tick(&mut self, now: Stamp) -> Option<Transition> {
        let transition = self.timer.tick(now)?;
        match transition {
            Transition::BlockFinished { .. } => {
                self.interrupt_logs();
                self.note(now, "end block; start cooldown".to_string());
            }
            Transition::CooldownFinished => self.note(now, "end cooldown".to_string()),
        }
        Some(transition)
    }

    /// Feed a focused-window title to the activity log.
    ///
    /// Only running time is recorded; anything else is dropped.
    pub fn record_sample(&mut self, title: &str, now: Stamp) -> Option<String> {
        if self.timer.state() != BlockState::Running {
            debug!(state = %self.timer.state(), "dropping sample outside a running block");
            return None;
        }
        self.long_log.sample(title, now);
        self.log.sample(title, now).map(str::to_string)
    }

    pub fn task_log_add(&mut self, label: &str, now: Stamp) {
        self.log.enable(label);
        if self.timer.state() == BlockState::Running {
            self.log.anchor(now);
        }
        info!(label, "task log enabled");
    }

    pub fn task_log_remove(&mut self) {
        self.log.disable();
        info!("task log disabled");
    }

    pub fn task_log_output(&mut self, reset: bool, now: Stamp) -> LogReport {
        let mut report = self.log.dump(reset);
        report.journal = self.journal.clone();
        if reset {
            self.journal.clear();
            self.note(now, "reset statistics".to_string());
        }
        report
    }

    /// Dump the long-term log, which survives `task_log_add` and ordinary resets.
    pub fn task_log_output_long(&mut self, reset: bool, now: Stamp) -> LogReport {
        let mut report = self.long_log.dump(reset);
        report.journal = self.journal.clone();
        if reset {
            self.note(now, "reset long statistics".to_string());
        }
        report
    }

    /// Render the status line for `now`, advancing any active flash by one tick.
    pub fn status_line(&mut self, now: Stamp, palette: &Palette) -> String {
        let flash = self.next_flash();
        status::render(&self.timer.snapshot(now), flash, palette)
    }

    fn next_flash(&mut self) -> Option<Flash> {
        let (kind, remaining) = self.flash?;
        self.flash = (remaining > 1).then_some((kind, remaining - 1));
        (remaining % 2 == 1).then_some(kind)
    }

    fn entered(&mut self, state: BlockState, now: Stamp) {
        match state {
            BlockState::Running => {
                self.anchor_logs(now);
                self.note(now, "unpaused block".to_string());
            }
            _ => {
                self.interrupt_logs();
                self.note(now, "paused block".to_string());
            }
        }
    }

    fn anchor_logs(&mut self, now: Stamp) {
        self.log.anchor(now);
        self.long_log.anchor(now);
    }

    fn interrupt_logs(&mut self) {
        self.log.interrupt();
        self.long_log.interrupt();
    }

    fn rejected(&mut self, err: TimerError) -> TimerError {
        warn!(error = %err, "rejected command");
        self.flash = Some((err.flash(), err.flash().ticks()));
        err
    }

    fn note(&mut self, now: Stamp, event: String) {
        info!(event = %event, "block event");
        self.journal
            .push(format!("{}: {event}", now.wall.format("%F %T%z")));
    }
}
