//! The block timer state machine.
//!
//! Every query is computed from stamps handed in by the caller, so the
//! remaining time never drifts when ticks are late or the machine sleeps.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::clock::Stamp;
use crate::error::TimerError;

pub const COOLDOWN_SECS: u64 = 300; // Mandatory rest after a block

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockState {
    Idle,
    Running,
    Paused,
    Cooldown,
}

impl BlockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockState::Idle => "idle",
            BlockState::Running => "running",
            BlockState::Paused => "paused",
            BlockState::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockState::Cooldown => f.write_str("in cooldown"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Highlight shown on the status line after a rejected command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Warn,
    Error,
}

impl Flash {
    /// Number of status-line ticks the flash lasts.
    pub fn ticks(&self) -> u8 {
        match self {
            Flash::Warn => 5,
            Flash::Error => 7,
        }
    }
}

/// A transition applied by [`BlockTimer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BlockFinished { duration: Duration },
    CooldownFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub state: BlockState,
    pub remaining: Duration,
    /// Length of the current or most recent block.
    pub block_duration: Option<Duration>,
    /// Length of the countdown currently shown (block or cooldown).
    pub total: Duration,
}

impl Snapshot {
    /// Elapsed fraction of the current countdown, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        let remaining = self.remaining.as_secs_f64() / self.total.as_secs_f64();
        (1.0 - remaining).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running {
        started: Stamp,
        duration: Duration,
        paused_total: Duration,
    },
    Paused {
        started: Stamp,
        duration: Duration,
        paused_total: Duration,
        paused_at: Stamp,
    },
    Cooldown {
        started: Stamp,
    },
}

#[derive(Debug, Clone)]
pub struct BlockTimer {
    phase: Phase,
    cooldown: Duration,
    last_block: Option<Duration>,
}

impl BlockTimer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            cooldown,
            last_block: None,
        }
    }

    pub fn state(&self) -> BlockState {
        match self.phase {
            Phase::Idle => BlockState::Idle,
            Phase::Running { .. } => BlockState::Running,
            Phase::Paused { .. } => BlockState::Paused,
            Phase::Cooldown { .. } => BlockState::Cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn start(&mut self, duration: Duration, now: Stamp) -> Result<(), TimerError> {
        match self.phase {
            Phase::Idle if duration.is_zero() => Err(TimerError::ZeroDuration),
            Phase::Idle => {
                self.phase = Phase::Running {
                    started: now,
                    duration,
                    paused_total: Duration::ZERO,
                };
                self.last_block = Some(duration);
                Ok(())
            }
            _ => Err(self.reject("start a block")),
        }
    }

    /// Pause a running block, or resume a paused one.
    pub fn toggle_pause(&mut self, now: Stamp) -> Result<BlockState, TimerError> {
        match self.phase {
            Phase::Running { .. } => self.pause(now).map(|_| BlockState::Paused),
            Phase::Paused { .. } => self.resume(now).map(|_| BlockState::Running),
            _ => Err(self.reject("pause")),
        }
    }

    pub fn pause(&mut self, now: Stamp) -> Result<(), TimerError> {
        match self.phase {
            Phase::Running {
                started,
                duration,
                paused_total,
            } => {
                self.phase = Phase::Paused {
                    started,
                    duration,
                    paused_total,
                    paused_at: now,
                };
                Ok(())
            }
            _ => Err(self.reject("pause")),
        }
    }

    pub fn resume(&mut self, now: Stamp) -> Result<(), TimerError> {
        match self.phase {
            Phase::Paused {
                started,
                duration,
                paused_total,
                paused_at,
            } => {
                self.phase = Phase::Running {
                    started,
                    duration,
                    paused_total: paused_total + now.since(&paused_at),
                };
                Ok(())
            }
            _ => Err(self.reject("resume")),
        }
    }

    pub fn cancel(&mut self) -> Result<(), TimerError> {
        match self.phase {
            Phase::Running { .. } | Phase::Paused { .. } => {
                self.phase = Phase::Idle;
                self.last_block = None;
                Ok(())
            }
            _ => Err(self.reject("cancel")),
        }
    }

    /// Apply the transition that is due at `now`, if any.
    ///
    /// At most one transition happens per call; an expired cooldown is only
    /// noticed on the following tick.
    pub fn tick(&mut self, now: Stamp) -> Option<Transition> {
        match self.phase {
            Phase::Running { duration, .. } if self.remaining(now).is_zero() => {
                self.phase = Phase::Cooldown { started: now };
                Some(Transition::BlockFinished { duration })
            }
            Phase::Cooldown { .. } if self.remaining(now).is_zero() => {
                self.phase = Phase::Idle;
                Some(Transition::CooldownFinished)
            }
            _ => None,
        }
    }

    pub fn snapshot(&self, now: Stamp) -> Snapshot {
        let total = match self.phase {
            Phase::Idle => Duration::ZERO,
            Phase::Running { duration, .. } | Phase::Paused { duration, .. } => duration,
            Phase::Cooldown { .. } => self.cooldown,
        };
        Snapshot {
            state: self.state(),
            remaining: self.remaining(now),
            block_duration: self.last_block,
            total,
        }
    }

    fn remaining(&self, now: Stamp) -> Duration {
        match self.phase {
            Phase::Idle => Duration::ZERO,
            Phase::Running {
                started,
                duration,
                paused_total,
            } => duration.saturating_sub(now.since(&started).saturating_sub(paused_total)),
            Phase::Paused {
                started,
                duration,
                paused_total,
                paused_at,
            } => duration.saturating_sub(paused_at.since(&started).saturating_sub(paused_total)),
            Phase::Cooldown { started } => self.cooldown.saturating_sub(now.since(&started)),
        }
    }

    fn reject(&self, command: &'static str) -> TimerError {
        TimerError::Rejected {
            command,
            state: self.state(),
        }
    }
}
