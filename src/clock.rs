use chrono::{DateTime, Local};
use std::ops::Add;
use std::time::{Duration, Instant};

/// A point in time as seen by both clocks the daemon cares about.
///
/// Durations take the larger of the two clock deltas. `Instant` does not
/// advance while the machine is suspended, so after a resume the wall
/// clock is the one that moved; when the wall clock is set back, the
/// monotonic delta still holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    pub instant: Instant,
    pub wall: DateTime<Local>,
}

impl Stamp {
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Local::now(),
        }
    }

    /// Time elapsed between `earlier` and `self`, zero if `earlier` is later.
    pub fn since(&self, earlier: &Stamp) -> Duration {
        let monotonic = self.instant.saturating_duration_since(earlier.instant);
        let wall = (self.wall - earlier.wall).to_std().unwrap_or_default();
        monotonic.max(wall)
    }
}

impl Add<Duration> for Stamp {
    type Output = Stamp;

    fn add(self, rhs: Duration) -> Stamp {
        let wall = chrono::Duration::from_std(rhs)
            .ok()
            .and_then(|d| self.wall.checked_add_signed(d))
            .unwrap_or(self.wall);
        Stamp {
            instant: self.instant + rhs,
            wall,
        }
    }
}
