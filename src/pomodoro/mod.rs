#[allow(clippy::module_inception)]
pub mod pomodoro;
pub mod session;

pub use pomodoro::{BlockState, BlockTimer, COOLDOWN_SECS, Flash, Snapshot, Transition};
pub use session::{Session, SharedSession, lock};
