pub mod classify;
pub mod log;

pub use classify::classify;
pub use log::{ActivityLog, Entry, LogReport, Total};
