#[allow(clippy::module_inception)]
pub mod hypr;

pub use hypr::{Hyprctl, Sampler};
