use serde::Deserialize;
use std::process::{Command, Stdio};

use crate::error::SampleError;

/// Source of the currently focused window's title.
pub trait Sampler: Send + Sync + 'static {
    fn focused_window_title(&self) -> Result<String, SampleError>;
}

#[derive(Debug, Deserialize)]
struct HyprlandWindow {
    // `hyprctl activewindow -j` prints `{}` when nothing is focused
    #[serde(default)]
    title: String,
}

/// Queries Hyprland through `hyprctl`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hyprctl;

impl Sampler for Hyprctl {
    fn focused_window_title(&self) -> Result<String, SampleError> {
        let output = Command::new("hyprctl")
            .args(["activewindow", "-j"])
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(SampleError::Status(output.status));
        }
        parse_active_window(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_active_window(stdout: &str) -> Result<String, SampleError> {
    if stdout.trim().is_empty() {
        return Err(SampleError::Empty);
    }
    let window: HyprlandWindow = serde_json::from_str(stdout)?;
    if window.title.trim().is_empty() {
        return Err(SampleError::Empty);
    }
    Ok(window.title)
}
