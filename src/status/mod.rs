//! xmobar status line rendering.

mod color;

pub use color::Rgb;

use serde::{Deserialize, Serialize};

use crate::pomodoro::{BlockState, Flash, Snapshot};

/// Colors and thresholds used to draw the status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub idle: Rgb,
    pub block_start: Rgb,
    pub block_end: Rgb,
    pub cooldown_start: Rgb,
    pub cooldown_end: Rgb,
    /// Background for rejected commands and the final-seconds blink.
    pub warn: Rgb,
    /// Background for commands rejected during cooldown.
    pub error: Rgb,
    /// The background blinks during this many final seconds.
    pub blink_secs: u64,
    pub cooldown_marker: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            idle: Rgb(0xaa, 0xaa, 0xaa),
            block_start: Rgb(0, 255, 0),
            block_end: Rgb(255, 255, 0),
            cooldown_start: Rgb(255, 0, 0),
            cooldown_end: Rgb(0, 255, 255),
            warn: Rgb(255, 255, 0),
            error: Rgb(255, 0, 0),
            blink_secs: 10,
            cooldown_marker: "~".to_string(),
        }
    }
}

pub fn render(snapshot: &Snapshot, flash: Option<Flash>, palette: &Palette) -> String {
    let flash_bg = flash.map(|f| match f {
        Flash::Warn => palette.warn,
        Flash::Error => palette.error,
    });
    let rem_s = snapshot.remaining.as_secs();
    let clock = format!("{:02}:{:02}", rem_s / 60, rem_s % 60);
    let blink = (rem_s < palette.blink_secs && rem_s % 2 == 1).then_some(palette.warn);

    match snapshot.state {
        BlockState::Idle => markup(palette.idle, flash_bg, "--"),
        BlockState::Paused => markup(palette.idle, flash_bg, &clock),
        BlockState::Running => markup(
            palette
                .block_start
                .fade(palette.block_end, snapshot.progress()),
            flash_bg.or(blink),
            &clock,
        ),
        BlockState::Cooldown => markup(
            palette
                .cooldown_start
                .fade(palette.cooldown_end, snapshot.progress()),
            flash_bg.or(blink),
            &format!("{}{clock}", palette.cooldown_marker),
        ),
    }
}

fn markup(fg: Rgb, bg: Option<Rgb>, text: &str) -> String {
    match bg {
        Some(bg) => format!("<fc={fg},{bg}>{text}</fc>"),
        None => format!("<fc={fg}>{text}</fc>"),
    }
}
