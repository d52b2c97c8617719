use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// A 24-bit color, written as `#rrggbb` in config files and xmobar markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Blend from `self` towards `to` as `progress` goes from 0 to 1.
    ///
    /// The blend is quadratic so the color barely moves early in a block
    /// and changes quickly towards the end.
    pub fn fade(self, to: Rgb, progress: f64) -> Rgb {
        let w = progress.clamp(0.0, 1.0).powi(2);
        let mix = |a: u8, b: u8| (a as f64 * (1.0 - w) + b as f64 * w).round() as u8;
        Rgb(mix(self.0, to.0), mix(self.1, to.1), mix(self.2, to.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| ConfigError::Color(value.clone()))?;
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ConfigError::Color(value.clone()))
        };
        Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}
