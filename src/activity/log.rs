use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::classify::classify;
use crate::clock::Stamp;

/// A run of consecutive samples that mapped to the same label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub label: String,
    pub started_at: DateTime<Local>,
    #[serde(rename = "seconds", serialize_with = "as_secs")]
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Total {
    pub label: String,
    #[serde(rename = "seconds", serialize_with = "as_secs")]
    pub duration: Duration,
}

/// Contents of the log at the time of a dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogReport {
    pub name: Option<String>,
    pub enabled: bool,
    /// Timestamped block events, filled in by the session.
    pub journal: Vec<String>,
    pub totals: Vec<Total>,
    pub entries: Vec<Entry>,
}

impl LogReport {
    pub fn total(&self) -> Duration {
        self.totals.iter().map(|t| t.duration).sum()
    }
}

impl fmt::Display for LogReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        writeln!(
            f,
            "task log: {} ({state})",
            self.name.as_deref().unwrap_or("<unnamed>")
        )?;
        for line in &self.journal {
            writeln!(f, "{line}")?;
        }

        let mut root = Branch::default();
        for total in &self.totals {
            root.add(&total.label, total.duration);
        }
        let total_s = root.time.as_secs_f64();
        for (segment, branch) in &root.children {
            branch.write(f, segment, 0, total_s)?;
        }

        if !self.entries.is_empty() {
            writeln!(f, "timeline:")?;
            for entry in &self.entries {
                writeln!(
                    f,
                    "  {} {:>6}s {}",
                    entry.started_at.format("%H:%M:%S"),
                    entry.duration.as_secs(),
                    entry.label
                )?;
            }
        }
        Ok(())
    }
}

/// Labels are paths, so every prefix also gets a subtotal: all of
/// `tmux/work/*` rolls up into `tmux/work` and then into `tmux`.
#[derive(Default)]
struct Branch<'a> {
    time: Duration,
    children: IndexMap<&'a str, Branch<'a>>,
}

impl<'a> Branch<'a> {
    fn add(&mut self, path: &'a str, time: Duration) {
        self.time += time;
        if path.is_empty() {
            return;
        }
        let (head, rest) = path.split_once('/').unwrap_or((path, ""));
        self.children.entry(head).or_default().add(rest, time);
    }

    fn write(
        &self,
        f: &mut fmt::Formatter<'_>,
        name: &str,
        depth: usize,
        total_s: f64,
    ) -> fmt::Result {
        let secs = self.time.as_secs_f64();
        let pcnt = if total_s > 0.0 { 100.0 * secs / total_s } else { 0.0 };
        writeln!(f, "{:indent$}- [{pcnt:6.2}% {secs:8.2}s] {name}", "", indent = depth * 4)?;
        for (segment, child) in &self.children {
            child.write(f, segment, depth + 1, total_s)?;
        }
        Ok(())
    }
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Focused-window time accumulated per activity label.
///
/// Whether the log is enabled and what it has accumulated are separate:
/// disabling keeps the content around for a later dump, and dumping with
/// reset keeps the log enabled.
#[derive(Debug, Default)]
pub struct ActivityLog {
    enabled: bool,
    name: Option<String>,
    totals: IndexMap<String, Duration>,
    entries: Vec<Entry>,
    last_sample: Option<Stamp>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that is enabled from the start, for the long-term record.
    pub fn enabled(name: &str) -> Self {
        Self {
            enabled: true,
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Start accumulating from scratch under `label`.
    pub fn enable(&mut self, label: &str) {
        self.enabled = true;
        self.name = Some(label.to_string());
        self.clear();
        self.last_sample = None;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.last_sample = None;
    }

    /// Mark the start of active time; the next sample is measured from here.
    pub fn anchor(&mut self, now: Stamp) {
        self.last_sample = Some(now);
    }

    /// Forget the last sample so inactive time is never attributed.
    pub fn interrupt(&mut self) {
        self.last_sample = None;
    }

    /// Attribute the time since the previous sample to `title`'s label.
    ///
    /// Returns the label the time went to, or `None` if the sample was dropped.
    pub fn sample(&mut self, title: &str, now: Stamp) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        let label = classify(title)?;

        let elapsed = self
            .last_sample
            .map(|prev| now.since(&prev))
            .unwrap_or_default();
        let started_at = self.last_sample.map(|prev| prev.wall).unwrap_or(now.wall);
        self.last_sample = Some(now);

        *self.totals.entry(label.clone()).or_default() += elapsed;
        if let Some(entry) = self.entries.last_mut().filter(|e| e.label == label) {
            entry.duration += elapsed;
        } else {
            self.entries.push(Entry {
                label,
                started_at,
                duration: elapsed,
            });
        }
        self.entries.last().map(|e| e.label.as_str())
    }

    pub fn dump(&mut self, reset: bool) -> LogReport {
        let report = LogReport {
            name: self.name.clone(),
            enabled: self.enabled,
            journal: Vec::new(),
            totals: self
                .totals
                .iter()
                .map(|(label, duration)| Total {
                    label: label.clone(),
                    duration: *duration,
                })
                .collect(),
            entries: self.entries.clone(),
        };
        if reset {
            self.clear();
        }
        report
    }

    fn clear(&mut self) {
        self.totals.clear();
        self.entries.clear();
    }
}
