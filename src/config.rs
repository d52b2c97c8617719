use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::Command;
use crate::error::ConfigError;
use crate::pomodoro::COOLDOWN_SECS;
use crate::status::Palette;
use crate::ws::DEFAULT_ADDR;

const POLL_INTERVAL_MS: u64 = 1000; // Tick and sample once per second
const SAMPLE_TIMEOUT_MS: u64 = 800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: SocketAddr,
    pub poll_ms: u64,
    pub cooldown_secs: u64,
    /// Give up on a window query after this long.
    pub sample_timeout_ms: u64,
    /// Shell command run (via `bash -c`) whenever a block finishes.
    pub end_command: Option<String>,
    pub notify: bool,
    /// Write logs here instead of stderr.
    pub log_file: Option<PathBuf>,
    pub palette: Palette,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_addr(),
            poll_ms: POLL_INTERVAL_MS,
            cooldown_secs: COOLDOWN_SECS,
            sample_timeout_ms: SAMPLE_TIMEOUT_MS,
            end_command: None,
            notify: true,
            log_file: None,
            palette: Palette::default(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }

    /// Read a config file. A missing file yields the defaults unless `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        std::fs::write(path, json + "\n").map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_ms == 0 {
            return Err(ConfigError::NotPositive("poll_ms"));
        }
        if self.cooldown_secs == 0 {
            return Err(ConfigError::NotPositive("cooldown_secs"));
        }
        if self.sample_timeout_ms == 0 {
            return Err(ConfigError::NotPositive("sample_timeout_ms"));
        }
        Ok(())
    }
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Run(Config),
    DumpConfig { config: Config, path: PathBuf },
    Ctl { addr: SocketAddr, command: Command },
    Help,
}

#[derive(Debug, Default)]
struct Overrides {
    config: Option<PathBuf>,
    listen: Option<SocketAddr>,
    poll_ms: Option<u64>,
    cooldown_secs: Option<u64>,
    log_file: Option<PathBuf>,
    end_command: Option<String>,
    no_notify: bool,
    dump_config: Option<PathBuf>,
}

impl Invocation {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(env::args().skip(1), default_config_path())
    }

    /// Parse arguments (without the program name). `default_config` is read
    /// when no `--config` is given, and may be missing.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        default_config: PathBuf,
    ) -> Result<Self, ConfigError> {
        let mut args = args.into_iter().peekable();
        if args.peek().map(String::as_str) == Some("ctl") {
            args.next();
            return parse_ctl(args);
        }

        let mut o = Overrides::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => o.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--listen" => o.listen = Some(parse_value(&mut args, &arg)?),
                "--poll-ms" => o.poll_ms = Some(parse_value(&mut args, &arg)?),
                "--cooldown-secs" => o.cooldown_secs = Some(parse_value(&mut args, &arg)?),
                "--log-file" => o.log_file = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--end-command" => o.end_command = Some(value(&mut args, &arg)?),
                "--no-notify" => o.no_notify = true,
                "--dump-config" => o.dump_config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--help" | "-h" => return Ok(Invocation::Help),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        let mut config = match &o.config {
            Some(path) => Config::load(path, true)?,
            None => Config::load(&default_config, false)?,
        };
        if let Some(listen) = o.listen {
            config.listen = listen;
        }
        if let Some(poll_ms) = o.poll_ms {
            config.poll_ms = poll_ms;
        }
        if let Some(cooldown_secs) = o.cooldown_secs {
            config.cooldown_secs = cooldown_secs;
        }
        if o.log_file.is_some() {
            config.log_file = o.log_file;
        }
        if o.end_command.is_some() {
            config.end_command = o.end_command;
        }
        if o.no_notify {
            config.notify = false;
        }
        config.validate()?;

        Ok(match o.dump_config {
            Some(path) => Invocation::DumpConfig { config, path },
            None => Invocation::Run(config),
        })
    }
}

fn parse_ctl(mut args: impl Iterator<Item = String>) -> Result<Invocation, ConfigError> {
    let mut addr = default_addr();
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--addr" => addr = parse_value(&mut args, &arg)?,
            "--help" | "-h" => return Ok(Invocation::Help),
            _ => words.push(arg),
        }
    }

    let mut words = words.into_iter();
    let verb = words
        .next()
        .ok_or_else(|| ConfigError::MissingValue("ctl".to_string()))?;
    let command = match verb.as_str() {
        "start" => Command::StartBlock {
            duration: parse_value(&mut words, &verb)?,
        },
        "pause" => Command::PauseBlock,
        "resume" => Command::ResumeBlock,
        "cancel" => Command::CancelBlock,
        "log-add" => Command::TaskLogAdd {
            label: value(&mut words, &verb)?,
        },
        "log-remove" => Command::TaskLogRemove,
        "log-output" => Command::TaskLogOutput {
            reset: words.any(|w| w == "--reset"),
        },
        "log-output-long" => Command::TaskLogOutputLong {
            reset: words.any(|w| w == "--reset"),
        },
        "status" => Command::Status,
        _ => return Err(ConfigError::UnknownArgument(verb)),
    };
    Ok(Invocation::Ctl { addr, command })
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, ConfigError> {
    args.next()
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn parse_value<T: FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, ConfigError> {
    let raw = value(args, flag)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: raw,
    })
}

fn default_addr() -> SocketAddr {
    SocketAddr::from_str(DEFAULT_ADDR).unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8766)))
}

pub fn default_config_path() -> PathBuf {
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("blockbar").join("config.json")
}

pub fn print_help() {
    // stdout is the status bar's input when running, but --help exits right away
    println!(
        "\
blockbar: pomodoro timer for xmobar

Usage:
  blockbar [--config <path>] [--listen <addr>] [--poll-ms <ms>] [--cooldown-secs <s>]
           [--log-file <path>] [--end-command <cmd>] [--no-notify]
  blockbar --dump-config <path>
  blockbar ctl [--addr <addr>] <command>

Commands:
  start <secs>          Start a block
  pause                 Pause or resume the running block
  resume                Resume a paused block
  cancel                Cancel the running or paused block
  log-add <label>       Reset the activity log and start logging under <label>
  log-remove            Stop logging activity
  log-output [--reset]  Print the activity log, optionally clearing it
  log-output-long [--reset]
                        Print the long-term log kept across task logs
  status                Print the timer state

Options:
  -c, --config       JSON config file (default: $XDG_CONFIG_HOME/blockbar/config.json)
  --listen           Command endpoint address (default: {DEFAULT_ADDR})
  --poll-ms          Tick interval in milliseconds (default: {POLL_INTERVAL_MS})
  --cooldown-secs    Cooldown after each block (default: {COOLDOWN_SECS})
  --log-file         Append logs to this file instead of stderr
  --end-command      Shell command run when a block finishes
  --no-notify        Disable desktop notifications
  --dump-config      Write the effective configuration to <path> and exit
  -h, --help         Print this help"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_when_config_missing() {
        let dir = tempdir().unwrap();
        let inv = Invocation::parse(args(&[]), dir.path().join("missing.json")).unwrap();
        assert_eq!(inv, Invocation::Run(Config::default()));
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r##"{"cooldown_secs": 60, "palette": {"idle": "#101010"}}"##).unwrap();

        let inv = Invocation::parse(
            args(&["--config", path.to_str().unwrap(), "--poll-ms", "250", "--no-notify"]),
            dir.path().join("unused.json"),
        )
        .unwrap();
        let Invocation::Run(config) = inv else {
            panic!("expected run, got {inv:?}");
        };
        assert_eq!(config.cooldown_secs, 60);
        assert_eq!(config.poll_ms, 250);
        assert!(!config.notify);
        assert_eq!(config.palette.idle.to_string(), "#101010");
        assert_eq!(config.palette.warn, Palette::default().warn);
    }

    #[test]
    fn test_invalid_values() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            Invocation::parse(args(&["--poll-ms", "fast"]), missing.clone()),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Invocation::parse(args(&["--cooldown-secs", "0"]), missing.clone()),
            Err(ConfigError::NotPositive("cooldown_secs"))
        ));
        assert!(matches!(
            Invocation::parse(args(&["--listen"]), missing.clone()),
            Err(ConfigError::MissingValue(_))
        ));
        assert!(matches!(
            Invocation::parse(args(&["--bogus"]), missing.clone()),
            Err(ConfigError::UnknownArgument(_))
        ));
        assert!(matches!(
            Invocation::parse(args(&["--config", missing.to_str().unwrap()]), missing.clone()),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_bad_color_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"palette": {"warn": "yellow"}}"#).unwrap();
        assert!(matches!(Config::load(&path, true), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_dump_config_round_trip() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("dump.json");
        let inv = Invocation::parse(
            args(&["--cooldown-secs", "120", "--dump-config", out.to_str().unwrap()]),
            dir.path().join("missing.json"),
        )
        .unwrap();
        let Invocation::DumpConfig { config, path } = inv else {
            panic!("expected dump, got {inv:?}");
        };
        config.write(&path).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        assert!(text.contains("\"block_start\": \"#00ff00\""));
        assert_eq!(Config::load(&out, true).unwrap(), config);
    }

    #[test]
    fn test_ctl_commands() {
        let missing = PathBuf::from("/nonexistent/blockbar.json");
        let inv = Invocation::parse(args(&["ctl", "start", "1500"]), missing.clone()).unwrap();
        assert_eq!(
            inv,
            Invocation::Ctl {
                addr: default_addr(),
                command: Command::StartBlock { duration: 1500 }
            }
        );
        let inv = Invocation::parse(
            args(&["ctl", "--addr", "127.0.0.1:9000", "log-output", "--reset"]),
            missing.clone(),
        )
        .unwrap();
        assert_eq!(
            inv,
            Invocation::Ctl {
                addr: "127.0.0.1:9000".parse().unwrap(),
                command: Command::TaskLogOutput { reset: true }
            }
        );
        let inv = Invocation::parse(args(&["ctl", "log-output-long"]), missing.clone()).unwrap();
        assert!(matches!(
            inv,
            Invocation::Ctl {
                command: Command::TaskLogOutputLong { reset: false },
                ..
            }
        ));
        assert!(Invocation::parse(args(&["ctl", "start"]), missing.clone()).is_err());
        assert!(Invocation::parse(args(&["ctl", "explode"]), missing).is_err());
    }
}
