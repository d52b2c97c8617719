use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

const DEFAULT_FILTER: &str = "blockbar=info";

/// Install the global subscriber. stdout carries the status line, so logs go
/// to stderr or, when configured, are appended to `log_file`.
pub fn init(log_file: Option<&Path>) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_env("BLOCKBAR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let open_err = |source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(open_err)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(open_err)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if let Err(e) = installed {
        eprintln!("blockbar: logging not initialised: {e}");
    }
    Ok(())
}
