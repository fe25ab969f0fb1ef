//! Shared logging utilities for discpack binaries.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "discpack=info,discpack_logging=info";
const LOG_FILE_LIMIT: u64 = 10 * 1024 * 1024;

/// How chatty the console layer should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Only warnings and errors reach the console.
    Quiet,
    /// Whatever `RUST_LOG` (or the default filter) allows.
    #[default]
    Normal,
    /// Debug output for discpack crates.
    Verbose,
}

/// Logging configuration shared by discpack binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbosity: Verbosity,
}

/// Initialize tracing with a per-app log file and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let log_file = LogFile::open(&log_dir, config.app_name)
        .with_context(|| format!("Failed to open log file for {}", config.app_name))?;

    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_filter = match config.verbosity {
        Verbosity::Verbose => EnvFilter::new("discpack=debug,discpack_logging=debug"),
        Verbosity::Quiet => EnvFilter::new("warn"),
        Verbosity::Normal => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Get the discpack home directory: ~/.discpack
pub fn discpack_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("DISCPACK_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".discpack"))
        .unwrap_or_else(|| PathBuf::from(".discpack"))
}

/// Get the logs directory: ~/.discpack/logs
pub fn logs_dir() -> PathBuf {
    discpack_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Append-only log for one app.
///
/// Once `<app>.log` outgrows its limit it is moved to `<app>.old.log`
/// (replacing the previous one) and a fresh file is started, so each app
/// keeps at most two files around.
struct LogFile {
    path: PathBuf,
    previous: PathBuf,
    limit: u64,
    file: File,
    written: u64,
}

impl LogFile {
    fn open(dir: &Path, app_name: &str) -> io::Result<Self> {
        Self::open_with_limit(dir, app_name, LOG_FILE_LIMIT)
    }

    fn open_with_limit(dir: &Path, app_name: &str, limit: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let stem = file_stem(app_name);
        let path = dir.join(format!("{stem}.log"));
        let previous = dir.join(format!("{stem}.old.log"));
        let (file, written) = append_to(&path)?;

        let mut log = Self {
            path,
            previous,
            limit,
            file,
            written,
        };
        if log.written > log.limit {
            log.start_over()?;
        }
        Ok(log)
    }

    fn start_over(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.previous.exists() {
            fs::remove_file(&self.previous)?;
        }
        fs::rename(&self.path, &self.previous)?;
        let (file, written) = append_to(&self.path)?;
        self.file = file;
        self.written = written;
        Ok(())
    }
}

fn append_to(path: &Path) -> io::Result<(File, u64)> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // An oversized record still lands in a fresh file rather than looping.
        if self.written > 0 && self.written + buf.len() as u64 > self.limit {
            self.start_over()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// App names end up in file names.
fn file_stem(app_name: &str) -> String {
    app_name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        })
        .collect()
}
