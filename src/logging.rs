//! Step logging handles.
//!
//! A [`Logger`] is the opaque `global_log` handle threaded through resolved
//! properties. It outputs to:
//! - tracing (stderr/file, as configured by the binary) when console output is enabled
//! - an append-only log file, when one is attached
//!
//! Level names follow the usual `CRITICAL`/`ERROR`/`WARNING`/`INFO`/`DEBUG` set.

use crate::config::StepProperties;
use crate::error::{ConfError, ConfResult};
use crate::paths::{create_dir, create_name};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU8, Ordering},
};

/// Severity of a log message, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Parse a level name, case-insensitively. `NOTSET` means everything.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" | "NOTSET" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" | "WARN" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" | "FATAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic level filter shared by all clones of a logger.
///
/// The level is stored as a u8: 0=Debug, 1=Info, 2=Warning, 3=Error, 4=Critical
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    /// Create a new filter with the given minimum level.
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level_to_u8(level)))
    }

    /// Get the current minimum level.
    pub fn get(&self) -> LogLevel {
        u8_to_level(self.0.load(Ordering::Relaxed))
    }

    /// Set the minimum level.
    pub fn set(&self, level: LogLevel) {
        self.0.store(level_to_u8(level), Ordering::Relaxed);
    }

    /// Check if a message at the given level should be logged.
    pub fn should_log(&self, level: LogLevel) -> bool {
        level_to_u8(level) >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

fn level_to_u8(level: LogLevel) -> u8 {
    match level {
        LogLevel::Debug => 0,
        LogLevel::Info => 1,
        LogLevel::Warning => 2,
        LogLevel::Error => 3,
        LogLevel::Critical => 4,
    }
}

fn u8_to_level(val: u8) -> LogLevel {
    match val {
        0 => LogLevel::Debug,
        1 => LogLevel::Info,
        2 => LogLevel::Warning,
        3 => LogLevel::Error,
        _ => LogLevel::Critical,
    }
}

/// Cloneable logging handle. Clones share the level filter and the file sink.
#[derive(Clone)]
pub struct Logger {
    level_filter: Arc<LogLevelFilter>,
    name: Option<String>,
    console: bool,
    sink: Option<Arc<Mutex<File>>>,
    file_path: Option<PathBuf>,
}

impl Logger {
    /// Create a console-only logger at INFO.
    pub fn new() -> Self {
        Self {
            level_filter: Arc::new(LogLevelFilter::default()),
            name: None,
            console: true,
            sink: None,
            file_path: None,
        }
    }

    /// Set the logger name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the minimum level.
    pub fn with_level(self, level: LogLevel) -> Self {
        self.level_filter.set(level);
        self
    }

    /// Enable or disable tracing (console) output.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Append messages to `path`, creating the file if needed.
    pub fn with_file(mut self, path: &Path) -> ConfResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ConfError::io(path, e))?;
        self.sink = Some(Arc::new(Mutex::new(file)));
        self.file_path = Some(path.to_path_buf());
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn level(&self) -> LogLevel {
        self.level_filter.get()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Build the `(out, err)` loggers for a resolved step.
    ///
    /// Uses the entry's `path`, `prefix` and `step`, `log_level` (default INFO)
    /// and `can_write_console_log` (default true).
    pub fn for_step(props: &StepProperties) -> ConfResult<(Logger, Logger)> {
        let level = props
            .log_level()
            .and_then(LogLevel::parse)
            .unwrap_or(LogLevel::Info);
        step_logs(
            &props.path,
            Some(props.prefix.as_str()),
            props.step.as_deref(),
            props.can_write_console_log(),
            level,
        )
    }

    /// Log a message to all configured endpoints.
    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.level_filter.should_log(level) {
            return;
        }

        if self.console {
            match level {
                LogLevel::Error | LogLevel::Critical => match self.name {
                    Some(ref name) => tracing::error!(logger = %name, "{}", message),
                    None => tracing::error!("{}", message),
                },
                LogLevel::Warning => match self.name {
                    Some(ref name) => tracing::warn!(logger = %name, "{}", message),
                    None => tracing::warn!("{}", message),
                },
                LogLevel::Info => match self.name {
                    Some(ref name) => tracing::info!(logger = %name, "{}", message),
                    None => tracing::info!("{}", message),
                },
                LogLevel::Debug => match self.name {
                    Some(ref name) => tracing::debug!(logger = %name, "{}", message),
                    None => tracing::debug!("{}", message),
                },
            }
        }

        if let Some(ref sink) = self.sink {
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
            let mut file = sink.lock().unwrap_or_else(|poisoned| {
                tracing::warn!(path = ?self.file_path, "Log file lock was poisoned, recovering");
                PoisonError::into_inner(poisoned)
            });
            if let Err(e) = writeln!(file, "{} [{}] {}", stamp, level, message) {
                tracing::warn!(path = ?self.file_path, error = %e, "Failed to write log file");
            }
        }
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    /// Log an info message.
    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    /// Log a warning message.
    pub fn warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg);
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    /// Log a critical message.
    pub fn critical(&self, msg: &str) {
        self.log(LogLevel::Critical, msg);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("console", &self.console)
            .field("file_path", &self.file_path)
            .finish()
    }
}

/// Two handles are equal when they are clones of the same logger.
impl PartialEq for Logger {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.level_filter, &other.level_filter) && self.name == other.name
    }
}

/// Create the out and err loggers of a step.
///
/// Files are `path/prefix_step_log.out` and `path/prefix_step_log.err`;
/// `path` is created if missing.
pub fn step_logs(
    path: &Path,
    prefix: Option<&str>,
    step: Option<&str>,
    console: bool,
    level: LogLevel,
) -> ConfResult<(Logger, Logger)> {
    create_dir(path)?;
    let out_path = create_name(Some(path), prefix, step, Some("log.out"));
    let err_path = create_name(Some(path), prefix, step, Some("log.err"));

    let named = |file: &Path| {
        let logger = Logger::new()
            .with_name(file.to_string_lossy().into_owned())
            .with_level(level)
            .with_console(console);
        logger.with_file(file)
    };

    Ok((named(&out_path)?, named(&err_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_levels() {
        assert_eq!(LogLevel::parse("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse(" WARNING "), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("warn"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse("NOTSET"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_level_filter() {
        let filter = LogLevelFilter::new(LogLevel::Warning);

        assert!(!filter.should_log(LogLevel::Debug));
        assert!(!filter.should_log(LogLevel::Info));

        assert!(filter.should_log(LogLevel::Warning));
        assert!(filter.should_log(LogLevel::Error));
        assert!(filter.should_log(LogLevel::Critical));
    }

    #[test]
    fn test_level_roundtrip() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ] {
            let filter = LogLevelFilter::new(level);
            assert_eq!(filter.get(), level);
        }
    }

    #[test]
    fn test_clones_compare_equal() {
        let logger = Logger::new().with_name("wf");
        let clone = logger.clone();
        assert_eq!(logger, clone);
        assert_ne!(logger, Logger::new().with_name("wf"));
    }

    #[test]
    fn test_step_logs_write_filtered_lines() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("step1");
        let (out, err) = step_logs(&dir, Some("run"), Some("step1"), false, LogLevel::Info).unwrap();

        out.debug("hidden");
        out.info("visible");
        err.error("broken");

        let out_text = std::fs::read_to_string(dir.join("run_step1_log.out")).unwrap();
        assert!(out_text.contains("[INFO] visible"));
        assert!(!out_text.contains("hidden"));

        let err_text = std::fs::read_to_string(dir.join("run_step1_log.err")).unwrap();
        assert!(err_text.contains("[ERROR] broken"));
    }

    #[test]
    fn test_poisoned_sink_keeps_logging() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wf.log");
        let logger = Logger::new().with_console(false).with_file(&path).unwrap();

        let holder = logger.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.sink.as_ref().unwrap().lock().unwrap();
            panic!("poison the sink");
        })
        .join();
        assert!(logger.sink.as_ref().unwrap().is_poisoned());

        logger.info("after poison");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[INFO] after poison"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_does_not_panic() {
        // Every write to /dev/full fails with ENOSPC
        let Ok(logger) = Logger::new().with_console(false).with_file(Path::new("/dev/full")) else {
            return;
        };
        logger.error("nowhere to go");
        logger.error("still nowhere to go");
    }
}
