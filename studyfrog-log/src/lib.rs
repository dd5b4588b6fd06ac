//! StudyFrog Logging
//!
//! Structured logging shared by the StudyFrog crates, controlled through the
//! `STUDYFROG_*` environment variables.
//!
//! # Features
//!
//! - **Environment-controlled**: `STUDYFROG_DEBUG=1` enables debug logging
//! - **Cheap when disabled**: macros check the level before formatting
//! - **Named targets**: every component logs under its own target
//! - **Capturable**: records emitted on a thread can be captured for assertions
//!
//! # Usage
//!
//! ```rust
//! use studyfrog_log::{debug, info, warn, error, trace};
//!
//! debug!("Registering handler");
//! info!("Dispatched {} notifications", 3);
//! warn!("Event not found");
//! error!("Registry poisoned");
//!
//! let namespace = "GLOBAL";
//! debug!(target: "studyfrog::dispatcher", "Fan-out in namespace '{}'", namespace);
//! ```
//!
//! # Environment Variables
//!
//! - `STUDYFROG_DEBUG=1` - Enable debug logging
//! - `STUDYFROG_LOG_LEVEL=debug|info|warn|error` - Set log level
//! - `STUDYFROG_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `STUDYFROG_LOG_COLOR=1|0` - Enable/disable colors

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::env;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for StudyFrog logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    /// Get colored level name (if color feature enabled).
    #[cfg(feature = "color")]
    pub fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-column format, colored when enabled
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

/// Global debug flag - checked by macros.
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Global log level.
static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Global configuration (lazy initialized).
static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the target
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Pretty,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("STUDYFROG_DEBUG").unwrap_or(false);

        let level = env::var("STUDYFROG_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("STUDYFROG_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Pretty);

        let color = env_flag("STUDYFROG_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        let timestamps = env_flag("STUDYFROG_LOG_TIMESTAMPS").unwrap_or(true);
        let module_path = env_flag("STUDYFROG_LOG_MODULE").unwrap_or(true);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            color,
            timestamps,
            module_path,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Initialize the logging system.
///
/// Reads the environment once. Called implicitly by the first record that
/// reaches an output, but can be called explicitly for eager initialization.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Check if debug logging is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check if a log level is enabled.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Check whether a record at `level` would be observed by anyone, either the
/// configured output or an active [`capture`] on this thread.
#[inline]
pub fn enabled(level: Level) -> bool {
    is_level_enabled(level) || is_capturing()
}

/// Get current log level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level at runtime.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Enable or disable debug mode at runtime.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Get the global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Records and capture
// ============================================================================

/// A single emitted log record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

thread_local! {
    static CAPTURES: RefCell<Vec<Vec<Record>>> = const { RefCell::new(Vec::new()) };
}

fn is_capturing() -> bool {
    CAPTURES.with(|c| !c.borrow().is_empty())
}

struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURES.with(|c| {
            c.borrow_mut().pop();
        });
    }
}

/// Run `f` and collect every record logged on the current thread meanwhile.
///
/// Records are collected regardless of the configured level; they are still
/// written to the output when their level is enabled. Captures nest: an inner
/// capture sees only its own records, the outer one sees the rest.
///
/// ```rust
/// use studyfrog_log::{capture, warn, Level};
///
/// let (value, records) = capture(|| {
///     warn!(target: "studyfrog::test", "careful");
///     7
/// });
///
/// assert_eq!(value, 7);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].level, Level::Warn);
/// ```
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Record>) {
    CAPTURES.with(|c| c.borrow_mut().push(Vec::new()));
    let guard = CaptureGuard;
    let value = f();
    let records = CAPTURES.with(|c| c.borrow_mut().last_mut().map(std::mem::take));
    drop(guard);
    (value, records.unwrap_or_default())
}

// ============================================================================
// Log Output
// ============================================================================

/// Log a message with the given level.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if level == Level::Off {
        return;
    }

    if is_capturing() {
        let record = Record {
            timestamp: Utc::now(),
            level,
            target: target.to_string(),
            message: message.to_string(),
        };
        CAPTURES.with(|c| {
            if let Some(records) = c.borrow_mut().last_mut() {
                records.push(record);
            }
        });
    }

    if !is_level_enabled(level) {
        return;
    }

    let config = config();

    match config.format {
        Format::Pretty => log_pretty(level, target, message, config),
        Format::Compact => log_compact(level, target, message, config),
        Format::Json => log_json(level, target, message),
    }
}

fn log_pretty(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }

    #[cfg(feature = "color")]
    if config.color {
        let _ = write!(stderr, "{:5} ", level.colored());
    } else {
        let _ = write!(stderr, "{:5} ", level.as_str());
    }

    #[cfg(not(feature = "color"))]
    let _ = write!(stderr, "{:5} ", level.as_str());

    if config.module_path && !target.is_empty() {
        let _ = write!(stderr, "[{}] ", target);
    }

    let _ = writeln!(stderr, "{}", message);
}

fn log_compact(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%H:%M:%S"));
    }

    let _ = write!(stderr, "{} ", level.as_str().chars().next().unwrap_or('?'));

    if config.module_path && !target.is_empty() {
        let _ = write!(stderr, "{}: ", target);
    }

    let _ = writeln!(stderr, "{}", message);
}

fn log_json(level: Level, target: &str, message: &str) {
    if let Some(line) = json_line(level, target, message) {
        eprintln!("{}", line);
    }
}

#[cfg(feature = "json")]
fn json_line(level: Level, target: &str, message: &str) -> Option<String> {
    use serde::Serialize;

    #[derive(Serialize)]
    struct LogEntry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let entry = LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    serde_json::to_string(&entry).ok()
}

#[cfg(not(feature = "json"))]
fn json_line(level: Level, target: &str, message: &str) -> Option<String> {
    // Fallback without serde - manually escape JSON strings
    Some(format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}"}}"#,
        Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    ))
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Macros
// ============================================================================

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a debug message.
///
/// Only written out when `STUDYFROG_DEBUG=1` or `STUDYFROG_LOG_LEVEL=debug`.
///
/// # Example
///
/// ```rust
/// use studyfrog_log::debug;
///
/// let name = "backend:stack:created";
/// debug!("Registry created for '{}'", name);
/// debug!(target: "studyfrog::dispatcher", "Registry created for '{}'", name);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Tracing compatibility layer.
    //!
    //! Builds a subscriber whose filter follows the StudyFrog log level, for
    //! applications that also host `tracing`-instrumented libraries.

    use super::*;

    /// Create a tracing subscriber that respects StudyFrog config.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let level = config.level.as_str().to_lowercase();

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color))
    }
}

// ============================================================================
// Tests
// ============================================================================
