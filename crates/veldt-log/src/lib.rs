//! A minimal, zero-dependency logging crate for the Veldt workspace.
//!
//! Provides thread-safe leveled logging with automatic module path capture
//! and colored terminal output. Messages go to stderr so they never mix
//! with program output.
//!
//! # Example
//!
//! ```
//! use veldt_log::{warn, debug, Level};
//!
//! veldt_log::set_level(Level::Debug);
//!
//! let used = 96;
//! debug!("cursor advanced to {}", used);
//! warn!("restore past cursor ignored");
//! ```

use std::fmt::Arguments;
use std::sync::atomic::{AtomicU8, Ordering};

/// Log levels ordered from most severe (`Error`) to least severe (`Trace`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Critical failures.
    Error = 0,
    /// Potentially harmful situations.
    Warn = 1,
    /// Informational messages.
    Info = 2,
    /// Detailed diagnostic information.
    Debug = 3,
    /// Most detailed tracing.
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m", // Red
            Level::Warn => "\x1b[33m",  // Yellow
            Level::Info => "\x1b[32m",  // Green
            Level::Debug => "\x1b[36m", // Cyan
            Level::Trace => "\x1b[35m", // Magenta
        }
    }

    /// Returns the string representation of this log level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            3 => Level::Debug,
            4 => Level::Trace,
            _ => Level::Info,
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("invalid log level: {s}")),
        }
    }
}

/// Global minimum level. Stored as a bare atomic so the filter check in the
/// macros is a single relaxed load.
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Sets the global minimum log level. Messages below it are dropped.
pub fn set_level(level: Level) {
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Returns the current global minimum log level.
pub fn level() -> Level {
    Level::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

/// Checks whether a message at `level` would currently be emitted.
pub fn enabled(level: Level) -> bool {
    level as u8 <= MIN_LEVEL.load(Ordering::Relaxed)
}

/// Internal sink called by the macros after the level check passed.
#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments) {
    const RESET: &str = "\x1b[0m";
    eprintln!(
        "{}[{}]{RESET} {target}: {args}",
        level.color_code(),
        level.as_str()
    );
}

/// Logs a message at an explicit level, capturing the caller's module path.
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        if $crate::enabled($level) {
            $crate::__emit($level, module_path!(), format_args!($($arg)*));
        }
    };
}

/// Logs a message at the Error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs a message at the Warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs a message at the Info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs a message at the Debug level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs a message at the Trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
