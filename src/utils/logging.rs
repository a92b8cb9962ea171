//! Formatting macros for the run log.
//!
//! Usage:
//! ```ignore
//! use crate::{run_info, run_warn, run_error};
//!
//! run_info!(log, "{} has {} followers", target, followers);
//! ```
//!
//! The first argument is anything that derefs to a `RunLog`.

/// Formats and appends an `INFO` entry.
#[macro_export]
macro_rules! run_info {
    ($log:expr, $($arg:tt)*) => {
        $log.info(format!($($arg)*))
    };
}

/// Formats and appends a `WARNING` entry.
#[macro_export]
macro_rules! run_warn {
    ($log:expr, $($arg:tt)*) => {
        $log.warn(format!($($arg)*))
    };
}

/// Formats and appends an `ERROR` entry.
#[macro_export]
macro_rules! run_error {
    ($log:expr, $($arg:tt)*) => {
        $log.error(format!($($arg)*))
    };
}
