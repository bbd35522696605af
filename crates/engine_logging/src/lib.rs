#![deny(missing_docs)]
//! Shared logging utilities for the harvester workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a thread-local record context that prefixes every message with the id of
//! the parent record currently being harvested, and a minimal test
//! initializer for the global logger.

use std::cell::RefCell;

thread_local! {
    /// Thread-local storage for the id of the record being harvested.
    static RECORD_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the record id for the current thread.
/// The run controller calls this when it starts harvesting a record.
pub fn set_record_context(record_id: impl Into<String>) {
    let record_id = record_id.into();
    RECORD_CONTEXT.with(|v| *v.borrow_mut() = Some(record_id));
}

/// Clears the record id for the current thread.
pub fn clear_record_context() {
    RECORD_CONTEXT.with(|v| *v.borrow_mut() = None);
}

/// Retrieves the record id for the current thread, if one is set.
pub fn record_context() -> Option<String> {
    RECORD_CONTEXT.with(|v| v.borrow().clone())
}

/// Renders the log prefix for the current thread: `[record_id] ` or nothing.
#[doc(hidden)]
pub fn context_prefix() -> String {
    RECORD_CONTEXT.with(|v| match v.borrow().as_deref() {
        Some(id) => format!("[{id}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::context_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
