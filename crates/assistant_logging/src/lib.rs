#![deny(missing_docs)]
//! Shared logging utilities for the assistant client workspace.
//!
//! This crate provides the `assistant_*` logging macros used across the
//! codebase and a minimal test initializer for the global logger. Every
//! record is prefixed with the stream session currently being driven on
//! this thread, so interleaved chat turns can be told apart in one log file.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the stream session being processed.
    static SESSION: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Marks `session_id` as the stream session being driven on this thread.
/// Pass `None` once the session reaches a terminal state.
pub fn set_session(session_id: Option<u64>) {
    SESSION.with(|v| v.set(session_id));
}

/// Returns the stream session currently being driven on this thread, if any.
pub fn current_session() -> Option<u64> {
    SESSION.with(|v| v.get())
}

/// Formats the session prefix used by the logging macros.
///
/// Returns an empty string outside of a session.
#[doc(hidden)]
pub fn session_prefix() -> String {
    match current_session() {
        Some(id) => format!("[session {id}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! assistant_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::session_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! assistant_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::session_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! assistant_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::session_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! assistant_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::session_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! assistant_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::session_prefix(), format_args!($($arg)*));
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

#[cfg(test)]
mod tests {
    use super::{current_session, session_prefix, set_session};

    #[test]
    fn prefix_follows_session_context() {
        set_session(None);
        assert_eq!(session_prefix(), "");

        set_session(Some(7));
        assert_eq!(current_session(), Some(7));
        assert_eq!(session_prefix(), "[session 7] ");

        set_session(None);
        assert_eq!(current_session(), None);
    }
}
