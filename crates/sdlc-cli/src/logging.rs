//! Explicit logger handle.
//!
//! No global subscriber is installed. A [`Logger`] is created by the caller
//! and passed down; code that logs runs inside [`Logger::in_scope`], which
//! makes the handle's subscriber the thread-local default for that call.

use tracing::dispatcher::{self, Dispatch};
use tracing::level_filters::LevelFilter;

/// Cloneable handle to a tracing subscriber.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Logger")
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Logger {
    /// A logger that discards every event.
    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// A logger writing to stderr. `verbose` lowers the threshold from WARN
    /// to DEBUG.
    pub fn stderr(verbose: bool) -> Self {
        let level = if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .finish();
        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Wraps an existing dispatcher.
    pub fn from_dispatch(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Runs `f` with this logger receiving every event it emits.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}
