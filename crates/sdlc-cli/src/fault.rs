//! Panic containment.
//!
//! [`guard`] runs a closure and turns any panic inside it into
//! [`CompileError::InternalFault`]. A process-wide panic hook, installed on
//! first use, records the panic location and a backtrace for threads that
//! are inside a guard and keeps the default panic message off stderr there.
//! Panics on other threads go to whatever hook was installed before.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::error::CompileError;

struct Fault {
    location: Option<String>,
    stack: String,
}

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_FAULT: RefCell<Option<Fault>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let fault = Fault {
                location: info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
                stack: Backtrace::force_capture().to_string(),
            };
            LAST_FAULT.with(|last| *last.borrow_mut() = Some(fault));
        }));
    });
}

/// Runs `f`, converting a panic into [`CompileError::InternalFault`].
pub fn guard<T>(f: impl FnOnce() -> Result<T, CompileError>) -> Result<T, CompileError> {
    install_hook();

    GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    GUARD_DEPTH.with(|depth| depth.set(depth.get() - 1));

    match result {
        Ok(result) => result,
        Err(payload) => Err(internal_fault(payload)),
    }
}

fn internal_fault(payload: Box<dyn Any + Send>) -> CompileError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    // The hook only records panics raised on this thread.
    match LAST_FAULT.with(|last| last.borrow_mut().take()) {
        Some(fault) => CompileError::InternalFault {
            message: match fault.location {
                Some(location) => format!("{} (at {})", message, location),
                None => message,
            },
            stack: fault.stack,
        },
        None => CompileError::InternalFault {
            message,
            stack: Backtrace::force_capture().to_string(),
        },
    }
}
