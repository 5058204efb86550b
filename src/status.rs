// MIT License
// Copyright 2025--present optq developers

//! Error reporting at the C boundary.
//!
//! Three pieces work together to give C callers safe, inspectable failure
//! reporting from Rust:
//!
//! 1. **[`optq_status_t`]** — An integer-valued enum returned from every
//!    mutating `extern "C"` function. `OPTQ_STATUS_SUCCESS` (0) means the
//!    call succeeded; any other value names a failure category. Callers who
//!    want the legacy fire-and-forget contract simply ignore it.
//!
//! 2. **Thread-local error message** — On failure, a human-readable
//!    description is stored in a thread-local `CString`. The C caller
//!    retrieves it with [`optq_last_error()`]. The pointer is valid until
//!    the next `optq_*` call on the same thread.
//!
//! 3. **[`guard`]** — A wrapper used inside every `extern "C"` function to
//!    catch Rust panics before they unwind across the FFI boundary (which is
//!    undefined behaviour). A caught panic becomes the function's sentinel
//!    value with the panic message stored for retrieval.
//!
//! ## Usage from C
//!
//! ```c
//! optq_status_t s = optq_model_add_constraint(model, done);
//! if (s != OPTQ_STATUS_SUCCESS) {
//!     fprintf(stderr, "optq error: %s\n", optq_last_error());
//! }
//! ```

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;

use crate::error::Error;

/// Status codes returned by all mutating C API functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum optq_status_t {
    /// Operation completed successfully.
    OPTQ_STATUS_SUCCESS = 0,
    /// A null, stale, or cross-session handle was passed.
    OPTQ_STATUS_INVALID_HANDLE = 1,
    /// The engine rejected or failed the forwarded operation.
    OPTQ_STATUS_ENGINE_ERROR = 2,
    /// An internal error occurred (e.g. a Rust panic was caught).
    OPTQ_STATUS_INTERNAL_ERROR = 3,
}

impl From<&Error> for optq_status_t {
    fn from(err: &Error) -> Self {
        match err {
            Error::InvalidHandle | Error::SessionMismatch => {
                optq_status_t::OPTQ_STATUS_INVALID_HANDLE
            }
            Error::Rejected | Error::Engine(_) => optq_status_t::OPTQ_STATUS_ENGINE_ERROR,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

/// Store an error message in the thread-local slot.
pub(crate) fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        let c = CString::new(msg)
            .unwrap_or_else(|_| CString::new("(error message contained interior NUL)").unwrap());
        *cell.borrow_mut() = c;
    });
}

/// Record an [`Error`] and return the matching status code.
pub(crate) fn report(err: Error) -> optq_status_t {
    let status = optq_status_t::from(&err);
    set_last_error(&err.to_string());
    status
}

/// Retrieve a pointer to the last error message for the current thread.
///
/// The pointer is valid until the next call to any `optq_*` function on the
/// same thread.
///
/// # Safety
/// This is intended to be called from C. The returned pointer must not be
/// freed by the caller.
#[no_mangle]
pub unsafe extern "C" fn optq_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| cell.borrow().as_ptr())
}

/// Execute a closure, catching any panic and substituting `fallback`.
///
/// On panic, the panic message is stored in the thread-local error slot and
/// a `tracing` event is emitted; the caller receives the sentinel value the
/// lenient C contract promises.
pub(crate) fn guard<T, F>(fallback: T, f: F) -> T
where
    F: FnOnce() -> T,
{
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(e) => {
            let msg = if let Some(s) = e.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = e.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            tracing::error!(target: "optq", panic = %msg, "panic caught at FFI boundary");
            set_last_error(&msg);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_last_error() {
        set_last_error("test error");
        let ptr = unsafe { optq_last_error() };
        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), "test error");
    }

    #[test]
    fn guard_passes_through_on_success() {
        let v = guard(0_i64, || 41 + 1);
        assert_eq!(v, 42);
    }

    #[test]
    fn guard_returns_fallback_on_panic() {
        let v = guard(-1_i64, || panic!("boom"));
        assert_eq!(v, -1);
        let ptr = unsafe { optq_last_error() };
        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), "boom");
    }

    #[test]
    fn report_maps_error_variants() {
        assert_eq!(
            report(Error::InvalidHandle),
            optq_status_t::OPTQ_STATUS_INVALID_HANDLE
        );
        assert_eq!(
            report(Error::Rejected),
            optq_status_t::OPTQ_STATUS_ENGINE_ERROR
        );
        assert_eq!(
            report(Error::Engine("bad bounds".into())),
            optq_status_t::OPTQ_STATUS_ENGINE_ERROR
        );
    }
}
