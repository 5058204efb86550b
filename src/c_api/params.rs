// MIT License
// Copyright 2025--present optq developers

//! Solver tuning knobs: verbosity, time limit, thread count.
//!
//! All three setters are fire-and-forget by contract: an invalid handle
//! yields `OPTQ_STATUS_INVALID_HANDLE`, but an engine-side rejection of the
//! value itself (say, a negative thread count) is silently discarded and the
//! call still reports success. Values are write-only; nothing is read back.

use crate::error::Error;
use crate::session::{self, Session};
use crate::status::{guard, report, optq_status_t};
use crate::types::optq_params_t;

fn set(params: optq_params_t, f: impl FnOnce(&mut Session)) -> optq_status_t {
    if params.is_null() {
        return report(Error::InvalidHandle);
    }
    match session::with_session(params.engine, |s| {
        f(s);
        Ok(())
    }) {
        Ok(()) => optq_status_t::OPTQ_STATUS_SUCCESS,
        Err(err) => report(err),
    }
}

/// Set the engine's verbosity level (engine-defined scale).
#[no_mangle]
pub unsafe extern "C" fn optq_params_set_verbosity(
    params: optq_params_t,
    level: i32,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        set(params, |s| s.set_verbosity(level))
    })
}

/// Set the wall-clock time limit for the next solve, in seconds.
#[no_mangle]
pub unsafe extern "C" fn optq_params_set_time_limit(
    params: optq_params_t,
    seconds: i32,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        set(params, |s| s.set_time_limit(seconds))
    })
}

/// Set the number of threads the engine may use internally.
#[no_mangle]
pub unsafe extern "C" fn optq_params_set_thread_count(
    params: optq_params_t,
    threads: i32,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        set(params, |s| s.set_thread_count(threads))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::c_api::engine::{optq_engine_free, optq_engine_params, tests::new_reference_engine};

    #[test]
    fn setters_on_null_handle_report_invalid() {
        let p = optq_params_t::NULL;
        assert_eq!(
            unsafe { optq_params_set_verbosity(p, 1) },
            optq_status_t::OPTQ_STATUS_INVALID_HANDLE
        );
        assert_eq!(
            unsafe { optq_params_set_time_limit(p, 5) },
            optq_status_t::OPTQ_STATUS_INVALID_HANDLE
        );
        assert_eq!(
            unsafe { optq_params_set_thread_count(p, 2) },
            optq_status_t::OPTQ_STATUS_INVALID_HANDLE
        );
    }

    #[test]
    fn setters_accept_values_and_swallow_engine_rejection() {
        let eng = new_reference_engine();
        let params = unsafe { optq_engine_params(eng) };

        assert_eq!(
            unsafe { optq_params_set_verbosity(params, 2) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );
        assert_eq!(
            unsafe { optq_params_set_time_limit(params, 30) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );
        // The reference engine rejects non-positive thread counts, but the
        // fire-and-forget contract hides that from the caller.
        assert_eq!(
            unsafe { optq_params_set_thread_count(params, -4) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );

        unsafe { optq_engine_free(eng) };
    }

    #[test]
    fn setters_on_destroyed_engine_report_invalid() {
        let eng = new_reference_engine();
        let params = unsafe { optq_engine_params(eng) };
        unsafe { optq_engine_free(eng) };
        assert_eq!(
            unsafe { optq_params_set_verbosity(params, 1) },
            optq_status_t::OPTQ_STATUS_INVALID_HANDLE
        );
    }
}
