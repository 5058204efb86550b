// MIT License
// Copyright 2025--present optq developers

//! Engine session lifecycle: create, free, sub-handle accessors, solve, state.
//!
//! The typical usage pattern from C/C++ is:
//!
//! ```c
//! // 1. Create a session around your engine's vtable
//! optq_engine_t eng = optq_engine_new(&my_vtable, my_engine, my_engine_free);
//!
//! // 2. Build the model, tune, solve
//! optq_model_t model = optq_engine_model(eng);
//! /* ... factories, constraints, objective ... */
//! optq_engine_solve(eng);
//!
//! // 3. Read results
//! optq_solution_t sol = optq_engine_solution(eng);
//! /* ... optq_solution_int_value(sol, x) ... */
//!
//! // 4. Clean up — invalidates every handle derived from eng
//! optq_engine_free(eng);
//! ```

use std::os::raw::c_void;

use crate::backend::{optq_engine_vtable_t, optq_free_fn, VtableBackend};
use crate::error::Error;
use crate::session;
use crate::status::{guard, report, set_last_error, optq_status_t};
use crate::types::{optq_engine_t, optq_model_t, optq_params_t, optq_solution_t, optq_state_t};

/// Create a new engine session.
///
/// - `vtable`: the engine's entry points; every entry is required.
/// - `user_data`: opaque pointer forwarded to every vtable invocation
///   (typically a pointer to the engine object).
/// - `free_fn`: optional destructor for `user_data`, run when the session is
///   destroyed. Pass `NULL` if the caller manages the lifetime externally.
///
/// Returns the null handle on any failure (null/incomplete vtable), in which
/// case `free_fn` is *not* invoked and the caller retains ownership of
/// `user_data`. No partial state is exposed on failure.
#[no_mangle]
pub unsafe extern "C" fn optq_engine_new(
    vtable: *const optq_engine_vtable_t,
    user_data: *mut c_void,
    free_fn: Option<optq_free_fn>,
) -> optq_engine_t {
    guard(optq_engine_t::NULL, || {
        if vtable.is_null() {
            set_last_error("optq_engine_new: vtable is NULL");
            return optq_engine_t::NULL;
        }
        match VtableBackend::new(unsafe { *vtable }, user_data, free_fn) {
            Ok(backend) => optq_engine_t {
                key: session::create_session(Box::new(backend)),
            },
            Err(err) => {
                report(err);
                optq_engine_t::NULL
            }
        }
    })
}

/// Destroy an engine session, releasing the backend (running its `free_fn`)
/// and invalidating every handle derived from it.
///
/// Safe no-op on the null handle and on already-destroyed handles.
#[no_mangle]
pub unsafe extern "C" fn optq_engine_free(engine: optq_engine_t) {
    guard((), || {
        session::destroy_session(engine.key);
    })
}

/// Obtain a model handle for the session.
///
/// May be called repeatedly; every returned handle is a fresh capability
/// over the same underlying model state. Returns the null handle if the
/// engine handle is invalid.
#[no_mangle]
pub unsafe extern "C" fn optq_engine_model(engine: optq_engine_t) -> optq_model_t {
    guard(optq_model_t::NULL, || {
        if session::session_exists(engine.key) {
            optq_model_t { engine: engine.key }
        } else {
            report(Error::InvalidHandle);
            optq_model_t::NULL
        }
    })
}

/// Obtain a parameters handle for the session. Same aliasing contract as
/// [`optq_engine_model`].
#[no_mangle]
pub unsafe extern "C" fn optq_engine_params(engine: optq_engine_t) -> optq_params_t {
    guard(optq_params_t::NULL, || {
        if session::session_exists(engine.key) {
            optq_params_t { engine: engine.key }
        } else {
            report(Error::InvalidHandle);
            optq_params_t::NULL
        }
    })
}

/// Obtain a solution handle for the session. Same aliasing contract as
/// [`optq_engine_model`]. Valid to obtain before solving; its status reads
/// `OPTQ_SOLUTION_NO_SOLUTION` until a solve produces one.
#[no_mangle]
pub unsafe extern "C" fn optq_engine_solution(engine: optq_engine_t) -> optq_solution_t {
    guard(optq_solution_t::NULL, || {
        if session::session_exists(engine.key) {
            optq_solution_t { engine: engine.key }
        } else {
            report(Error::InvalidHandle);
            optq_solution_t::NULL
        }
    })
}

/// Run the engine's solve procedure synchronously on the calling thread,
/// blocking until the engine decides to stop. No-op on an invalid handle.
#[no_mangle]
pub unsafe extern "C" fn optq_engine_solve(engine: optq_engine_t) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        match session::with_session(engine.key, |s| {
            s.solve();
            Ok(())
        }) {
            Ok(()) => optq_status_t::OPTQ_STATUS_SUCCESS,
            Err(err) => report(err),
        }
    })
}

/// Observe the engine's run state. `OPTQ_STATE_STOPPED` for an invalid
/// handle or on internal failure.
#[no_mangle]
pub unsafe extern "C" fn optq_engine_state(engine: optq_engine_t) -> optq_state_t {
    guard(optq_state_t::OPTQ_STATE_STOPPED, || {
        match session::with_session(engine.key, |s| Ok(s.state())) {
            Ok(state) => state.into(),
            Err(err) => {
                report(err);
                optq_state_t::OPTQ_STATE_STOPPED
            }
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::c_api::model::*;
    use crate::c_api::params::*;
    use crate::c_api::solution::*;
    use crate::testkit::{reference_free, reference_user_data, reference_vtable};
    use crate::types::optq_solution_status_t;

    pub(crate) fn new_reference_engine() -> optq_engine_t {
        let vt = reference_vtable();
        unsafe { optq_engine_new(&vt, reference_user_data(), Some(reference_free)) }
    }

    #[test]
    fn new_returns_non_null_and_free_invalidates() {
        let eng = new_reference_engine();
        assert!(!eng.is_null());
        let model = unsafe { optq_engine_model(eng) };
        assert!(!model.is_null());
        unsafe { optq_engine_free(eng) };
        let model = unsafe { optq_engine_model(eng) };
        assert!(model.is_null());
    }

    #[test]
    fn free_null_is_noop_and_double_free_is_safe() {
        unsafe { optq_engine_free(optq_engine_t::NULL) };
        let eng = new_reference_engine();
        unsafe { optq_engine_free(eng) };
        unsafe { optq_engine_free(eng) };
    }

    #[test]
    fn null_vtable_yields_null_engine() {
        let eng = unsafe { optq_engine_new(std::ptr::null(), std::ptr::null_mut(), None) };
        assert!(eng.is_null());
    }

    #[test]
    fn incomplete_vtable_yields_null_engine_without_freeing_user_data() {
        let mut vt = reference_vtable();
        vt.solve = None;
        let ud = reference_user_data();
        let eng = unsafe { optq_engine_new(&vt, ud, Some(reference_free)) };
        assert!(eng.is_null());
        // Construction failed, so ownership stayed with us.
        unsafe { reference_free(ud) };
    }

    #[test]
    fn sub_handles_are_fresh_capabilities_over_one_session() {
        let eng = new_reference_engine();
        let m1 = unsafe { optq_engine_model(eng) };
        let m2 = unsafe { optq_engine_model(eng) };
        assert_eq!(m1, m2);
        let p = unsafe { optq_engine_params(eng) };
        let s = unsafe { optq_engine_solution(eng) };
        assert!(!p.is_null());
        assert!(!s.is_null());
        unsafe { optq_engine_free(eng) };
    }

    #[test]
    fn fresh_engine_state_is_stopped() {
        let eng = new_reference_engine();
        assert_eq!(
            unsafe { optq_engine_state(eng) },
            optq_state_t::OPTQ_STATE_STOPPED
        );
        unsafe { optq_engine_free(eng) };
    }

    #[test]
    fn state_and_solve_on_invalid_handle_are_safe() {
        assert_eq!(
            unsafe { optq_engine_state(optq_engine_t::NULL) },
            optq_state_t::OPTQ_STATE_STOPPED
        );
        assert_eq!(
            unsafe { optq_engine_solve(optq_engine_t::NULL) },
            optq_status_t::OPTQ_STATUS_INVALID_HANDLE
        );
    }

    #[test]
    fn full_lifecycle_build_solve_read() {
        let eng = new_reference_engine();
        let model = unsafe { optq_engine_model(eng) };

        let x = unsafe { optq_model_int_var(model, 0, 10) };
        let y = unsafe { optq_model_int_var(model, 0, 10) };
        assert!(!x.is_null());
        assert!(!y.is_null());

        let total = unsafe { optq_model_sum(model) };
        assert_eq!(
            unsafe { optq_expr_add_operand(total, x) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );
        assert_eq!(
            unsafe { optq_expr_add_operand(total, y) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );

        let cap = unsafe { optq_model_constant(model, 15) };
        let within_cap = unsafe { optq_model_leq(model, total, cap) };
        assert!(!within_cap.is_null());
        assert_eq!(
            unsafe { optq_model_add_constraint(model, within_cap) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );
        assert_eq!(
            unsafe { optq_model_maximize(model, total) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );
        assert_eq!(
            unsafe { optq_model_close(model) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );

        let params = unsafe { optq_engine_params(eng) };
        unsafe { optq_params_set_time_limit(params, 5) };
        unsafe { optq_params_set_verbosity(params, 0) };

        assert_eq!(
            unsafe { optq_engine_solve(eng) },
            optq_status_t::OPTQ_STATUS_SUCCESS
        );
        assert_eq!(
            unsafe { optq_engine_state(eng) },
            optq_state_t::OPTQ_STATE_STOPPED
        );

        let sol = unsafe { optq_engine_solution(eng) };
        let status = unsafe { optq_solution_status(sol) };
        assert!(
            status == optq_solution_status_t::OPTQ_SOLUTION_OPTIMAL
                || status == optq_solution_status_t::OPTQ_SOLUTION_FEASIBLE
        );

        let total_v = unsafe { optq_solution_int_value(sol, total) };
        let x_v = unsafe { optq_solution_int_value(sol, x) };
        let y_v = unsafe { optq_solution_int_value(sol, y) };
        assert!(total_v <= 15);
        assert!((0..=10).contains(&x_v));
        assert!((0..=10).contains(&y_v));
        assert_eq!(total_v, x_v + y_v);

        unsafe { optq_engine_free(eng) };

        // Every derived handle is now stale; reads fall back to sentinels.
        assert_eq!(unsafe { optq_solution_int_value(sol, x) }, 0);
        assert_eq!(
            unsafe { optq_solution_status(sol) },
            optq_solution_status_t::OPTQ_SOLUTION_NO_SOLUTION
        );
    }
}
