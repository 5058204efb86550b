// MIT License
// Copyright 2025--present optq developers

//! Solution inspection: status and solved-value reads.
//!
//! The lenient value readers keep the legacy contract: `0` / `0.0` on any
//! failure, which is ambiguous with a true zero result. Callers who care use
//! the `_checked` variants, which write through an out-pointer and return a
//! status — or at minimum check [`optq_solution_status`] before trusting a
//! zero.

use crate::error::Error;
use crate::session;
use crate::status::{guard, report, optq_status_t};
use crate::types::{optq_expr_t, optq_solution_status_t, optq_solution_t};

/// Status of the solution snapshot. `OPTQ_SOLUTION_NO_SOLUTION` for an
/// invalid handle, before any solve, or for an unrecognized engine status.
#[no_mangle]
pub unsafe extern "C" fn optq_solution_status(
    solution: optq_solution_t,
) -> optq_solution_status_t {
    guard(optq_solution_status_t::OPTQ_SOLUTION_NO_SOLUTION, || {
        if solution.is_null() {
            report(Error::InvalidHandle);
            return optq_solution_status_t::OPTQ_SOLUTION_NO_SOLUTION;
        }
        match session::with_session(solution.engine, |s| Ok(s.solution_status())) {
            Ok(status) => status.into(),
            Err(err) => {
                report(err);
                optq_solution_status_t::OPTQ_SOLUTION_NO_SOLUTION
            }
        }
    })
}

fn int_value_impl(solution: optq_solution_t, expr: optq_expr_t) -> crate::error::Result<i64> {
    if solution.is_null() || expr.is_null() {
        return Err(Error::InvalidHandle);
    }
    if expr.engine != solution.engine {
        return Err(Error::SessionMismatch);
    }
    session::with_session(solution.engine, |s| s.int_value(expr.node))
}

fn double_value_impl(solution: optq_solution_t, expr: optq_expr_t) -> crate::error::Result<f64> {
    if solution.is_null() || expr.is_null() {
        return Err(Error::InvalidHandle);
    }
    if expr.engine != solution.engine {
        return Err(Error::SessionMismatch);
    }
    session::with_session(solution.engine, |s| s.double_value(expr.node))
}

/// Solved integer value of `expr`, or `0` on any failure (lenient contract).
#[no_mangle]
pub unsafe extern "C" fn optq_solution_int_value(
    solution: optq_solution_t,
    expr: optq_expr_t,
) -> i64 {
    guard(0, || match int_value_impl(solution, expr) {
        Ok(v) => v,
        Err(err) => {
            report(err);
            0
        }
    })
}

/// Solved floating value of `expr`, or `0.0` on any failure (lenient
/// contract).
#[no_mangle]
pub unsafe extern "C" fn optq_solution_double_value(
    solution: optq_solution_t,
    expr: optq_expr_t,
) -> f64 {
    guard(0.0, || match double_value_impl(solution, expr) {
        Ok(v) => v,
        Err(err) => {
            report(err);
            0.0
        }
    })
}

/// Like [`optq_solution_int_value`], but distinguishes failure from a true
/// zero: writes the value through `out` and returns a status.
#[no_mangle]
pub unsafe extern "C" fn optq_solution_int_value_checked(
    solution: optq_solution_t,
    expr: optq_expr_t,
    out: *mut i64,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        if out.is_null() {
            return report(Error::InvalidHandle);
        }
        match int_value_impl(solution, expr) {
            Ok(v) => {
                unsafe { *out = v };
                optq_status_t::OPTQ_STATUS_SUCCESS
            }
            Err(err) => report(err),
        }
    })
}

/// Like [`optq_solution_double_value`], but distinguishes failure from a
/// true zero. See [`optq_solution_int_value_checked`].
#[no_mangle]
pub unsafe extern "C" fn optq_solution_double_value_checked(
    solution: optq_solution_t,
    expr: optq_expr_t,
    out: *mut f64,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        if out.is_null() {
            return report(Error::InvalidHandle);
        }
        match double_value_impl(solution, expr) {
            Ok(v) => {
                unsafe { *out = v };
                optq_status_t::OPTQ_STATUS_SUCCESS
            }
            Err(err) => report(err),
        }
    })
}
