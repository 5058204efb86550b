// MIT License
// Copyright 2025--present optq developers

//! Model construction: expression factories, combinators, constraints,
//! objective.
//!
//! Factories return an expression handle scoped to the model's session;
//! the all-zero handle signals failure (invalid model handle, or the engine
//! rejected the construction — e.g. an empty variable domain). Combinators
//! additionally require every expression argument to belong to the *same*
//! session as the model; mixing sessions yields the sentinel instead of
//! undefined behaviour.

use crate::backend::{ObjectiveSense, Relation};
use crate::error::Error;
use crate::session::{self, Session};
use crate::status::{guard, report, optq_status_t};
use crate::types::{optq_expr_t, optq_model_t};

fn make_expr(
    model: optq_model_t,
    f: impl FnOnce(&mut Session) -> crate::error::Result<u64>,
) -> optq_expr_t {
    if model.is_null() {
        report(Error::InvalidHandle);
        return optq_expr_t::NULL;
    }
    match session::with_session(model.engine, f) {
        Ok(node) => optq_expr_t {
            engine: model.engine,
            node,
        },
        Err(err) => {
            report(err);
            optq_expr_t::NULL
        }
    }
}

fn run_status(
    model: optq_model_t,
    f: impl FnOnce(&mut Session) -> crate::error::Result<()>,
) -> optq_status_t {
    if model.is_null() {
        return report(Error::InvalidHandle);
    }
    match session::with_session(model.engine, f) {
        Ok(()) => optq_status_t::OPTQ_STATUS_SUCCESS,
        Err(err) => report(err),
    }
}

/// Create an integer decision variable bounded in `[lower, upper]`.
///
/// Returns the null handle if the model handle is invalid or the engine
/// rejects the bounds (e.g. `lower > upper`).
#[no_mangle]
pub unsafe extern "C" fn optq_model_int_var(
    model: optq_model_t,
    lower: i64,
    upper: i64,
) -> optq_expr_t {
    guard(optq_expr_t::NULL, || {
        make_expr(model, |s| s.int_var(lower, upper))
    })
}

/// Create an empty sum aggregate; operands are appended afterwards with
/// [`optq_expr_add_operand`] and their order is preserved.
#[no_mangle]
pub unsafe extern "C" fn optq_model_sum(model: optq_model_t) -> optq_expr_t {
    guard(optq_expr_t::NULL, || make_expr(model, |s| s.sum()))
}

/// Create an empty product aggregate; see [`optq_model_sum`].
#[no_mangle]
pub unsafe extern "C" fn optq_model_prod(model: optq_model_t) -> optq_expr_t {
    guard(optq_expr_t::NULL, || make_expr(model, |s| s.prod()))
}

/// Create an expression wrapping a fixed integer literal.
#[no_mangle]
pub unsafe extern "C" fn optq_model_constant(model: optq_model_t, value: i64) -> optq_expr_t {
    guard(optq_expr_t::NULL, || make_expr(model, |s| s.constant(value)))
}

/// Signal the engine that no further structural changes will be made.
/// Engine-side close failures are swallowed (best-effort).
#[no_mangle]
pub unsafe extern "C" fn optq_model_close(model: optq_model_t) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        run_status(model, |s| {
            s.close_model();
            Ok(())
        })
    })
}

/// Append `operand` to a variadic aggregate (sum or product) in place.
///
/// Both expressions must belong to the same live session. Operand order is
/// preserved and semantically relevant for reproducible floating results.
#[no_mangle]
pub unsafe extern "C" fn optq_expr_add_operand(
    target: optq_expr_t,
    operand: optq_expr_t,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        if target.is_null() || operand.is_null() {
            return report(Error::InvalidHandle);
        }
        if target.engine != operand.engine {
            return report(Error::SessionMismatch);
        }
        match session::with_session(target.engine, |s| s.add_operand(target.node, operand.node)) {
            Ok(()) => optq_status_t::OPTQ_STATUS_SUCCESS,
            Err(err) => report(err),
        }
    })
}

fn relation(
    model: optq_model_t,
    op: Relation,
    left: optq_expr_t,
    right: optq_expr_t,
) -> optq_expr_t {
    if left.is_null() || right.is_null() {
        report(Error::InvalidHandle);
        return optq_expr_t::NULL;
    }
    if model.is_null() || left.engine != model.engine || right.engine != model.engine {
        report(if model.is_null() {
            Error::InvalidHandle
        } else {
            Error::SessionMismatch
        });
        return optq_expr_t::NULL;
    }
    make_expr(model, |s| s.relation(op, left.node, right.node))
}

/// Build `left <= right` as a new boolean-valued expression.
#[no_mangle]
pub unsafe extern "C" fn optq_model_leq(
    model: optq_model_t,
    left: optq_expr_t,
    right: optq_expr_t,
) -> optq_expr_t {
    guard(optq_expr_t::NULL, || {
        relation(model, Relation::Leq, left, right)
    })
}

/// Build `left == right` as a new boolean-valued expression.
#[no_mangle]
pub unsafe extern "C" fn optq_model_eq(
    model: optq_model_t,
    left: optq_expr_t,
    right: optq_expr_t,
) -> optq_expr_t {
    guard(optq_expr_t::NULL, || {
        relation(model, Relation::Eq, left, right)
    })
}

/// Build `left >= right` as a new boolean-valued expression.
#[no_mangle]
pub unsafe extern "C" fn optq_model_geq(
    model: optq_model_t,
    left: optq_expr_t,
    right: optq_expr_t,
) -> optq_expr_t {
    guard(optq_expr_t::NULL, || {
        relation(model, Relation::Geq, left, right)
    })
}

fn model_expr_status(
    model: optq_model_t,
    expr: optq_expr_t,
    f: impl FnOnce(&mut Session, u64) -> crate::error::Result<()>,
) -> optq_status_t {
    if model.is_null() || expr.is_null() {
        return report(Error::InvalidHandle);
    }
    if expr.engine != model.engine {
        return report(Error::SessionMismatch);
    }
    match session::with_session(model.engine, |s| f(s, expr.node)) {
        Ok(()) => optq_status_t::OPTQ_STATUS_SUCCESS,
        Err(err) => report(err),
    }
}

/// Register a boolean-valued expression as a hard constraint.
#[no_mangle]
pub unsafe extern "C" fn optq_model_add_constraint(
    model: optq_model_t,
    expr: optq_expr_t,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        model_expr_status(model, expr, |s, node| s.add_constraint(node))
    })
}

/// Set the objective to minimize `expr`. Repeated calls are forwarded as-is;
/// replace-vs-accumulate semantics are engine-defined.
#[no_mangle]
pub unsafe extern "C" fn optq_model_minimize(
    model: optq_model_t,
    expr: optq_expr_t,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        model_expr_status(model, expr, |s, node| {
            s.set_objective(ObjectiveSense::Minimize, node)
        })
    })
}

/// Set the objective to maximize `expr`. See [`optq_model_minimize`].
#[no_mangle]
pub unsafe extern "C" fn optq_model_maximize(
    model: optq_model_t,
    expr: optq_expr_t,
) -> optq_status_t {
    guard(optq_status_t::OPTQ_STATUS_INTERNAL_ERROR, || {
        model_expr_status(model, expr, |s, node| {
            s.set_objective(ObjectiveSense::Maximize, node)
        })
    })
}
