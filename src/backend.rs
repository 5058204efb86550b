// MIT License
// Copyright 2025--present optq developers

//! The engine seam: where the closed optimization engine plugs in.
//!
//! The actual solver (branch-and-bound, local search, propagation — whatever
//! the vendor ships) is a black box this crate never links. It is injected at
//! engine creation as an [`optq_engine_vtable_t`]: a `#[repr(C)]` table of
//! function pointers together with a `void* user_data` and an optional
//! destructor. On the Rust side the same seam is the [`Backend`] trait;
//! [`VtableBackend`] adapts the C table to it.
//!
//! **How it works**
//!
//! 1. The embedding side (typically C or C++) owns an engine object and
//!    registers one trampoline per table entry, casting `user_data` back to
//!    the concrete engine type.
//! 2. The boundary layer dispatches through the table, translating tokens
//!    and raw status/state integers into the crate's closed vocabulary.
//! 3. Unrecognized integers coming back from the engine never escape: they
//!    collapse to the documented defaults (`Stopped`, `NoSolution`, or an
//!    error).
//!
//! **Lifetime contract**
//!
//! - `user_data` is borrowed by the backend; the embedder must keep the
//!   engine object alive for the lifetime of the handle.
//! - If a `free_fn` is provided, ownership of `user_data` transfers to the
//!   backend and the destructor runs when the session is destroyed.
//! - If construction fails (null or incomplete table), `free_fn` is *not*
//!   invoked and the caller retains ownership.

use std::os::raw::c_void;

use crate::error::{Error, Result};

/// Engine-chosen expression identifier. Non-negative values are valid;
/// factories return a negative value to signal rejection.
pub type optq_expr_token_t = i64;

/// Rust-side alias for [`optq_expr_token_t`].
pub type ExprToken = optq_expr_token_t;

/// Destructor for the `user_data` pointer.
pub type optq_free_fn = unsafe extern "C" fn(*mut c_void);

/// Engine run state as seen through the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
    Paused,
}

impl EngineState {
    /// Map a raw engine state code; anything unrecognized is `Stopped`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => EngineState::Running,
            2 => EngineState::Paused,
            _ => EngineState::Stopped,
        }
    }
}

/// Solution status as seen through the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    NoSolution,
    Inconsistent,
    Infeasible,
    Feasible,
    Optimal,
}

impl SolutionStatus {
    /// Map a raw engine status code; anything unrecognized is `NoSolution`.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => SolutionStatus::Inconsistent,
            2 => SolutionStatus::Infeasible,
            3 => SolutionStatus::Feasible,
            4 => SolutionStatus::Optimal,
            _ => SolutionStatus::NoSolution,
        }
    }
}

/// Relational comparison operators the model can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Leq,
    Eq,
    Geq,
}

/// Optimization direction for the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// The operations every engine must provide.
///
/// Methods mirror the engine's native surface one-to-one; the adapter adds
/// no semantics of its own. Parameter setters and `close_model` may fail
/// engine-side — the session layer decides whether to surface or swallow
/// that, per the boundary contract.
pub trait Backend: Send {
    fn int_var(&mut self, lower: i64, upper: i64) -> Result<ExprToken>;
    fn sum(&mut self) -> Result<ExprToken>;
    fn prod(&mut self) -> Result<ExprToken>;
    fn constant(&mut self, value: i64) -> Result<ExprToken>;

    /// Append `operand` to a variadic aggregate in place. Order is preserved.
    fn add_operand(&mut self, target: ExprToken, operand: ExprToken) -> Result<()>;

    fn relation(&mut self, op: Relation, left: ExprToken, right: ExprToken) -> Result<ExprToken>;

    fn add_constraint(&mut self, expr: ExprToken) -> Result<()>;
    fn set_objective(&mut self, sense: ObjectiveSense, expr: ExprToken) -> Result<()>;

    /// One-way transition: no structural mutation after this.
    fn close_model(&mut self) -> Result<()>;

    fn set_verbosity(&mut self, level: i32) -> Result<()>;
    fn set_time_limit(&mut self, seconds: i32) -> Result<()>;
    fn set_thread_count(&mut self, threads: i32) -> Result<()>;

    /// Blocks the calling thread until the engine decides to stop.
    fn solve(&mut self) -> Result<()>;

    fn state(&mut self) -> EngineState;
    fn solution_status(&mut self) -> SolutionStatus;

    fn int_value(&mut self, expr: ExprToken) -> Result<i64>;
    fn double_value(&mut self, expr: ExprToken) -> Result<f64>;
}

/// C table of engine entry points.
///
/// Conventions, chosen so a plain C engine shim stays one line per entry:
/// - factories and combinators return a non-negative [`optq_expr_token_t`],
///   or any negative value on rejection;
/// - mutators return `0` for success, non-zero for an engine-side failure;
/// - `state` / `solution_status` return the raw engine code (mapped through
///   [`EngineState::from_raw`] / [`SolutionStatus::from_raw`]);
/// - value reads write through an out-pointer and return `0` / non-zero.
///
/// Every entry is required; [`optq_engine_new`](crate::c_api::engine::optq_engine_new)
/// fails if any is missing.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct optq_engine_vtable_t {
    pub int_var:
        Option<unsafe extern "C" fn(*mut c_void, i64, i64) -> optq_expr_token_t>,
    pub sum: Option<unsafe extern "C" fn(*mut c_void) -> optq_expr_token_t>,
    pub prod: Option<unsafe extern "C" fn(*mut c_void) -> optq_expr_token_t>,
    pub constant: Option<unsafe extern "C" fn(*mut c_void, i64) -> optq_expr_token_t>,
    pub add_operand:
        Option<unsafe extern "C" fn(*mut c_void, optq_expr_token_t, optq_expr_token_t) -> i32>,
    pub leq: Option<
        unsafe extern "C" fn(
            *mut c_void,
            optq_expr_token_t,
            optq_expr_token_t,
        ) -> optq_expr_token_t,
    >,
    pub eq: Option<
        unsafe extern "C" fn(
            *mut c_void,
            optq_expr_token_t,
            optq_expr_token_t,
        ) -> optq_expr_token_t,
    >,
    pub geq: Option<
        unsafe extern "C" fn(
            *mut c_void,
            optq_expr_token_t,
            optq_expr_token_t,
        ) -> optq_expr_token_t,
    >,
    pub add_constraint: Option<unsafe extern "C" fn(*mut c_void, optq_expr_token_t) -> i32>,
    pub minimize: Option<unsafe extern "C" fn(*mut c_void, optq_expr_token_t) -> i32>,
    pub maximize: Option<unsafe extern "C" fn(*mut c_void, optq_expr_token_t) -> i32>,
    pub close_model: Option<unsafe extern "C" fn(*mut c_void) -> i32>,
    pub set_verbosity: Option<unsafe extern "C" fn(*mut c_void, i32) -> i32>,
    pub set_time_limit: Option<unsafe extern "C" fn(*mut c_void, i32) -> i32>,
    pub set_thread_count: Option<unsafe extern "C" fn(*mut c_void, i32) -> i32>,
    pub solve: Option<unsafe extern "C" fn(*mut c_void) -> i32>,
    pub state: Option<unsafe extern "C" fn(*mut c_void) -> i32>,
    pub solution_status: Option<unsafe extern "C" fn(*mut c_void) -> i32>,
    pub int_value:
        Option<unsafe extern "C" fn(*mut c_void, optq_expr_token_t, *mut i64) -> i32>,
    pub double_value:
        Option<unsafe extern "C" fn(*mut c_void, optq_expr_token_t, *mut f64) -> i32>,
}

impl optq_engine_vtable_t {
    fn is_complete(&self) -> bool {
        self.int_var.is_some()
            && self.sum.is_some()
            && self.prod.is_some()
            && self.constant.is_some()
            && self.add_operand.is_some()
            && self.leq.is_some()
            && self.eq.is_some()
            && self.geq.is_some()
            && self.add_constraint.is_some()
            && self.minimize.is_some()
            && self.maximize.is_some()
            && self.close_model.is_some()
            && self.set_verbosity.is_some()
            && self.set_time_limit.is_some()
            && self.set_thread_count.is_some()
            && self.solve.is_some()
            && self.state.is_some()
            && self.solution_status.is_some()
            && self.int_value.is_some()
            && self.double_value.is_some()
    }
}

/// [`Backend`] over a C vtable + `user_data` + optional destructor.
pub struct VtableBackend {
    vtable: optq_engine_vtable_t,
    user_data: *mut c_void,
    free_fn: Option<optq_free_fn>,
}

// VtableBackend stores a raw pointer but the session registry guarantees
// exclusive access through the opaque handle pattern.
unsafe impl Send for VtableBackend {}

impl VtableBackend {
    /// Adapt a C vtable. Fails if any entry is missing, in which case the
    /// caller retains ownership of `user_data`.
    pub fn new(
        vtable: optq_engine_vtable_t,
        user_data: *mut c_void,
        free_fn: Option<optq_free_fn>,
    ) -> Result<Self> {
        if !vtable.is_complete() {
            return Err(Error::Engine("engine vtable is incomplete".into()));
        }
        Ok(Self {
            vtable,
            user_data,
            free_fn,
        })
    }

    fn token(&self, raw: optq_expr_token_t) -> Result<ExprToken> {
        if raw < 0 {
            Err(Error::Rejected)
        } else {
            Ok(raw)
        }
    }

    fn code(&self, raw: i32) -> Result<()> {
        if raw == 0 {
            Ok(())
        } else {
            Err(Error::Engine(format!("engine returned status {raw}")))
        }
    }
}

impl Drop for VtableBackend {
    fn drop(&mut self) {
        if let Some(free) = self.free_fn {
            if !self.user_data.is_null() {
                unsafe { free(self.user_data) };
            }
        }
    }
}

impl Backend for VtableBackend {
    fn int_var(&mut self, lower: i64, upper: i64) -> Result<ExprToken> {
        let f = self.vtable.int_var.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, lower, upper) };
        self.token(raw)
    }

    fn sum(&mut self) -> Result<ExprToken> {
        let f = self.vtable.sum.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data) };
        self.token(raw)
    }

    fn prod(&mut self) -> Result<ExprToken> {
        let f = self.vtable.prod.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data) };
        self.token(raw)
    }

    fn constant(&mut self, value: i64) -> Result<ExprToken> {
        let f = self.vtable.constant.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, value) };
        self.token(raw)
    }

    fn add_operand(&mut self, target: ExprToken, operand: ExprToken) -> Result<()> {
        let f = self.vtable.add_operand.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, target, operand) };
        self.code(raw)
    }

    fn relation(&mut self, op: Relation, left: ExprToken, right: ExprToken) -> Result<ExprToken> {
        let f = match op {
            Relation::Leq => self.vtable.leq,
            Relation::Eq => self.vtable.eq,
            Relation::Geq => self.vtable.geq,
        }
        .ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, left, right) };
        self.token(raw)
    }

    fn add_constraint(&mut self, expr: ExprToken) -> Result<()> {
        let f = self.vtable.add_constraint.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, expr) };
        self.code(raw)
    }

    fn set_objective(&mut self, sense: ObjectiveSense, expr: ExprToken) -> Result<()> {
        let f = match sense {
            ObjectiveSense::Minimize => self.vtable.minimize,
            ObjectiveSense::Maximize => self.vtable.maximize,
        }
        .ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, expr) };
        self.code(raw)
    }

    fn close_model(&mut self) -> Result<()> {
        let f = self.vtable.close_model.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data) };
        self.code(raw)
    }

    fn set_verbosity(&mut self, level: i32) -> Result<()> {
        let f = self.vtable.set_verbosity.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, level) };
        self.code(raw)
    }

    fn set_time_limit(&mut self, seconds: i32) -> Result<()> {
        let f = self.vtable.set_time_limit.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, seconds) };
        self.code(raw)
    }

    fn set_thread_count(&mut self, threads: i32) -> Result<()> {
        let f = self.vtable.set_thread_count.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data, threads) };
        self.code(raw)
    }

    fn solve(&mut self) -> Result<()> {
        let f = self.vtable.solve.ok_or(Error::Rejected)?;
        let raw = unsafe { f(self.user_data) };
        self.code(raw)
    }

    fn state(&mut self) -> EngineState {
        match self.vtable.state {
            Some(f) => EngineState::from_raw(unsafe { f(self.user_data) }),
            None => EngineState::Stopped,
        }
    }

    fn solution_status(&mut self) -> SolutionStatus {
        match self.vtable.solution_status {
            Some(f) => SolutionStatus::from_raw(unsafe { f(self.user_data) }),
            None => SolutionStatus::NoSolution,
        }
    }

    fn int_value(&mut self, expr: ExprToken) -> Result<i64> {
        let f = self.vtable.int_value.ok_or(Error::Rejected)?;
        let mut out = 0_i64;
        let raw = unsafe { f(self.user_data, expr, &mut out) };
        self.code(raw)?;
        Ok(out)
    }

    fn double_value(&mut self, expr: ExprToken) -> Result<f64> {
        let f = self.vtable.double_value.ok_or(Error::Rejected)?;
        let mut out = 0.0_f64;
        let raw = unsafe { f(self.user_data, expr, &mut out) };
        self.code(raw)?;
        Ok(out)
    }
}
