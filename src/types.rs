// MIT License
// Copyright 2025--present optq developers

//! C-compatible handle and enum types at the FFI boundary.
//!
//! Every object the caller manipulates lives inside an engine session; the
//! caller only ever holds small `#[repr(C)]` pass-by-value handles. A handle
//! is a *key*, not a pointer: the engine field is the generational session
//! key (`slotmap` key encoded as `u64`), and expression handles additionally
//! carry a one-based index into that session's expression arena.
//!
//! ## Validity model
//!
//! - Zero is never a valid session key, so the all-zero struct is the null
//!   sentinel for every handle kind.
//! - A handle outlives nothing: destroying the engine invalidates the key,
//!   and every derived handle fails its registry lookup from then on. There
//!   is no way to dereference freed memory through a stale handle.
//! - Model, parameters, and solution handles are capabilities over shared
//!   session state; several of them may denote the same engine at once.

use crate::backend::{EngineState, SolutionStatus};

/// Engine run state, as observed through `optq_engine_state`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum optq_state_t {
    OPTQ_STATE_STOPPED = 0,
    OPTQ_STATE_RUNNING = 1,
    OPTQ_STATE_PAUSED = 2,
}

impl From<EngineState> for optq_state_t {
    fn from(state: EngineState) -> Self {
        match state {
            EngineState::Stopped => optq_state_t::OPTQ_STATE_STOPPED,
            EngineState::Running => optq_state_t::OPTQ_STATE_RUNNING,
            EngineState::Paused => optq_state_t::OPTQ_STATE_PAUSED,
        }
    }
}

/// Solution status, as observed through `optq_solution_status`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum optq_solution_status_t {
    OPTQ_SOLUTION_NO_SOLUTION = 0,
    OPTQ_SOLUTION_INCONSISTENT = 1,
    OPTQ_SOLUTION_INFEASIBLE = 2,
    OPTQ_SOLUTION_FEASIBLE = 3,
    OPTQ_SOLUTION_OPTIMAL = 4,
}

impl From<SolutionStatus> for optq_solution_status_t {
    fn from(status: SolutionStatus) -> Self {
        match status {
            SolutionStatus::NoSolution => optq_solution_status_t::OPTQ_SOLUTION_NO_SOLUTION,
            SolutionStatus::Inconsistent => optq_solution_status_t::OPTQ_SOLUTION_INCONSISTENT,
            SolutionStatus::Infeasible => optq_solution_status_t::OPTQ_SOLUTION_INFEASIBLE,
            SolutionStatus::Feasible => optq_solution_status_t::OPTQ_SOLUTION_FEASIBLE,
            SolutionStatus::Optimal => optq_solution_status_t::OPTQ_SOLUTION_OPTIMAL,
        }
    }
}

/// Handle to one engine session. Zero = null.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct optq_engine_t {
    /// Generational session key; `0` is the null sentinel.
    pub key: u64,
}

/// Handle to the model of an engine session. Zero = null.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct optq_model_t {
    /// Owning session key; `0` is the null sentinel.
    pub engine: u64,
}

/// Handle to the tuning parameters of an engine session. Zero = null.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct optq_params_t {
    /// Owning session key; `0` is the null sentinel.
    pub engine: u64,
}

/// Handle to the solution snapshot of an engine session. Zero = null.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct optq_solution_t {
    /// Owning session key; `0` is the null sentinel.
    pub engine: u64,
}

/// Handle to one expression node within an engine session. All-zero = null.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct optq_expr_t {
    /// Owning session key; `0` is the null sentinel.
    pub engine: u64,
    /// One-based index into the session's expression arena; `0` is invalid.
    pub node: u64,
}

impl optq_engine_t {
    pub const NULL: Self = Self { key: 0 };

    pub fn is_null(&self) -> bool {
        self.key == 0
    }
}

impl optq_model_t {
    pub const NULL: Self = Self { engine: 0 };

    pub fn is_null(&self) -> bool {
        self.engine == 0
    }
}

impl optq_params_t {
    pub const NULL: Self = Self { engine: 0 };

    pub fn is_null(&self) -> bool {
        self.engine == 0
    }
}

impl optq_solution_t {
    pub const NULL: Self = Self { engine: 0 };

    pub fn is_null(&self) -> bool {
        self.engine == 0
    }
}

impl optq_expr_t {
    pub const NULL: Self = Self { engine: 0, node: 0 };

    pub fn is_null(&self) -> bool {
        self.engine == 0 || self.node == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles_report_null() {
        assert!(optq_engine_t::NULL.is_null());
        assert!(optq_model_t::NULL.is_null());
        assert!(optq_params_t::NULL.is_null());
        assert!(optq_solution_t::NULL.is_null());
        assert!(optq_expr_t::NULL.is_null());
    }

    #[test]
    fn expr_with_zero_node_is_null() {
        let e = optq_expr_t { engine: 7, node: 0 };
        assert!(e.is_null());
        let e = optq_expr_t { engine: 0, node: 3 };
        assert!(e.is_null());
        let e = optq_expr_t { engine: 7, node: 3 };
        assert!(!e.is_null());
    }

    #[test]
    fn state_enum_maps_from_backend() {
        assert_eq!(
            optq_state_t::from(EngineState::Stopped),
            optq_state_t::OPTQ_STATE_STOPPED
        );
        assert_eq!(
            optq_state_t::from(EngineState::Running),
            optq_state_t::OPTQ_STATE_RUNNING
        );
        assert_eq!(
            optq_state_t::from(EngineState::Paused),
            optq_state_t::OPTQ_STATE_PAUSED
        );
    }

    #[test]
    fn solution_status_enum_maps_from_backend() {
        assert_eq!(
            optq_solution_status_t::from(SolutionStatus::NoSolution),
            optq_solution_status_t::OPTQ_SOLUTION_NO_SOLUTION
        );
        assert_eq!(
            optq_solution_status_t::from(SolutionStatus::Optimal),
            optq_solution_status_t::OPTQ_SOLUTION_OPTIMAL
        );
    }
}
