// MIT License
// Copyright 2025--present optq developers

//! Public C API entry points.
//!
//! Each submodule exposes `extern "C"` functions that cbindgen collects into
//! `include/optq.h`. All functions in this module follow three invariants:
//!
//! 1. **Return a sentinel on any failure** — a null (all-zero) handle, `0` /
//!    `0.0`, the default enum member, or an
//!    [`optq_status_t`](crate::status::optq_status_t) — never a cross-boundary
//!    fault.
//! 2. **Wrap the body in [`guard`](crate::status::guard)** so panics cannot
//!    unwind across the FFI boundary.
//! 3. **Validate handle arguments** (null, staleness, session match) and call
//!    [`set_last_error`](crate::status::set_last_error) before returning a
//!    sentinel.
//!
//! ## Submodules
//!
//! - [`engine`] — Session lifecycle: create, free, sub-handle accessors,
//!   solve, state.
//! - [`model`] — Expression factories, combinators, constraints, objective.
//! - [`params`] — Fire-and-forget solver tuning knobs.
//! - [`solution`] — Status and solved-value reads (lenient and checked).

pub mod engine;
pub mod model;
pub mod params;
pub mod solution;
