// MIT License
// Copyright 2025--present optq developers

//! optq-core: a C-linkage boundary adapter over pluggable combinatorial
//! optimization engines.
//!
//! The actual solver — branch-and-bound, local search, propagation, whatever
//! the vendor ships — lives in a closed external engine this crate never
//! links. optq's job is strictly the boundary: translate opaque handles,
//! guard every call against null/stale/cross-session misuse and panics, and
//! remap engine status codes into a small closed vocabulary. The engine
//! plugs in at session creation as a `#[repr(C)]` vtable + `user_data`
//! (see [`backend`]), so the same binary can drive any conforming engine.
//!
//! ## Layers
//!
//! - [`c_api`] — the flat `extern "C"` surface (cbindgen collects it into
//!   `include/optq.h`): lifecycle, model construction, parameters, solve,
//!   solution reads. Sentinel-on-failure throughout, with
//!   [`status::optq_last_error`] and `_checked` readers for callers who want
//!   to distinguish failure from a legitimate zero.
//! - [`session`] — the safe layer underneath: one session per engine,
//!   expression arena, generational registry. Destroying a session
//!   invalidates every derived handle at once; nothing ever dangles.
//! - [`backend`] — the engine seam: the [`backend::Backend`] trait and the
//!   C vtable adapter.
//! - [`testkit`] (feature `testkit`, always on under `cfg(test)`) — a tiny
//!   exhaustive-search reference engine for exercising the boundary without
//!   a real solver.

#![allow(non_camel_case_types)]

pub mod backend;
pub mod c_api;
pub mod error;
pub mod session;
pub mod status;
pub mod types;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
