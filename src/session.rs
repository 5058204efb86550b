// MIT License
// Copyright 2025--present optq developers

//! Engine sessions and the process-global session registry.
//!
//! One [`Session`] is one solve session: the injected [`Backend`] plus an
//! arena mapping the expression handles we hand out to the engine's own
//! tokens. Sessions live in a global generational registry (`slotmap`), so a
//! session key encodes as a single `u64` for the C surface and a destroyed
//! session leaves every derived handle safely stale instead of dangling —
//! the arena and the backend die together.
//!
//! The registry `Mutex` is held only for key lookup; each session carries
//! its own lock. Calls against one engine serialize on that session alone,
//! so a long blocking solve on one engine never delays operations on
//! another. Coordinating access to a single engine remains the caller's
//! responsibility, as is usual for handle-based C APIs.

use std::sync::{Arc, LazyLock, Mutex};

use slotmap::{DefaultKey, Key, KeyData, SlotMap};

use crate::backend::{Backend, EngineState, ExprToken, ObjectiveSense, Relation, SolutionStatus};
use crate::error::{Error, Result};

static SESSIONS: LazyLock<Mutex<SlotMap<DefaultKey, Arc<Mutex<Session>>>>> =
    LazyLock::new(|| Mutex::new(SlotMap::new()));

fn registry() -> std::sync::MutexGuard<'static, SlotMap<DefaultKey, Arc<Mutex<Session>>>> {
    // A panic inside a backend is caught at the c_api layer after the guard
    // is gone; ignore poisoning so one bad call doesn't brick the registry.
    SESSIONS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Allocate a session around `backend`; returns its key (never zero).
pub fn create_session(backend: Box<dyn Backend>) -> u64 {
    registry()
        .insert(Arc::new(Mutex::new(Session::new(backend))))
        .data()
        .as_ffi()
}

/// Drop the session, its expression arena, and the backend (which runs the
/// embedder's `free_fn`). Returns whether a session was actually removed;
/// stale or zero keys are a no-op. If another thread is inside the session,
/// the key goes stale immediately and teardown runs once that call returns.
pub fn destroy_session(key: u64) -> bool {
    registry()
        .remove(DefaultKey::from(KeyData::from_ffi(key)))
        .is_some()
}

/// Whether `key` currently names a live session.
pub fn session_exists(key: u64) -> bool {
    registry().contains_key(DefaultKey::from(KeyData::from_ffi(key)))
}

/// Run `f` against the session named by `key`. The registry lock is
/// released before `f` runs; only the session's own lock is held.
pub fn with_session<R>(key: u64, f: impl FnOnce(&mut Session) -> Result<R>) -> Result<R> {
    let session = registry()
        .get(DefaultKey::from(KeyData::from_ffi(key)))
        .cloned()
        .ok_or(Error::InvalidHandle)?;
    let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut session)
}

/// One engine session: the injected backend plus the expression arena.
pub struct Session {
    backend: Box<dyn Backend>,
    exprs: Vec<ExprToken>,
}

impl Session {
    fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            exprs: Vec::new(),
        }
    }

    /// Record an engine token, returning the one-based arena index used in
    /// public expression handles.
    fn intern(&mut self, token: ExprToken) -> u64 {
        self.exprs.push(token);
        self.exprs.len() as u64
    }

    /// Resolve a one-based arena index back to the engine token. The bounds
    /// check stays in `u64` so oversized forged indices cannot truncate into
    /// range on 32-bit targets.
    fn token(&self, node: u64) -> Result<ExprToken> {
        if node == 0 || node > self.exprs.len() as u64 {
            return Err(Error::InvalidHandle);
        }
        Ok(self.exprs[node as usize - 1])
    }

    pub fn int_var(&mut self, lower: i64, upper: i64) -> Result<u64> {
        let token = self.backend.int_var(lower, upper)?;
        Ok(self.intern(token))
    }

    pub fn sum(&mut self) -> Result<u64> {
        let token = self.backend.sum()?;
        Ok(self.intern(token))
    }

    pub fn prod(&mut self) -> Result<u64> {
        let token = self.backend.prod()?;
        Ok(self.intern(token))
    }

    pub fn constant(&mut self, value: i64) -> Result<u64> {
        let token = self.backend.constant(value)?;
        Ok(self.intern(token))
    }

    pub fn add_operand(&mut self, target: u64, operand: u64) -> Result<()> {
        let target = self.token(target)?;
        let operand = self.token(operand)?;
        self.backend.add_operand(target, operand)
    }

    pub fn relation(&mut self, op: Relation, left: u64, right: u64) -> Result<u64> {
        let left = self.token(left)?;
        let right = self.token(right)?;
        let token = self.backend.relation(op, left, right)?;
        Ok(self.intern(token))
    }

    pub fn add_constraint(&mut self, expr: u64) -> Result<()> {
        let token = self.token(expr)?;
        self.backend.add_constraint(token)
    }

    pub fn set_objective(&mut self, sense: ObjectiveSense, expr: u64) -> Result<()> {
        let token = self.token(expr)?;
        self.backend.set_objective(sense, token)
    }

    /// Best-effort: engine-side close failures are swallowed.
    pub fn close_model(&mut self) {
        if let Err(err) = self.backend.close_model() {
            tracing::debug!(target: "optq", %err, "engine refused model close");
        }
    }

    /// Fire-and-forget: engine-side rejection is discarded.
    pub fn set_verbosity(&mut self, level: i32) {
        if let Err(err) = self.backend.set_verbosity(level) {
            tracing::debug!(target: "optq", %err, level, "verbosity setting discarded");
        }
    }

    /// Fire-and-forget: engine-side rejection is discarded.
    pub fn set_time_limit(&mut self, seconds: i32) {
        if let Err(err) = self.backend.set_time_limit(seconds) {
            tracing::debug!(target: "optq", %err, seconds, "time limit setting discarded");
        }
    }

    /// Fire-and-forget: engine-side rejection is discarded.
    pub fn set_thread_count(&mut self, threads: i32) {
        if let Err(err) = self.backend.set_thread_count(threads) {
            tracing::debug!(target: "optq", %err, threads, "thread count setting discarded");
        }
    }

    /// Blocks until the engine stops. Engine failures are swallowed; callers
    /// observe them through state and solution status.
    pub fn solve(&mut self) {
        if let Err(err) = self.backend.solve() {
            tracing::warn!(target: "optq", %err, "engine solve failed");
        }
    }

    pub fn state(&mut self) -> EngineState {
        self.backend.state()
    }

    pub fn solution_status(&mut self) -> SolutionStatus {
        self.backend.solution_status()
    }

    pub fn int_value(&mut self, expr: u64) -> Result<i64> {
        let token = self.token(expr)?;
        self.backend.int_value(token)
    }

    pub fn double_value(&mut self, expr: u64) -> Result<f64> {
        let token = self.token(expr)?;
        self.backend.double_value(token)
    }
}
