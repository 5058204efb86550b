// MIT License
// Copyright 2025--present optq developers

//! Reference engine for exercising the boundary without a real solver.
//!
//! [`ReferenceBackend`] is a deliberately tiny engine: bounded integer
//! variables, sum/product aggregates, relational comparisons, and an
//! exhaustive search over the variable domains. It exists so the adapter's
//! own tests (and embedders' integration tests, via the `testkit` feature)
//! can run the full create → model → solve → read-back path, including the
//! C vtable plug through [`reference_vtable`] and [`reference_user_data`].
//!
//! It is not a product solver: domains are enumerated outright and the
//! search refuses models with more than [`MAX_ASSIGNMENTS`] combinations.

use std::os::raw::c_void;

use crate::backend::{
    optq_engine_vtable_t, optq_expr_token_t, Backend, EngineState, ExprToken, ObjectiveSense,
    Relation, SolutionStatus,
};
use crate::error::{Error, Result};
use crate::types::{optq_solution_status_t, optq_state_t};

/// Upper bound on enumerated assignments before the search gives up.
pub const MAX_ASSIGNMENTS: u64 = 1 << 20;

#[derive(Debug, Clone)]
enum Node {
    Var { lower: i64, upper: i64 },
    Const(i64),
    Sum(Vec<usize>),
    Prod(Vec<usize>),
    Rel(Relation, usize, usize),
}

/// Exhaustive-search engine over bounded integer variables.
pub struct ReferenceBackend {
    nodes: Vec<Node>,
    vars: Vec<usize>,
    constraints: Vec<usize>,
    objective: Option<(ObjectiveSense, usize)>,
    closed: bool,
    verbosity: i32,
    time_limit: Option<i32>,
    threads: i32,
    status: SolutionStatus,
    best: Vec<i64>,
}

impl ReferenceBackend {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            vars: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            closed: false,
            verbosity: 0,
            time_limit: None,
            threads: 1,
            status: SolutionStatus::NoSolution,
            best: Vec::new(),
        }
    }

    fn push(&mut self, node: Node) -> ExprToken {
        self.nodes.push(node);
        (self.nodes.len() - 1) as ExprToken
    }

    fn index(&self, token: ExprToken) -> Result<usize> {
        let idx = usize::try_from(token).map_err(|_| Error::Rejected)?;
        if idx >= self.nodes.len() {
            return Err(Error::Rejected);
        }
        Ok(idx)
    }

    /// Evaluate a node under an assignment of values to `self.vars`.
    fn eval(&self, idx: usize, assignment: &[i64]) -> i64 {
        match &self.nodes[idx] {
            Node::Var { .. } => {
                let pos = self.vars.iter().position(|&v| v == idx).unwrap_or(0);
                assignment[pos]
            }
            Node::Const(v) => *v,
            Node::Sum(ops) => ops
                .iter()
                .fold(0_i64, |acc, &o| acc.saturating_add(self.eval(o, assignment))),
            Node::Prod(ops) => ops
                .iter()
                .fold(1_i64, |acc, &o| acc.saturating_mul(self.eval(o, assignment))),
            Node::Rel(op, l, r) => {
                let l = self.eval(*l, assignment);
                let r = self.eval(*r, assignment);
                let holds = match op {
                    Relation::Leq => l <= r,
                    Relation::Eq => l == r,
                    Relation::Geq => l >= r,
                };
                holds as i64
            }
        }
    }

    /// Whether `needle` is reachable from `from` through operands. Keeps
    /// the node graph acyclic, which the recursive `eval` relies on.
    fn reaches(&self, from: usize, needle: usize) -> bool {
        if from == needle {
            return true;
        }
        match &self.nodes[from] {
            Node::Var { .. } | Node::Const(_) => false,
            Node::Sum(ops) | Node::Prod(ops) => ops.iter().any(|&o| self.reaches(o, needle)),
            Node::Rel(_, l, r) => self.reaches(*l, needle) || self.reaches(*r, needle),
        }
    }

    fn feasible(&self, assignment: &[i64]) -> bool {
        self.constraints
            .iter()
            .all(|&c| self.eval(c, assignment) != 0)
    }

    fn search_space(&self) -> Option<u64> {
        let mut total: u64 = 1;
        for &v in &self.vars {
            let Node::Var { lower, upper } = self.nodes[v] else {
                return None;
            };
            // Wrapping is exact here: lower <= upper, so the distance fits
            // u64 even for bounds spanning the whole i64 range.
            let width = upper.wrapping_sub(lower) as u64;
            let width = width.checked_add(1)?;
            total = total.checked_mul(width)?;
            if total > MAX_ASSIGNMENTS {
                return None;
            }
        }
        Some(total)
    }

    fn run_search(&mut self) -> Result<()> {
        self.search_space()
            .ok_or_else(|| Error::Engine("search space too large for reference engine".into()))?;

        let domains: Vec<(i64, i64)> = self
            .vars
            .iter()
            .map(|&v| match self.nodes[v] {
                Node::Var { lower, upper } => (lower, upper),
                _ => (0, 0),
            })
            .collect();

        let mut current: Vec<i64> = domains.iter().map(|&(lo, _)| lo).collect();
        let mut best: Option<(i64, Vec<i64>)> = None;

        loop {
            if self.feasible(&current) {
                let score = self
                    .objective
                    .map(|(_, obj)| self.eval(obj, &current))
                    .unwrap_or(0);
                let better = match (&best, self.objective) {
                    (None, _) => true,
                    (Some((incumbent, _)), Some((ObjectiveSense::Minimize, _))) => {
                        score < *incumbent
                    }
                    (Some((incumbent, _)), Some((ObjectiveSense::Maximize, _))) => {
                        score > *incumbent
                    }
                    (Some(_), None) => false,
                };
                if better {
                    best = Some((score, current.clone()));
                }
            }

            // Odometer increment over the domains, leftmost fastest.
            let mut pos = 0;
            loop {
                if pos == domains.len() {
                    // Wrapped all the way around: enumeration complete.
                    match best {
                        Some((_, assignment)) => {
                            self.best = assignment;
                            self.status = SolutionStatus::Optimal;
                        }
                        None => self.status = SolutionStatus::Infeasible,
                    }
                    return Ok(());
                }
                current[pos] += 1;
                if current[pos] <= domains[pos].1 {
                    break;
                }
                current[pos] = domains[pos].0;
                pos += 1;
            }
        }
    }

    fn solved(&self) -> bool {
        matches!(
            self.status,
            SolutionStatus::Feasible | SolutionStatus::Optimal
        )
    }

    /// Last accepted verbosity level.
    pub fn verbosity(&self) -> i32 {
        self.verbosity
    }

    /// Last accepted time limit, if any. The search itself ignores it.
    pub fn time_limit(&self) -> Option<i32> {
        self.time_limit
    }

    /// Last accepted thread count. The search is single-threaded regardless.
    pub fn thread_count(&self) -> i32 {
        self.threads
    }
}

impl Default for ReferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ReferenceBackend {
    fn int_var(&mut self, lower: i64, upper: i64) -> Result<ExprToken> {
        if self.closed {
            return Err(Error::Rejected);
        }
        if lower > upper {
            return Err(Error::Engine(format!(
                "empty variable domain [{lower}, {upper}]"
            )));
        }
        let token = self.push(Node::Var { lower, upper });
        self.vars.push(token as usize);
        Ok(token)
    }

    fn sum(&mut self) -> Result<ExprToken> {
        if self.closed {
            return Err(Error::Rejected);
        }
        Ok(self.push(Node::Sum(Vec::new())))
    }

    fn prod(&mut self) -> Result<ExprToken> {
        if self.closed {
            return Err(Error::Rejected);
        }
        Ok(self.push(Node::Prod(Vec::new())))
    }

    fn constant(&mut self, value: i64) -> Result<ExprToken> {
        if self.closed {
            return Err(Error::Rejected);
        }
        Ok(self.push(Node::Const(value)))
    }

    fn add_operand(&mut self, target: ExprToken, operand: ExprToken) -> Result<()> {
        let target = self.index(target)?;
        let operand = self.index(operand)?;
        if self.reaches(operand, target) {
            return Err(Error::Engine("operand would make the aggregate cyclic".into()));
        }
        match &mut self.nodes[target] {
            Node::Sum(ops) | Node::Prod(ops) => {
                ops.push(operand);
                Ok(())
            }
            _ => Err(Error::Engine("operand target is not an aggregate".into())),
        }
    }

    fn relation(&mut self, op: Relation, left: ExprToken, right: ExprToken) -> Result<ExprToken> {
        if self.closed {
            return Err(Error::Rejected);
        }
        let left = self.index(left)?;
        let right = self.index(right)?;
        Ok(self.push(Node::Rel(op, left, right)))
    }

    fn add_constraint(&mut self, expr: ExprToken) -> Result<()> {
        if self.closed {
            return Err(Error::Rejected);
        }
        let idx = self.index(expr)?;
        self.constraints.push(idx);
        Ok(())
    }

    fn set_objective(&mut self, sense: ObjectiveSense, expr: ExprToken) -> Result<()> {
        if self.closed {
            return Err(Error::Rejected);
        }
        let idx = self.index(expr)?;
        // Replace semantics; repeated calls keep the latest objective.
        self.objective = Some((sense, idx));
        Ok(())
    }

    fn close_model(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn set_verbosity(&mut self, level: i32) -> Result<()> {
        if level < 0 {
            return Err(Error::Rejected);
        }
        self.verbosity = level;
        Ok(())
    }

    fn set_time_limit(&mut self, seconds: i32) -> Result<()> {
        if seconds <= 0 {
            return Err(Error::Rejected);
        }
        self.time_limit = Some(seconds);
        Ok(())
    }

    fn set_thread_count(&mut self, threads: i32) -> Result<()> {
        if threads <= 0 {
            return Err(Error::Rejected);
        }
        self.threads = threads;
        Ok(())
    }

    fn solve(&mut self) -> Result<()> {
        self.run_search()
    }

    fn state(&mut self) -> EngineState {
        // solve() is synchronous, so callers only ever observe Stopped.
        EngineState::Stopped
    }

    fn solution_status(&mut self) -> SolutionStatus {
        self.status
    }

    fn int_value(&mut self, expr: ExprToken) -> Result<i64> {
        if !self.solved() {
            return Err(Error::Rejected);
        }
        let idx = self.index(expr)?;
        Ok(self.eval(idx, &self.best))
    }

    fn double_value(&mut self, expr: ExprToken) -> Result<f64> {
        self.int_value(expr).map(|v| v as f64)
    }
}

/// Box a fresh [`ReferenceBackend`] as the `user_data` for
/// [`reference_vtable`]. Pair it with [`reference_free`] so the session
/// destructor releases it.
pub fn reference_user_data() -> *mut c_void {
    Box::into_raw(Box::new(ReferenceBackend::new())) as *mut c_void
}

/// Destructor trampoline matching [`reference_user_data`].
pub unsafe extern "C" fn reference_free(ud: *mut c_void) {
    if !ud.is_null() {
        drop(unsafe { Box::from_raw(ud as *mut ReferenceBackend) });
    }
}

unsafe fn backend<'a>(ud: *mut c_void) -> &'a mut ReferenceBackend {
    unsafe { &mut *(ud as *mut ReferenceBackend) }
}

fn token_or_reject(res: Result<ExprToken>) -> optq_expr_token_t {
    res.unwrap_or(-1)
}

fn code(res: Result<()>) -> i32 {
    match res {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

unsafe extern "C" fn rb_int_var(ud: *mut c_void, lower: i64, upper: i64) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.int_var(lower, upper))
}
unsafe extern "C" fn rb_sum(ud: *mut c_void) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.sum())
}
unsafe extern "C" fn rb_prod(ud: *mut c_void) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.prod())
}
unsafe extern "C" fn rb_constant(ud: *mut c_void, value: i64) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.constant(value))
}
unsafe extern "C" fn rb_add_operand(
    ud: *mut c_void,
    target: optq_expr_token_t,
    operand: optq_expr_token_t,
) -> i32 {
    code(unsafe { backend(ud) }.add_operand(target, operand))
}
unsafe extern "C" fn rb_leq(
    ud: *mut c_void,
    left: optq_expr_token_t,
    right: optq_expr_token_t,
) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.relation(Relation::Leq, left, right))
}
unsafe extern "C" fn rb_eq(
    ud: *mut c_void,
    left: optq_expr_token_t,
    right: optq_expr_token_t,
) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.relation(Relation::Eq, left, right))
}
unsafe extern "C" fn rb_geq(
    ud: *mut c_void,
    left: optq_expr_token_t,
    right: optq_expr_token_t,
) -> optq_expr_token_t {
    token_or_reject(unsafe { backend(ud) }.relation(Relation::Geq, left, right))
}
unsafe extern "C" fn rb_add_constraint(ud: *mut c_void, expr: optq_expr_token_t) -> i32 {
    code(unsafe { backend(ud) }.add_constraint(expr))
}
unsafe extern "C" fn rb_minimize(ud: *mut c_void, expr: optq_expr_token_t) -> i32 {
    code(unsafe { backend(ud) }.set_objective(ObjectiveSense::Minimize, expr))
}
unsafe extern "C" fn rb_maximize(ud: *mut c_void, expr: optq_expr_token_t) -> i32 {
    code(unsafe { backend(ud) }.set_objective(ObjectiveSense::Maximize, expr))
}
unsafe extern "C" fn rb_close_model(ud: *mut c_void) -> i32 {
    code(unsafe { backend(ud) }.close_model())
}
unsafe extern "C" fn rb_set_verbosity(ud: *mut c_void, level: i32) -> i32 {
    code(unsafe { backend(ud) }.set_verbosity(level))
}
unsafe extern "C" fn rb_set_time_limit(ud: *mut c_void, seconds: i32) -> i32 {
    code(unsafe { backend(ud) }.set_time_limit(seconds))
}
unsafe extern "C" fn rb_set_thread_count(ud: *mut c_void, threads: i32) -> i32 {
    code(unsafe { backend(ud) }.set_thread_count(threads))
}
unsafe extern "C" fn rb_solve(ud: *mut c_void) -> i32 {
    code(unsafe { backend(ud) }.solve())
}
unsafe extern "C" fn rb_state(ud: *mut c_void) -> i32 {
    optq_state_t::from(unsafe { backend(ud) }.state()) as i32
}
unsafe extern "C" fn rb_solution_status(ud: *mut c_void) -> i32 {
    optq_solution_status_t::from(unsafe { backend(ud) }.solution_status()) as i32
}
unsafe extern "C" fn rb_int_value(
    ud: *mut c_void,
    expr: optq_expr_token_t,
    out: *mut i64,
) -> i32 {
    match unsafe { backend(ud) }.int_value(expr) {
        Ok(v) => {
            unsafe { *out = v };
            0
        }
        Err(_) => 1,
    }
}
unsafe extern "C" fn rb_double_value(
    ud: *mut c_void,
    expr: optq_expr_token_t,
    out: *mut f64,
) -> i32 {
    match unsafe { backend(ud) }.double_value(expr) {
        Ok(v) => {
            unsafe { *out = v };
            0
        }
        Err(_) => 1,
    }
}

/// Complete vtable over [`ReferenceBackend`] trampolines.
pub fn reference_vtable() -> optq_engine_vtable_t {
    optq_engine_vtable_t {
        int_var: Some(rb_int_var),
        sum: Some(rb_sum),
        prod: Some(rb_prod),
        constant: Some(rb_constant),
        add_operand: Some(rb_add_operand),
        leq: Some(rb_leq),
        eq: Some(rb_eq),
        geq: Some(rb_geq),
        add_constraint: Some(rb_add_constraint),
        minimize: Some(rb_minimize),
        maximize: Some(rb_maximize),
        close_model: Some(rb_close_model),
        set_verbosity: Some(rb_set_verbosity),
        set_time_limit: Some(rb_set_time_limit),
        set_thread_count: Some(rb_set_thread_count),
        solve: Some(rb_solve),
        state: Some(rb_state),
        solution_status: Some(rb_solution_status),
        int_value: Some(rb_int_value),
        double_value: Some(rb_double_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leq(b: &mut ReferenceBackend, l: ExprToken, r: ExprToken) -> ExprToken {
        b.relation(Relation::Leq, l, r).unwrap()
    }

    #[test]
    fn fresh_engine_reports_stopped_and_no_solution() {
        let mut b = ReferenceBackend::new();
        assert_eq!(b.state(), EngineState::Stopped);
        assert_eq!(b.solution_status(), SolutionStatus::NoSolution);
        assert!(b.int_value(0).is_err());
    }

    #[test]
    fn empty_domain_is_rejected() {
        let mut b = ReferenceBackend::new();
        assert!(b.int_var(3, 2).is_err());
        assert!(b.int_var(2, 3).is_ok());
    }

    #[test]
    fn maximize_sum_under_cap() {
        let mut b = ReferenceBackend::new();
        let x = b.int_var(0, 10).unwrap();
        let y = b.int_var(0, 10).unwrap();
        let s = b.sum().unwrap();
        b.add_operand(s, x).unwrap();
        b.add_operand(s, y).unwrap();
        let cap = b.constant(15).unwrap();
        let c = leq(&mut b, s, cap);
        b.add_constraint(c).unwrap();
        b.set_objective(ObjectiveSense::Maximize, s).unwrap();
        b.close_model().unwrap();
        b.solve().unwrap();

        assert_eq!(b.solution_status(), SolutionStatus::Optimal);
        assert_eq!(b.int_value(s).unwrap(), 15);
        let xv = b.int_value(x).unwrap();
        let yv = b.int_value(y).unwrap();
        assert!((0..=10).contains(&xv));
        assert!((0..=10).contains(&yv));
        assert_eq!(xv + yv, 15);
    }

    #[test]
    fn minimize_product_with_equality() {
        let mut b = ReferenceBackend::new();
        let x = b.int_var(1, 4).unwrap();
        let y = b.int_var(1, 4).unwrap();
        let p = b.prod().unwrap();
        b.add_operand(p, x).unwrap();
        b.add_operand(p, y).unwrap();
        let six = b.constant(6).unwrap();
        let c = b.relation(Relation::Eq, p, six).unwrap();
        b.add_constraint(c).unwrap();
        let s = b.sum().unwrap();
        b.add_operand(s, x).unwrap();
        b.add_operand(s, y).unwrap();
        b.set_objective(ObjectiveSense::Minimize, s).unwrap();
        b.solve().unwrap();

        assert_eq!(b.solution_status(), SolutionStatus::Optimal);
        // 2 * 3 (either order) minimizes x + y at 5.
        assert_eq!(b.int_value(s).unwrap(), 5);
        assert_eq!(b.int_value(p).unwrap(), 6);
    }

    #[test]
    fn contradictory_constraints_are_infeasible() {
        let mut b = ReferenceBackend::new();
        let x = b.int_var(0, 5).unwrap();
        let three = b.constant(3).unwrap();
        let c1 = b.relation(Relation::Geq, x, three).unwrap();
        let one = b.constant(1).unwrap();
        let c2 = leq(&mut b, x, one);
        b.add_constraint(c1).unwrap();
        b.add_constraint(c2).unwrap();
        b.solve().unwrap();
        assert_eq!(b.solution_status(), SolutionStatus::Infeasible);
        assert!(b.int_value(x).is_err());
    }

    #[test]
    fn operand_order_is_stable_across_runs() {
        let build = || {
            let mut b = ReferenceBackend::new();
            let x = b.int_var(2, 2).unwrap();
            let y = b.int_var(3, 3).unwrap();
            let s = b.sum().unwrap();
            b.add_operand(s, x).unwrap();
            b.add_operand(s, y).unwrap();
            b.set_objective(ObjectiveSense::Minimize, s).unwrap();
            b.solve().unwrap();
            (b.int_value(s).unwrap(), b.double_value(s).unwrap())
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn aggregate_misuse_fails_cleanly() {
        let mut b = ReferenceBackend::new();
        let x = b.int_var(0, 1).unwrap();
        let y = b.int_var(0, 1).unwrap();
        // x is not an aggregate.
        assert!(b.add_operand(x, y).is_err());
        // Unknown token.
        assert!(b.add_operand(99, y).is_err());
        assert!(b.add_operand(-2, y).is_err());
    }

    #[test]
    fn cyclic_aggregates_are_rejected() {
        let mut b = ReferenceBackend::new();
        let s = b.sum().unwrap();
        assert!(b.add_operand(s, s).is_err());

        let inner = b.sum().unwrap();
        let outer = b.prod().unwrap();
        b.add_operand(outer, inner).unwrap();
        assert!(b.add_operand(inner, outer).is_err());

        // The graph stayed acyclic, so evaluation still terminates.
        let x = b.int_var(0, 1).unwrap();
        b.add_operand(inner, x).unwrap();
        b.solve().unwrap();
        assert_eq!(b.solution_status(), SolutionStatus::Optimal);
    }

    #[test]
    fn full_range_bounds_refuse_enumeration() {
        let mut b = ReferenceBackend::new();
        b.int_var(i64::MIN, i64::MAX).unwrap();
        assert!(b.solve().is_err());
        assert_eq!(b.solution_status(), SolutionStatus::NoSolution);
    }

    #[test]
    fn closed_model_refuses_structural_mutation() {
        let mut b = ReferenceBackend::new();
        let x = b.int_var(0, 1).unwrap();
        b.close_model().unwrap();
        assert!(b.int_var(0, 1).is_err());
        assert!(b.sum().is_err());
        assert!(b.add_constraint(x).is_err());
    }

    #[test]
    fn parameter_rejection_paths() {
        let mut b = ReferenceBackend::new();
        assert!(b.set_verbosity(-1).is_err());
        assert!(b.set_time_limit(0).is_err());
        assert!(b.set_thread_count(-4).is_err());
        assert!(b.set_verbosity(2).is_ok());
        assert!(b.set_time_limit(5).is_ok());
        assert!(b.set_thread_count(2).is_ok());
        assert_eq!(b.verbosity(), 2);
        assert_eq!(b.time_limit(), Some(5));
        assert_eq!(b.thread_count(), 2);
    }

    #[test]
    fn oversized_search_space_fails_solve() {
        let mut b = ReferenceBackend::new();
        for _ in 0..8 {
            b.int_var(0, 1000).unwrap();
        }
        assert!(b.solve().is_err());
        assert_eq!(b.solution_status(), SolutionStatus::NoSolution);
    }

    #[test]
    fn model_without_variables_solves_trivially() {
        let mut b = ReferenceBackend::new();
        let two = b.constant(2).unwrap();
        let three = b.constant(3).unwrap();
        let c = leq(&mut b, two, three);
        b.add_constraint(c).unwrap();
        b.solve().unwrap();
        assert_eq!(b.solution_status(), SolutionStatus::Optimal);
        assert_eq!(b.int_value(two).unwrap(), 2);
    }

    #[test]
    fn vtable_is_complete_and_drives_the_backend() {
        let vt = reference_vtable();
        let ud = reference_user_data();
        unsafe {
            let x = (vt.int_var.unwrap())(ud, 0, 3);
            assert!(x >= 0);
            let bad = (vt.int_var.unwrap())(ud, 3, 0);
            assert!(bad < 0);
            let s = (vt.sum.unwrap())(ud);
            assert_eq!((vt.add_operand.unwrap())(ud, s, x), 0);
            assert_eq!((vt.maximize.unwrap())(ud, s), 0);
            assert_eq!((vt.close_model.unwrap())(ud), 0);
            assert_eq!((vt.solve.unwrap())(ud), 0);
            assert_eq!(
                (vt.solution_status.unwrap())(ud),
                optq_solution_status_t::OPTQ_SOLUTION_OPTIMAL as i32
            );
            let mut out = 0_i64;
            assert_eq!((vt.int_value.unwrap())(ud, x, &mut out), 0);
            assert_eq!(out, 3);
            reference_free(ud);
        }
    }
}
