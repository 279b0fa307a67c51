//! Quantitative evaluation of formulae over projected signals.
//!
//! Formulae are evaluated bottom-up into piecewise-constant truth signals on
//! the merged breakpoint grid of their participating atoms. Times between
//! breakpoints read the last known value (carry-forward); times before the
//! first breakpoint read the connective's bottom.

use super::{Formula, Interval, Operand};
use crate::component::Path;
use crate::connective::Connective;
use crate::trace::SignalMap;
use crate::value::Value;
use crate::Time;
use log::trace;
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;
use thiserror::Error;

/// The instant a formula is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalTime {
    /// Evaluate at a single instant.
    At(f64),
    /// Produce the full verdict signal over the merged breakpoint grid.
    Full,
}

impl Default for EvalTime {
    fn default() -> Self {
        EvalTime::At(0.0)
    }
}

/// Knobs of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalConfig {
    /// Discretisation step used by `Next` and `Shift`; strictly positive.
    pub dt: f64,
    /// Instant or full-signal selector.
    pub time: EvalTime,
    /// Truth-value algebra.
    pub connective: Connective,
    /// Absolute tolerance of equality comparisons.
    pub tolerance: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            dt: 1.0,
            time: EvalTime::default(),
            connective: Connective::default(),
            tolerance: 1e-9,
        }
    }
}

impl EvalConfig {
    /// A configuration evaluating at `time` with all other knobs defaulted.
    pub fn at(time: f64) -> Self {
        EvalConfig {
            time: EvalTime::At(time),
            ..EvalConfig::default()
        }
    }

    /// A configuration producing full verdict signals.
    pub fn full_signal() -> Self {
        EvalConfig {
            time: EvalTime::Full,
            ..EvalConfig::default()
        }
    }

    /// Replaces the connective.
    pub fn with_connective(mut self, connective: Connective) -> Self {
        self.connective = connective;
        self
    }

    /// Replaces the discretisation step.
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }
}

/// Errors turning an evaluation undecidable or ill-posed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// A participating atom has no signal in the projected trace.
    #[error("atom {0} has no signal in the projected trace")]
    MissingAtom(Path),
    /// The discretisation step is not strictly positive.
    #[error("discretisation step must be strictly positive, got {0}")]
    NonPositiveStep(f64),
}

/// The outcome of an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// A quantitative truth value at one instant.
    Truth(f64),
    /// A thresholded truth value at one instant.
    Bool(bool),
    /// A quantitative verdict signal over the breakpoint grid.
    TruthSignal(Vec<(Time, f64)>),
    /// A thresholded verdict signal over the breakpoint grid.
    BoolSignal(Vec<(Time, bool)>),
}

impl Verdict {
    /// The quantitative reading at one instant, if this is a point verdict.
    pub fn as_truth(&self) -> Option<f64> {
        match self {
            Verdict::Truth(v) => Some(*v),
            _ => None,
        }
    }

    /// The Boolean reading at one instant, if this is a point verdict.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Verdict::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Thresholds quantitative verdicts by the connective's top element.
    pub fn threshold(self, connective: Connective) -> Verdict {
        match self {
            Verdict::Truth(v) => Verdict::Bool(connective.is_true(v)),
            Verdict::TruthSignal(signal) => Verdict::BoolSignal(
                signal
                    .into_iter()
                    .map(|(t, v)| (t, connective.is_true(v)))
                    .collect(),
            ),
            thresholded => thresholded,
        }
    }
}

impl Formula {
    /// Evaluates the formula over the projected `signals`.
    ///
    /// The verdict is quantitative; Boolean thresholding is a separate step
    /// ([`Verdict::threshold`]). Fails if the step is not strictly positive
    /// or any participating atom is missing from `signals`.
    pub fn eval(&self, signals: &SignalMap, config: &EvalConfig) -> Result<Verdict, EvalError> {
        if config.dt <= 0.0 {
            return Err(EvalError::NonPositiveStep(config.dt));
        }
        let atoms = self.atoms();
        for atom in &atoms {
            if !signals.contains_key(atom.path()) {
                return Err(EvalError::MissingAtom(atom.path().clone()));
            }
        }
        // Merged breakpoints of the participating atoms; a sentinel
        // breakpoint at 0 keeps atom-free formulae evaluable.
        let mut grid: BTreeSet<Time> = atoms
            .iter()
            .flat_map(|atom| signals[atom.path()].iter().map(|(t, _)| *t))
            .collect();
        if grid.is_empty() {
            grid.insert(OrderedFloat(0.0));
        }
        let grid: Vec<Time> = grid.into_iter().collect();
        let evaluator = Evaluator {
            signals,
            grid: &grid,
            config,
        };
        let truth = evaluator.truth_signal(self);
        trace!("evaluated formula over {} breakpoints", grid.len());
        match config.time {
            EvalTime::Full => Ok(Verdict::TruthSignal(
                grid.iter().copied().zip(truth).collect(),
            )),
            EvalTime::At(t) => Ok(Verdict::Truth(evaluator.sample(&truth, OrderedFloat(t)))),
        }
    }
}

struct Evaluator<'a> {
    signals: &'a SignalMap,
    grid: &'a [Time],
    config: &'a EvalConfig,
}

impl Evaluator<'_> {
    fn connective(&self) -> Connective {
        self.config.connective
    }

    fn bottom(&self) -> f64 {
        self.connective().const_false()
    }

    fn top(&self) -> f64 {
        self.connective().const_true()
    }

    /// Index of the greatest grid point at or before `t`.
    fn index_at(&self, t: Time) -> Option<usize> {
        match self.grid.partition_point(|point| *point <= t) {
            0 => None,
            n => Some(n - 1),
        }
    }

    /// Carry-forward sample of a grid-aligned truth signal.
    fn sample(&self, values: &[f64], t: Time) -> f64 {
        self.index_at(t).map_or(self.bottom(), |i| values[i])
    }

    /// Infimum of a grid-aligned truth signal over `[a, b]`.
    fn inf_over(&self, values: &[f64], a: Time, b: Time) -> f64 {
        let mut acc = self.sample(values, a);
        for j in self.grid.partition_point(|point| *point <= a)..self.grid.len() {
            if self.grid[j] > b {
                break;
            }
            acc = self.connective().conj(acc, values[j]);
        }
        acc
    }

    /// Supremum of a grid-aligned truth signal over `[a, b]`.
    fn sup_over(&self, values: &[f64], a: Time, b: Time) -> f64 {
        let mut acc = self.sample(values, a);
        for j in self.grid.partition_point(|point| *point <= a)..self.grid.len() {
            if self.grid[j] > b {
                break;
            }
            acc = self.connective().disj(acc, values[j]);
        }
        acc
    }

    /// The window `[τ + lo, τ + hi]`, or `None` when empty or ill-posed.
    fn window(&self, tau: Time, interval: &Interval) -> Option<(Time, Time)> {
        if interval.is_empty() {
            return None;
        }
        let a = tau + interval.lo;
        let b = tau + interval.hi;
        a.is_finite().then_some((a, b))
    }

    /// Raw operand value at `t`, `None` before the signal is defined.
    fn operand_value(&self, operand: &Operand, t: Time) -> Option<Value> {
        match operand {
            Operand::Const(value) => Some(value.clone()),
            Operand::Atom(atom) => {
                let signal = &self.signals[atom.path()];
                match signal.partition_point(|(bp, _)| *bp <= t) {
                    0 => None,
                    n => Some(signal[n - 1].1.clone()),
                }
            }
        }
    }

    fn compare_lt(&self, x: &Operand, y: &Operand, t: Time) -> f64 {
        match (self.operand_value(x, t), self.operand_value(y, t)) {
            (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => self.connective().truth(x < y),
                _ => self.bottom(),
            },
            _ => self.bottom(),
        }
    }

    fn compare_eq(&self, x: &Operand, y: &Operand, t: Time) -> f64 {
        match (self.operand_value(x, t), self.operand_value(y, t)) {
            (Some(x), Some(y)) => {
                let equal = match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => (x - y).abs() <= self.config.tolerance,
                    _ => x == y,
                };
                self.connective().truth(equal)
            }
            _ => self.bottom(),
        }
    }

    /// Truth value of an atom's raw signal value.
    fn value_truth(&self, value: &Value) -> f64 {
        match value {
            Value::Bool(b) => self.connective().truth(*b),
            Value::Int(i) => *i as f64,
            Value::Float(f) => f.into_inner(),
            Value::Symbol(_) => self.bottom(),
        }
    }

    fn until_at(&self, lhs: &[f64], rhs: &[f64], i: usize, interval: &Interval) -> f64 {
        let conn = self.connective();
        let tau = self.grid[i];
        let Some((a, b)) = self.window(tau, interval) else {
            return self.bottom();
        };
        // Running infimum of the left operand over [τ, t].
        let mut lhs_inf = self.inf_over(lhs, tau, a);
        let mut best = conn.conj(self.sample(rhs, a), lhs_inf);
        for j in self.grid.partition_point(|point| *point <= a)..self.grid.len() {
            if self.grid[j] > b {
                break;
            }
            lhs_inf = conn.conj(lhs_inf, lhs[j]);
            best = conn.disj(best, conn.conj(rhs[j], lhs_inf));
        }
        best
    }

    /// Evaluates `formula` into a truth signal aligned with the grid.
    fn truth_signal(&self, formula: &Formula) -> Vec<f64> {
        let conn = self.connective();
        let n = self.grid.len();
        match formula {
            Formula::True => vec![self.top(); n],
            Formula::False => vec![self.bottom(); n],
            Formula::Atomic(atom) => {
                let signal = &self.signals[atom.path()];
                self.grid
                    .iter()
                    .map(|t| match signal.partition_point(|(bp, _)| bp <= t) {
                        0 => self.bottom(),
                        k => self.value_truth(&signal[k - 1].1),
                    })
                    .collect()
            }
            Formula::Not(sub) => self
                .truth_signal(sub)
                .into_iter()
                .map(|v| conn.neg(v))
                .collect(),
            Formula::And(subs) => subs
                .iter()
                .map(|sub| self.truth_signal(sub))
                .fold(vec![self.top(); n], |acc, vals| {
                    acc.into_iter()
                        .zip(vals)
                        .map(|(a, b)| conn.conj(a, b))
                        .collect()
                }),
            Formula::Or(subs) => subs
                .iter()
                .map(|sub| self.truth_signal(sub))
                .fold(vec![self.bottom(); n], |acc, vals| {
                    acc.into_iter()
                        .zip(vals)
                        .map(|(a, b)| conn.disj(a, b))
                        .collect()
                }),
            Formula::Implies(subs) => {
                let lhs = self.truth_signal(&subs.0);
                let rhs = self.truth_signal(&subs.1);
                lhs.into_iter()
                    .zip(rhs)
                    .map(|(a, b)| conn.implies(a, b))
                    .collect()
            }
            Formula::Next(sub) => self.shifted(sub, 1),
            Formula::Shift(sub, k) => self.shifted(sub, *k),
            Formula::Always(sub, interval) => {
                let vals = self.truth_signal(sub);
                (0..n)
                    .map(|i| match self.window(self.grid[i], interval) {
                        Some((a, b)) => self.inf_over(&vals, a, b),
                        None => self.top(),
                    })
                    .collect()
            }
            Formula::Eventually(sub, interval) => {
                let vals = self.truth_signal(sub);
                (0..n)
                    .map(|i| match self.window(self.grid[i], interval) {
                        Some((a, b)) => self.sup_over(&vals, a, b),
                        None => self.bottom(),
                    })
                    .collect()
            }
            Formula::Until(subs, interval) => {
                let lhs = self.truth_signal(&subs.0);
                let rhs = self.truth_signal(&subs.1);
                (0..n)
                    .map(|i| self.until_at(&lhs, &rhs, i, interval))
                    .collect()
            }
            Formula::WeakUntil(subs) => {
                let lhs = self.truth_signal(&subs.0);
                let rhs = self.truth_signal(&subs.1);
                let full = Interval::full();
                (0..n)
                    .map(|i| {
                        let until = self.until_at(&lhs, &rhs, i, &full);
                        let (a, b) = (self.grid[i], OrderedFloat(f64::INFINITY));
                        conn.disj(until, self.inf_over(&lhs, a, b))
                    })
                    .collect()
            }
            Formula::Lt(x, y) => self
                .grid
                .iter()
                .map(|t| self.compare_lt(x, y, *t))
                .collect(),
            Formula::Eq(x, y) => self
                .grid
                .iter()
                .map(|t| self.compare_eq(x, y, *t))
                .collect(),
        }
    }

    fn shifted(&self, sub: &Formula, k: i64) -> Vec<f64> {
        let vals = self.truth_signal(sub);
        self.grid
            .iter()
            .map(|t| self.sample(&vals, *t + OrderedFloat(k as f64 * self.config.dt)))
            .collect()
    }
}
