//! Bulk evaluation of safety conditions over traces.
//!
//! A [`Monitor`] is an immutable set of formulae evaluated together. Each
//! formula yields a verdict, or `None` when the trace does not define all of
//! its atoms. Formula evaluations are independent pure functions over the
//! shared trace and are fanned out in parallel.

use crate::component::Atom;
use crate::formula::{EvalConfig, Formula, Verdict};
use crate::trace::Trace;
use hashbrown::HashSet;
use log::{debug, info};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::BitOr;

/// An ensemble of temporal logic conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Monitor {
    conditions: BTreeSet<Formula>,
}

impl Monitor {
    /// An empty monitor.
    pub fn new() -> Self {
        Monitor::default()
    }

    /// A monitor over the given conditions.
    pub fn from_conditions<I>(conditions: I) -> Self
    where
        I: IntoIterator<Item = Formula>,
    {
        Monitor {
            conditions: conditions.into_iter().collect(),
        }
    }

    /// A new monitor with `condition` added.
    pub fn add(&self, condition: Formula) -> Monitor {
        let mut conditions = self.conditions.clone();
        conditions.insert(condition);
        Monitor { conditions }
    }

    /// A new monitor holding the conditions of both monitors.
    pub fn union(&self, other: &Monitor) -> Monitor {
        let mut conditions = self.conditions.clone();
        conditions.extend(other.conditions.iter().cloned());
        Monitor { conditions }
    }

    /// Iterates the monitored conditions in canonical order.
    pub fn conditions(&self) -> impl Iterator<Item = &Formula> {
        self.conditions.iter()
    }

    /// The number of monitored conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the monitor has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The atoms used across all monitored conditions.
    pub fn atoms(&self) -> BTreeSet<Atom> {
        self.conditions
            .iter()
            .flat_map(|condition| condition.atoms())
            .collect()
    }

    /// The Boolean predicates used across all monitored conditions: atomic
    /// predicates plus binary comparisons.
    ///
    /// Within each condition, an equality whose operand pair also occurs
    /// under a strictly-less comparison is dropped, so a decomposed `<=`
    /// counts once. Atoms appearing as operands of a retained comparison are
    /// not reported separately.
    pub fn extract_boolean_predicates(&self) -> BTreeSet<Formula> {
        boolean_predicates(self.conditions.iter())
    }

    /// Evaluates every monitored condition on `trace`.
    ///
    /// Quantitative verdicts are thresholded into Booleans unless
    /// `quantitative` is set. Conditions whose atoms are not all defined in
    /// the trace map to `None`.
    pub fn evaluate(
        &self,
        trace: &Trace,
        config: &EvalConfig,
        quantitative: bool,
    ) -> BTreeMap<Formula, Option<Verdict>> {
        let conditions: Vec<&Formula> = self.conditions.iter().collect();
        let results: BTreeMap<Formula, Option<Verdict>> = conditions
            .par_iter()
            .map(|condition| {
                let verdict = Monitor::evaluate_condition(trace, condition, config, quantitative);
                ((*condition).clone(), verdict)
            })
            .collect();
        info!(
            "evaluated {} conditions, {} undecidable",
            results.len(),
            results.values().filter(|v| v.is_none()).count()
        );
        results
    }

    /// Evaluates a single condition on `trace`, `None` when undecidable.
    pub fn evaluate_condition(
        trace: &Trace,
        condition: &Formula,
        config: &EvalConfig,
        quantitative: bool,
    ) -> Option<Verdict> {
        let atoms = condition.atoms();
        let signals = trace.project(atoms.iter(), config.connective);
        if let Some(missing) = atoms.iter().find(|atom| !signals.contains_key(atom.path())) {
            debug!("condition undecidable, atom {missing} has no signal");
            return None;
        }
        match condition.eval(&signals, config) {
            Ok(verdict) if quantitative => Some(verdict),
            Ok(verdict) => Some(verdict.threshold(config.connective)),
            Err(error) => {
                debug!("condition undecidable: {error}");
                None
            }
        }
    }
}

impl BitOr for &Monitor {
    type Output = Monitor;

    fn bitor(self, rhs: &Monitor) -> Monitor {
        self.union(rhs)
    }
}

impl BitOr for Monitor {
    type Output = Monitor;

    fn bitor(self, rhs: Monitor) -> Monitor {
        self.union(&rhs)
    }
}

/// The Boolean predicates used across the given conditions; see
/// [`Monitor::extract_boolean_predicates`].
pub fn boolean_predicates<'a, I>(conditions: I) -> BTreeSet<Formula>
where
    I: IntoIterator<Item = &'a Formula>,
{
    let mut terms: BTreeSet<Atom> = BTreeSet::new();
    let mut comparisons: BTreeSet<Formula> = BTreeSet::new();
    for condition in conditions {
        let mut local: HashSet<Formula> = HashSet::new();
        for node in condition.walk() {
            match node {
                Formula::Atomic(atom) => {
                    terms.insert(atom.clone());
                }
                Formula::Lt(_, _) | Formula::Eq(_, _) => {
                    local.insert(node.clone());
                }
                _ => {}
            }
        }
        // Drop the equality half of a decomposed <= on the same operands.
        let redundant: Vec<Formula> = local
            .iter()
            .filter(|node| {
                if let Formula::Eq(x, y) = node {
                    local.contains(&Formula::Lt(x.clone(), y.clone()))
                } else {
                    false
                }
            })
            .cloned()
            .collect();
        for node in redundant {
            local.remove(&node);
        }
        comparisons.extend(local);
    }
    for comparison in &comparisons {
        if let Formula::Lt(x, y) | Formula::Eq(x, y) = comparison {
            if let Some(atom) = x.atom() {
                terms.remove(atom);
            }
            if let Some(atom) = y.atom() {
                terms.remove(atom);
            }
        }
    }
    terms
        .into_iter()
        .map(Formula::Atomic)
        .chain(comparisons)
        .collect()
}
