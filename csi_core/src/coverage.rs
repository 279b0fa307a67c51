//! Situation coverage over quantised observations.
//!
//! A [`CombinationsRegistry`] accumulates the joint bucketed states of a set
//! of atoms as a trace unfolds. The participating atoms, their quantisation
//! domains and their fallback defaults are fixed by a [`RegistryBuilder`];
//! only the observed combinations grow afterwards.

mod codec;

pub use codec::CodecError;

use crate::component::{Atom, Path};
use crate::domain::{Domain, DomainError};
use crate::trace::Trace;
use crate::value::Value;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A joint bucketed state: one bucket per participating atom, `None` marking
/// an out-of-domain observation.
pub type Combination = BTreeMap<Path, Option<Value>>;

/// Errors raised by registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoverageError {
    /// Merged registries must quantise the same atoms the same way.
    #[error("cannot merge registries over different domains")]
    DomainMismatch,
}

/// Builder fixing the participating atoms, domains and defaults of a
/// [`CombinationsRegistry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    domain: BTreeMap<Path, Domain>,
    default: BTreeMap<Path, Value>,
}

impl RegistryBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    /// Adds an atom under its declared domain, or the identity domain if it
    /// declares none.
    pub fn add_atom(&mut self, atom: &Atom) -> &mut Self {
        let domain = atom.domain().cloned().unwrap_or(Domain::Identity);
        self.add_component(atom.path().clone(), domain)
    }

    /// Adds a path under an explicit quantisation domain.
    pub fn add_component(&mut self, path: Path, domain: Domain) -> &mut Self {
        self.domain.insert(path, domain);
        self
    }

    /// Declares the fallback value used when a path has no observation yet.
    pub fn set_default(&mut self, path: Path, value: impl Into<Value>) -> &mut Self {
        self.default.insert(path, value.into());
        self
    }

    /// Builds the registry; domains and defaults are fixed from here on.
    pub fn build(self) -> CombinationsRegistry {
        CombinationsRegistry {
            domain: self.domain,
            default: self.default,
            combinations: BTreeSet::new(),
            transitions: BTreeSet::new(),
        }
    }
}

/// Observed combinations of quantised atom values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationsRegistry {
    domain: BTreeMap<Path, Domain>,
    default: BTreeMap<Path, Value>,
    combinations: BTreeSet<Combination>,
    transitions: BTreeSet<(Combination, Combination)>,
}

impl CombinationsRegistry {
    /// The participating paths and their quantisation domains.
    pub fn domain(&self) -> &BTreeMap<Path, Domain> {
        &self.domain
    }

    /// The declared fallback values.
    pub fn defaults(&self) -> &BTreeMap<Path, Value> {
        &self.default
    }

    /// The observed combinations.
    pub fn combinations(&self) -> &BTreeSet<Combination> {
        &self.combinations
    }

    /// The observed transitions between consecutive distinct combinations.
    pub fn transitions(&self) -> &BTreeSet<(Combination, Combination)> {
        &self.transitions
    }

    /// Samples the trace at the merged breakpoints of the participating
    /// atoms and accumulates the quantised joint states.
    ///
    /// A path with no defined value at a breakpoint falls back to its
    /// declared default, or to the out-of-domain bucket without one.
    /// Consecutive duplicate states are collapsed.
    pub fn register(&mut self, trace: &Trace) {
        let paths: Vec<Path> = self.domain.keys().cloned().collect();
        let mut last: Option<Combination> = None;
        let mut inserted = 0usize;
        for (_, values) in trace.iter_merged(&paths) {
            let combination: Combination = paths
                .iter()
                .zip(&values)
                .map(|(path, value)| {
                    let domain = &self.domain[path];
                    let bucket = match value {
                        Some(value) => domain.value_of(value),
                        None => self
                            .default
                            .get(path)
                            .and_then(|fallback| domain.value_of(fallback)),
                    };
                    (path.clone(), bucket)
                })
                .collect();
            if last.as_ref() == Some(&combination) {
                continue;
            }
            if let Some(previous) = last.replace(combination.clone()) {
                self.transitions.insert((previous, combination.clone()));
            }
            if self.combinations.insert(combination) {
                inserted += 1;
            }
        }
        debug!(
            "registered trace: {inserted} new combinations, {} total",
            self.combinations.len()
        );
    }

    /// Directly adds a valuation as an observed combination.
    ///
    /// Values are taken as given, without quantisation; participating atoms
    /// absent from the valuation are recorded as out-of-domain.
    pub fn record(&mut self, valuation: &BTreeMap<Path, Value>) {
        let combination: Combination = self
            .domain
            .keys()
            .map(|path| (path.clone(), valuation.get(path).cloned()))
            .collect();
        self.combinations.insert(combination);
    }

    /// A registry restricted to the given paths.
    pub fn project(&self, keys: &BTreeSet<Path>) -> Self {
        CombinationsRegistry {
            domain: self
                .domain
                .iter()
                .filter(|(path, _)| keys.contains(*path))
                .map(|(path, domain)| (path.clone(), domain.clone()))
                .collect(),
            default: self
                .default
                .iter()
                .filter(|(path, _)| keys.contains(*path))
                .map(|(path, value)| (path.clone(), value.clone()))
                .collect(),
            combinations: self
                .combinations
                .iter()
                .map(|combination| {
                    combination
                        .iter()
                        .filter(|(path, _)| keys.contains(*path))
                        .map(|(path, bucket)| (path.clone(), bucket.clone()))
                        .collect()
                })
                .collect(),
            transitions: BTreeSet::new(),
        }
    }

    /// A registry with the same atoms re-bucketed through overriding domains.
    ///
    /// Observed buckets are mapped through the overriding domain of their
    /// path; paths without an override keep their buckets.
    pub fn restrict(&self, overrides: &BTreeMap<Path, Domain>) -> Self {
        let domain: BTreeMap<Path, Domain> = self
            .domain
            .iter()
            .map(|(path, domain)| {
                let domain = overrides.get(path).unwrap_or(domain).clone();
                (path.clone(), domain)
            })
            .collect();
        let combinations = self
            .combinations
            .iter()
            .map(|combination| {
                combination
                    .iter()
                    .map(|(path, bucket)| {
                        let bucket = match overrides.get(path) {
                            Some(domain) => bucket
                                .as_ref()
                                .and_then(|value| domain.value_of(value)),
                            None => bucket.clone(),
                        };
                        (path.clone(), bucket)
                    })
                    .collect()
            })
            .collect();
        CombinationsRegistry {
            domain,
            default: self.default.clone(),
            combinations,
            transitions: BTreeSet::new(),
        }
    }

    /// Unions the observations of a registry over the same domains.
    ///
    /// Defaults are kept from `self`; gaps are filled from `other`.
    pub fn merge(&mut self, other: &Self) -> Result<(), CoverageError> {
        if self.domain != other.domain {
            return Err(CoverageError::DomainMismatch);
        }
        self.combinations
            .extend(other.combinations.iter().cloned());
        self.transitions.extend(other.transitions.iter().cloned());
        for (path, value) in &other.default {
            self.default
                .entry(path.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(())
    }

    /// The number of fully in-domain combinations observed.
    pub fn covered(&self) -> usize {
        self.combinations
            .iter()
            .filter(|combination| combination.values().all(Option::is_some))
            .count()
    }

    /// The number of combinations the domains admit.
    ///
    /// The empty product is 1. Fails if any participating domain is
    /// unbounded.
    pub fn total(&self) -> Result<usize, DomainError> {
        self.domain
            .values()
            .try_fold(1usize, |acc, domain| Ok(acc * domain.len()?))
    }

    /// The fraction of admissible combinations observed, in `[0, 1]`.
    pub fn coverage(&self) -> Result<f64, DomainError> {
        let total = self.total()?;
        if total == 0 {
            return Ok(0.0);
        }
        Ok(self.covered() as f64 / total as f64)
    }

    /// The admissible combinations not observed yet, in canonical order.
    pub fn missing_combinations(&self) -> Result<Vec<Combination>, DomainError> {
        let paths: Vec<&Path> = self.domain.keys().collect();
        let buckets: Vec<Vec<Value>> = self
            .domain
            .values()
            .map(Domain::buckets)
            .collect::<Result<_, _>>()?;
        let mut missing = Vec::new();
        let mut indices = vec![0usize; paths.len()];
        if buckets.iter().any(Vec::is_empty) {
            return Ok(missing);
        }
        loop {
            let candidate: Combination = paths
                .iter()
                .enumerate()
                .map(|(d, path)| ((*path).clone(), Some(buckets[d][indices[d]].clone())))
                .collect();
            if !self.combinations.contains(&candidate) {
                missing.push(candidate);
            }
            // Odometer increment over the bucket indices.
            let mut dimension = paths.len();
            loop {
                if dimension == 0 {
                    return Ok(missing);
                }
                dimension -= 1;
                indices[dimension] += 1;
                if indices[dimension] < buckets[dimension].len() {
                    break;
                }
                indices[dimension] = 0;
            }
        }
    }
}
