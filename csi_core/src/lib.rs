//! Runtime safety-condition monitoring and situation coverage for simulated
//! cyber-physical scenarios.
//!
//! Observations stream into a [`Trace`] of piecewise-constant signals keyed
//! by hierarchical [`Path`]s. A [`Monitor`] evaluates metric temporal logic
//! [`Formula`]e over the trace under a selectable truth-value
//! [`Connective`], producing Boolean or quantitative verdicts. A
//! [`CombinationsRegistry`] samples the same trace through per-atom
//! quantisation [`Domain`]s and accumulates the joint states encountered,
//! quantifying how much of the situation space a scenario has explored.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod component;
pub mod connective;
pub mod coverage;
pub mod domain;
pub mod formula;
pub mod monitor;
pub mod safety;
pub mod trace;
pub mod value;

pub use component::{Alias, Atom, ComponentError, Context, Path};
pub use connective::{Connective, UnknownConnective};
pub use coverage::{CodecError, Combination, CombinationsRegistry, CoverageError, RegistryBuilder};
pub use domain::{Domain, DomainError};
pub use formula::{
    all_of, any_of, falls, rises, EvalConfig, EvalError, EvalTime, Formula, Interval, Operand,
    Verdict,
};
pub use monitor::Monitor;
pub use safety::{ConditionKind, SafetyCondition};
pub use trace::{Signal, SignalMap, Trace};
pub use value::Value;

/// A time instant: an opaque, monotone, totally ordered real.
///
/// The unit is the caller's choice; the core only relies on ordering and
/// arithmetic.
pub type Time = ordered_float::OrderedFloat<f64>;
