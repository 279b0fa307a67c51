//! Value-quantisation policies for coverage.
//!
//! A [`Domain`] captures the range of values expected for an observable and
//! maps raw observations onto a finite set of canonical bucket
//! representatives. Out-of-domain observations map to nothing and are
//! recorded as uncovered.

use crate::value::Value;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by domain constructors and finite-size queries.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    /// The identity domain admits every value and has no finite length.
    #[error("identity domains have no finite length")]
    Unbounded,
    /// A partitioned domain was given a non-positive step.
    #[error("quantisation step must be strictly positive, got {0}")]
    NonPositiveStep(f64),
    /// A linearly-spaced domain was given zero buckets.
    #[error("bucket count must be strictly positive")]
    NonPositiveCount,
    /// A partitioned domain was given a reversed interval.
    #[error("reversed interval [{lo}, {hi})")]
    ReversedInterval {
        /// Lower bound of the offending interval.
        lo: f64,
        /// Upper bound of the offending interval.
        hi: f64,
    },
}

/// A quantisation policy mapping raw values to canonical buckets.
///
/// `Range` and `Space` partition the half-open interval `[lo, hi)`; a value
/// maps to the lower end of its bucket. Saturating `Range` bounds extend the
/// bucketing outside the interval to the nearest extreme. `Filter` delegates
/// to an inner domain and maps values accepted by a guard domain, but not
/// quantised by the inner one, to a fallback bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Every value is its own bucket; unbounded.
    Identity,
    /// An explicit finite set of admissible values.
    Set(BTreeSet<Value>),
    /// `[lo, hi)` partitioned into buckets of width `step`.
    Range {
        /// Lower bound of the partitioned interval.
        lo: OrderedFloat<f64>,
        /// Upper bound of the partitioned interval (excluded).
        hi: OrderedFloat<f64>,
        /// Bucket width.
        step: OrderedFloat<f64>,
        /// Map values below `lo` to the first bucket.
        lower: bool,
        /// Map values at or above `hi` to a dedicated `hi` bucket.
        upper: bool,
    },
    /// `[lo, hi)` partitioned into `count` equal-width buckets.
    Space {
        /// Lower bound of the partitioned interval.
        lo: OrderedFloat<f64>,
        /// Upper bound of the partitioned interval (excluded).
        hi: OrderedFloat<f64>,
        /// Number of buckets.
        count: u32,
    },
    /// An inner domain extended with a fallback bucket for guarded values.
    Filter {
        /// The primary quantisation.
        inner: Box<Domain>,
        /// Membership in this domain decides whether unquantised values fall
        /// back instead of going out of domain.
        accept: Box<Domain>,
        /// Bucket representative for accepted, unquantised values.
        fallback: Value,
    },
}

impl Domain {
    /// The identity domain containing all values.
    pub fn identity() -> Self {
        Domain::Identity
    }

    /// A domain given by the exact set of admissible values.
    pub fn values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Domain::Set(values.into_iter().map(Into::into).collect())
    }

    /// A domain partitioned into buckets of width `step` over `[lo, hi)`.
    pub fn range(lo: f64, hi: f64, step: f64) -> Result<Self, DomainError> {
        Domain::threshold_range(lo, hi, step, false, false)
    }

    /// A range domain with optional saturation outside `[lo, hi)`.
    ///
    /// With `upper`, values at or above `hi` map to a dedicated `hi` bucket;
    /// with `lower`, values below `lo` map to the first bucket.
    pub fn threshold_range(
        lo: f64,
        hi: f64,
        step: f64,
        upper: bool,
        lower: bool,
    ) -> Result<Self, DomainError> {
        if step <= 0.0 {
            return Err(DomainError::NonPositiveStep(step));
        }
        if lo > hi {
            return Err(DomainError::ReversedInterval { lo, hi });
        }
        Ok(Domain::Range {
            lo: OrderedFloat(lo),
            hi: OrderedFloat(hi),
            step: OrderedFloat(step),
            lower,
            upper,
        })
    }

    /// A domain partitioned into `count` equal-width buckets over `[lo, hi)`.
    pub fn linspace(lo: f64, hi: f64, count: u32) -> Result<Self, DomainError> {
        if count == 0 {
            return Err(DomainError::NonPositiveCount);
        }
        if lo > hi {
            return Err(DomainError::ReversedInterval { lo, hi });
        }
        Ok(Domain::Space {
            lo: OrderedFloat(lo),
            hi: OrderedFloat(hi),
            count,
        })
    }

    /// An inner domain extended with a `fallback` bucket for values accepted
    /// by the `accept` guard.
    pub fn filtered(inner: Domain, accept: Domain, fallback: impl Into<Value>) -> Self {
        Domain::Filter {
            inner: Box::new(inner),
            accept: Box::new(accept),
            fallback: fallback.into(),
        }
    }

    /// Maps a raw value to its canonical bucket representative.
    ///
    /// Returns `None` for out-of-domain values, including non-numeric values
    /// offered to a partitioned domain.
    pub fn value_of(&self, value: &Value) -> Option<Value> {
        match self {
            Domain::Identity => Some(value.clone()),
            Domain::Set(contents) => contents.contains(value).then(|| value.clone()),
            Domain::Range {
                lo,
                hi,
                step,
                lower,
                upper,
            } => {
                let v = value.as_f64()?;
                let (lo, hi, step) = (lo.into_inner(), hi.into_inner(), step.into_inner());
                if *lower && v < lo {
                    Some(Value::from(lo))
                } else if *upper && v >= hi {
                    Some(Value::from(hi))
                } else if lo <= v && v < hi {
                    Some(Value::from(lo + ((v - lo) / step).floor() * step))
                } else {
                    None
                }
            }
            Domain::Space { lo, hi, count } => {
                let v = value.as_f64()?;
                let (lo, hi) = (lo.into_inner(), hi.into_inner());
                if lo <= v && v < hi {
                    let width = (hi - lo) / f64::from(*count);
                    Some(Value::from(lo + ((v - lo) / width).floor() * width))
                } else {
                    None
                }
            }
            Domain::Filter {
                inner,
                accept,
                fallback,
            } => inner
                .value_of(value)
                .or_else(|| accept.value_of(value).is_some().then(|| fallback.clone())),
        }
    }

    /// Whether the value has a bucket in the domain.
    pub fn contains(&self, value: &Value) -> bool {
        self.value_of(value).is_some()
    }

    /// The number of buckets of a finite domain.
    pub fn len(&self) -> Result<usize, DomainError> {
        match self {
            Domain::Identity => Err(DomainError::Unbounded),
            Domain::Set(contents) => Ok(contents.len()),
            Domain::Range {
                lo,
                hi,
                step,
                upper,
                ..
            } => {
                let buckets = ((hi.into_inner() - lo.into_inner()) / step.into_inner()).ceil();
                Ok(buckets as usize + usize::from(*upper))
            }
            Domain::Space { count, .. } => Ok(*count as usize),
            Domain::Filter { inner, .. } => Ok(inner.len()? + 1),
        }
    }

    /// Whether the domain has no buckets.
    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }

    /// The canonical bucket representatives of a finite domain, in order.
    pub fn buckets(&self) -> Result<Vec<Value>, DomainError> {
        match self {
            Domain::Identity => Err(DomainError::Unbounded),
            Domain::Set(contents) => Ok(contents.iter().cloned().collect()),
            Domain::Range {
                lo,
                hi,
                step,
                upper,
                ..
            } => {
                let (lo, hi, step) = (lo.into_inner(), hi.into_inner(), step.into_inner());
                let mut reps = Vec::new();
                let mut k = 0;
                loop {
                    let rep = lo + f64::from(k) * step;
                    if rep >= hi {
                        break;
                    }
                    reps.push(Value::from(rep));
                    k += 1;
                }
                if *upper {
                    reps.push(Value::from(hi));
                }
                Ok(reps)
            }
            Domain::Space { lo, hi, count } => {
                let (lo, hi) = (lo.into_inner(), hi.into_inner());
                let width = (hi - lo) / f64::from(*count);
                Ok((0..*count)
                    .map(|k| Value::from(lo + f64::from(k) * width))
                    .collect())
            }
            Domain::Filter {
                inner, fallback, ..
            } => {
                let mut reps = inner.buckets()?;
                reps.push(fallback.clone());
                Ok(reps)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_length_and_membership() {
        let d = Domain::range(0.0, 10.0, 1.0).unwrap();
        assert_eq!(d.len().unwrap(), 10);
        assert!(d.contains(&Value::from(0.0)));
        assert!(!d.contains(&Value::from(10.0)));
        assert!(!d.contains(&Value::from(-1.0)));
        assert!(d.contains(&Value::from(5.5)));

        let d = Domain::range(0.0, 100.0, 75.0).unwrap();
        assert!(d.contains(&Value::from(80.0)));
        assert!(d.contains(&Value::from(0.0)));
        assert!(d.contains(&Value::from(99.0)));
    }

    #[test]
    fn range_bucket_values() {
        let d = Domain::range(0.0, 10.0, 1.0).unwrap();
        assert_eq!(d.value_of(&Value::from(5.0)), Some(Value::from(5.0)));
        assert_eq!(d.value_of(&Value::from(11.0)), None);
        assert_eq!(d.value_of(&Value::from(5.5)), Some(Value::from(5.0)));
        assert_eq!(d.value_of(&Value::Int(5)), Some(Value::from(5.0)));

        let d = Domain::range(0.0, 100.0, 75.0).unwrap();
        assert_eq!(d.value_of(&Value::from(80.0)), Some(Value::from(75.0)));
        assert_eq!(d.value_of(&Value::from(25.0)), Some(Value::from(0.0)));
    }

    #[test]
    fn empty_range_accepts_nothing() {
        let d = Domain::range(0.0, 0.0, 1.0).unwrap();
        assert_eq!(d.len().unwrap(), 0);
        assert_eq!(d.value_of(&Value::from(0.0)), None);
        let d = Domain::range(2.0, 2.0, 1.0).unwrap();
        assert_eq!(d.len().unwrap(), 0);
    }

    #[test]
    fn reversed_intervals_rejected() {
        assert_eq!(
            Domain::range(1.0, -1.0, 1.0).unwrap_err(),
            DomainError::ReversedInterval { lo: 1.0, hi: -1.0 }
        );
        assert_eq!(
            Domain::range(0.0, 1.0, 0.0).unwrap_err(),
            DomainError::NonPositiveStep(0.0)
        );
        assert_eq!(
            Domain::linspace(0.0, 1.0, 0).unwrap_err(),
            DomainError::NonPositiveCount
        );
    }

    #[test]
    fn saturating_range_extends_extremes() {
        let d = Domain::threshold_range(0.0, 10.0, 2.0, true, true).unwrap();
        assert_eq!(d.len().unwrap(), 6);
        assert_eq!(d.value_of(&Value::from(-3.0)), Some(Value::from(0.0)));
        assert_eq!(d.value_of(&Value::from(10.0)), Some(Value::from(10.0)));
        assert_eq!(d.value_of(&Value::from(42.0)), Some(Value::from(10.0)));
        assert_eq!(d.value_of(&Value::from(9.9)), Some(Value::from(8.0)));
    }

    #[test]
    fn linspace_buckets() {
        let d = Domain::linspace(0.0, 10.0, 4).unwrap();
        assert_eq!(d.value_of(&Value::from(0.0)), Some(Value::from(0.0)));
        assert_eq!(d.value_of(&Value::from(2.4)), Some(Value::from(0.0)));
        assert_eq!(d.value_of(&Value::from(2.5)), Some(Value::from(2.5)));
        assert_eq!(d.value_of(&Value::from(3.0)), Some(Value::from(2.5)));
        assert_eq!(d.value_of(&Value::from(5.0)), Some(Value::from(5.0)));
        assert_eq!(d.value_of(&Value::from(6.0)), Some(Value::from(5.0)));
        assert_eq!(d.value_of(&Value::from(7.5)), Some(Value::from(7.5)));
        assert_eq!(d.value_of(&Value::from(9.0)), Some(Value::from(7.5)));
        assert_eq!(d.value_of(&Value::from(10.0)), None);
    }

    #[test]
    fn linspace_buckets_offset_by_lower_bound() {
        let d = Domain::linspace(10.0, 20.0, 2).unwrap();
        assert_eq!(d.value_of(&Value::from(12.0)), Some(Value::from(10.0)));
        assert_eq!(d.value_of(&Value::from(17.0)), Some(Value::from(15.0)));
    }

    #[test]
    fn set_domain_membership() {
        let d = Domain::values([Value::symbol("x"), Value::symbol("y")]);
        assert_eq!(d.len().unwrap(), 2);
        assert_eq!(
            d.value_of(&Value::symbol("x")),
            Some(Value::symbol("x"))
        );
        assert_eq!(d.value_of(&Value::symbol("z")), None);
    }

    #[test]
    fn identity_domain_is_unbounded() {
        let d = Domain::identity();
        assert_eq!(d.value_of(&Value::Int(7)), Some(Value::Int(7)));
        assert_eq!(d.len().unwrap_err(), DomainError::Unbounded);
    }

    #[test]
    fn filtered_domain_falls_back() {
        let inner = Domain::range(0.0, 10.0, 5.0).unwrap();
        let d = Domain::filtered(inner, Domain::identity(), Value::symbol("out"));
        assert_eq!(d.len().unwrap(), 3);
        assert_eq!(d.value_of(&Value::from(7.0)), Some(Value::from(5.0)));
        assert_eq!(d.value_of(&Value::from(12.0)), Some(Value::symbol("out")));
        assert_eq!(d.value_of(&Value::symbol("n/a")), Some(Value::symbol("out")));
    }

    #[test]
    fn buckets_match_len() {
        let d = Domain::threshold_range(0.0, 10.0, 3.0, true, false).unwrap();
        let buckets = d.buckets().unwrap();
        assert_eq!(buckets.len(), d.len().unwrap());
        assert_eq!(
            buckets,
            vec![
                Value::from(0.0),
                Value::from(3.0),
                Value::from(6.0),
                Value::from(9.0),
                Value::from(10.0)
            ]
        );
    }
}
