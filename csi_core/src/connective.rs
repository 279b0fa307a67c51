//! Truth-value algebras parameterising the evaluator.
//!
//! All propositional and temporal operators are defined over a connective:
//! a lattice of truth values with chosen conjunction, disjunction and
//! negation. The classical connective works over `{−∞, +∞}` so that Boolean
//! signals behave classically under min/max; the fuzzy connectives work over
//! `[0, 1]`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when parsing an unrecognised connective selector tag.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown connective tag {0:?}, expected \"default\", \"zadeh\" or \"godel\"")]
pub struct UnknownConnective(
    /// The rejected selector tag.
    pub String,
);

/// An algebra of truth values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Connective {
    /// Classical two-valued logic, encoded over `{−∞, +∞}`.
    #[default]
    Classical,
    /// Zadeh fuzzy logic over `[0, 1]`: min/max with `¬x = 1 − x`.
    Zadeh,
    /// Gödel logic over `[0, 1]`: min/max with `¬x = 1` iff `x = 0`.
    Godel,
}

impl Connective {
    /// The top element, also the Boolean decision threshold.
    pub fn const_true(self) -> f64 {
        match self {
            Connective::Classical => f64::INFINITY,
            Connective::Zadeh | Connective::Godel => 1.0,
        }
    }

    /// The bottom element.
    pub fn const_false(self) -> f64 {
        match self {
            Connective::Classical => f64::NEG_INFINITY,
            Connective::Zadeh | Connective::Godel => 0.0,
        }
    }

    /// Lifts a Boolean into the algebra.
    pub fn truth(self, value: bool) -> f64 {
        if value {
            self.const_true()
        } else {
            self.const_false()
        }
    }

    /// The chosen conjunction; the lattice meet for all recognised algebras.
    pub fn conj(self, a: f64, b: f64) -> f64 {
        a.min(b)
    }

    /// The chosen disjunction; the lattice join for all recognised algebras.
    pub fn disj(self, a: f64, b: f64) -> f64 {
        a.max(b)
    }

    /// The chosen negation.
    pub fn neg(self, x: f64) -> f64 {
        match self {
            Connective::Classical => -x,
            Connective::Zadeh => 1.0 - x,
            Connective::Godel => {
                if x == 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Implication, derived as `¬a ⊔ b`.
    pub fn implies(self, a: f64, b: f64) -> f64 {
        self.disj(self.neg(a), b)
    }

    /// Boolean thresholding of a quantitative verdict.
    pub fn is_true(self, v: f64) -> bool {
        v >= self.const_true()
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Connective::Classical => "default",
            Connective::Zadeh => "zadeh",
            Connective::Godel => "godel",
        };
        write!(f, "{tag}")
    }
}

impl FromStr for Connective {
    type Err = UnknownConnective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Connective::Classical),
            "zadeh" => Ok(Connective::Zadeh),
            "godel" => Ok(Connective::Godel),
            other => Err(UnknownConnective(other.to_owned())),
        }
    }
}
