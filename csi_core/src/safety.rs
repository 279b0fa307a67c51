//! Named safety conditions.
//!
//! Hazards and unsafe control actions are caller-supplied formulae with a
//! stable identifier and a human-readable description. The engine treats the
//! condition as an opaque formula; the identifier and description only
//! matter for reporting.

use crate::formula::Formula;
use crate::monitor::Monitor;

/// The provenance of a named safety condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConditionKind {
    /// A system-level hazard.
    Hazard,
    /// An unsafe control action from the hazard analysis.
    UnsafeControlAction,
}

/// A uniquely identified safety condition and its formula.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SafetyCondition {
    kind: ConditionKind,
    uid: String,
    condition: Formula,
    description: String,
}

impl SafetyCondition {
    /// A hazard definition.
    pub fn hazard(
        uid: impl Into<String>,
        condition: Formula,
        description: impl Into<String>,
    ) -> Self {
        SafetyCondition {
            kind: ConditionKind::Hazard,
            uid: uid.into(),
            condition,
            description: description.into(),
        }
    }

    /// An unsafe control action definition.
    pub fn unsafe_control_action(
        uid: impl Into<String>,
        condition: Formula,
        description: impl Into<String>,
    ) -> Self {
        SafetyCondition {
            kind: ConditionKind::UnsafeControlAction,
            uid: uid.into(),
            condition,
            description: description.into(),
        }
    }

    /// The provenance of the condition.
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    /// The stable identifier of the condition.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The monitored formula.
    pub fn condition(&self) -> &Formula {
        &self.condition
    }

    /// The human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A monitor over the formulae of a condition catalogue.
pub fn monitor_of<'a, I>(catalogue: I) -> Monitor
where
    I: IntoIterator<Item = &'a SafetyCondition>,
{
    Monitor::from_conditions(catalogue.into_iter().map(|c| c.condition.clone()))
}
