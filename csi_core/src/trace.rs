//! Time-indexed traces of observable values.
//!
//! A [`Signal`] is a piecewise-constant function of time stored as ordered
//! breakpoints; the value at an instant is that of the greatest breakpoint at
//! or before it, and is undefined before the first breakpoint. A [`Trace`]
//! maps paths to signals and offers the merge, projection and recording
//! algebra consumed by the evaluator and the coverage registry.

use crate::component::{Atom, Path};
use crate::connective::Connective;
use crate::value::Value;
use crate::Time;
use log::trace;
use ordered_float::OrderedFloat;
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Projected signals handed to the evaluator: per-path breakpoint lists with
/// Boolean values already lifted into the connective.
pub type SignalMap = BTreeMap<Path, Vec<(Time, Value)>>;

/// A piecewise-constant signal stored as ordered `(time, value)` breakpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signal {
    points: BTreeMap<Time, Value>,
}

impl Signal {
    /// An empty signal.
    pub fn new() -> Self {
        Signal::default()
    }

    /// Sets the value at `t`, overwriting an existing breakpoint.
    pub fn set(&mut self, t: f64, value: impl Into<Value>) {
        self.points.insert(OrderedFloat(t), value.into());
    }

    /// The value at `t`: the greatest breakpoint at or before `t`.
    pub fn at(&self, t: Time) -> Option<&Value> {
        self.points.range(..=t).next_back().map(|(_, v)| v)
    }

    /// The first breakpoint time, if any.
    pub fn start(&self) -> Option<Time> {
        self.points.keys().next().copied()
    }

    /// Iterates breakpoints in ascending time order.
    pub fn iter(&self) -> impl Iterator<Item = (Time, &Value)> {
        self.points.iter().map(|(t, v)| (*t, v))
    }

    /// The number of breakpoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the signal has no breakpoints.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drops breakpoints whose value equals their predecessor's.
    pub fn compact(&mut self) {
        let mut last: Option<Value> = None;
        self.points.retain(|_, value| {
            let keep = last.as_ref() != Some(value);
            if keep {
                last = Some(value.clone());
            }
            keep
        });
    }
}

impl FromIterator<(f64, Value)> for Signal {
    fn from_iter<I: IntoIterator<Item = (f64, Value)>>(iter: I) -> Self {
        let mut signal = Signal::new();
        for (t, v) in iter {
            signal.set(t, v);
        }
        signal
    }
}

/// A collection of signals keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    signals: BTreeMap<Path, Signal>,
}

impl Trace {
    /// An empty trace.
    pub fn new() -> Self {
        Trace::default()
    }

    /// Sets the value of `path` at `t`, creating the signal if needed.
    pub fn set(&mut self, path: &Path, t: f64, value: impl Into<Value>) {
        self.signals
            .entry(path.clone())
            .or_default()
            .set(t, value.into());
    }

    /// The signal recorded for `path`, if any.
    pub fn get(&self, path: &Path) -> Option<&Signal> {
        self.signals.get(path)
    }

    /// The paths with at least one recorded breakpoint.
    pub fn atoms(&self) -> BTreeSet<Path> {
        self.signals
            .iter()
            .filter(|(_, signal)| !signal.is_empty())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Restricts the trace to the requested atoms.
    ///
    /// Boolean values are lifted into the connective's truth constants; other
    /// values pass through. Atoms without a recorded signal are omitted.
    pub fn project<'a, I>(&self, atoms: I, connective: Connective) -> SignalMap
    where
        I: IntoIterator<Item = &'a Atom>,
    {
        let mut projected = SignalMap::new();
        for atom in atoms {
            let Some(signal) = self.signals.get(atom.path()) else {
                continue;
            };
            if signal.is_empty() {
                continue;
            }
            let lifted = signal
                .iter()
                .map(|(t, value)| {
                    let value = match value {
                        Value::Bool(b) => Value::from(connective.truth(*b)),
                        other => other.clone(),
                    };
                    (t, value)
                })
                .collect();
            projected.insert(atom.path().clone(), lifted);
        }
        projected
    }

    /// Overlays `other` on this trace.
    ///
    /// Absent paths are copied. For shared paths the breakpoint sets are
    /// unioned and, wherever `other`'s carried-forward value is defined, it
    /// wins over this trace's.
    pub fn update(&mut self, other: &Trace) {
        for (path, theirs) in &other.signals {
            match self.signals.entry(path.clone()) {
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(theirs.clone());
                }
                btree_map::Entry::Occupied(mut entry) => {
                    let ours = entry.get_mut();
                    let times: BTreeSet<Time> = ours
                        .points
                        .keys()
                        .chain(theirs.points.keys())
                        .copied()
                        .collect();
                    let mut merged = Signal::new();
                    for t in times {
                        let value = theirs.at(t).or_else(|| ours.at(t));
                        if let Some(value) = value {
                            merged.points.insert(t, value.clone());
                        }
                    }
                    *ours = merged;
                }
            }
        }
        trace!("trace update: {} paths", self.signals.len());
    }

    /// The overlay of `other` on this trace, as a new trace.
    pub fn merge(&self, other: &Trace) -> Trace {
        let mut merged = self.clone();
        merged.update(other);
        merged
    }

    /// Compacts every signal in place.
    pub fn compact(&mut self) {
        for signal in self.signals.values_mut() {
            signal.compact();
        }
    }

    /// Records the leaves of a structured value.
    ///
    /// `element` is a single map or a sequence of maps. Map keys become path
    /// segments and list indices become decimal-string segments; scalar
    /// leaves become breakpoints at the entry's timestamp. Entries for which
    /// `timestamp` returns `None` are skipped silently, as are `null` leaves
    /// and leaves with empty keys.
    pub fn record<F>(&mut self, element: &serde_json::Value, timestamp: F)
    where
        F: Fn(&serde_json::Map<String, serde_json::Value>) -> Option<f64>,
    {
        let entries: Vec<&serde_json::Map<String, serde_json::Value>> = match element {
            serde_json::Value::Object(map) => vec![map],
            serde_json::Value::Array(items) => {
                items.iter().filter_map(|item| item.as_object()).collect()
            }
            _ => Vec::new(),
        };
        for entry in entries {
            let Some(t) = timestamp(entry) else {
                continue;
            };
            let mut leaves = Vec::new();
            for (key, value) in entry {
                collect_leaves(&Path::root(), key, value, &mut leaves);
            }
            for (path, value) in leaves {
                self.set(&path, t, value);
            }
        }
    }

    /// The ordered distinct breakpoints across the requested paths, with the
    /// carried-forward value of each path at every breakpoint.
    pub fn iter_merged<'a>(
        &'a self,
        paths: &'a [Path],
    ) -> impl Iterator<Item = (Time, Vec<Option<&'a Value>>)> + 'a {
        let times: BTreeSet<Time> = paths
            .iter()
            .filter_map(|path| self.signals.get(path))
            .flat_map(|signal| signal.points.keys().copied())
            .collect();
        times.into_iter().map(move |t| {
            let values = paths
                .iter()
                .map(|path| self.signals.get(path).and_then(|signal| signal.at(t)))
                .collect();
            (t, values)
        })
    }
}

fn collect_leaves(
    prefix: &Path,
    key: &str,
    value: &serde_json::Value,
    leaves: &mut Vec<(Path, Value)>,
) {
    let Ok(path) = prefix.extend(key) else {
        // Empty keys cannot name a segment; the leaf is dropped.
        return;
    };
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                collect_leaves(&path, k, v, leaves);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect_leaves(&path, &i.to_string(), v, leaves);
            }
        }
        serde_json::Value::Bool(b) => leaves.push((path, Value::Bool(*b))),
        serde_json::Value::Number(n) => {
            let value = match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::from(n.as_f64().unwrap_or(f64::NAN)),
            };
            leaves.push((path, value));
        }
        serde_json::Value::String(s) => leaves.push((path, Value::symbol(s.clone()))),
        serde_json::Value::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(name: &str) -> Path {
        name.parse().unwrap()
    }

    #[test]
    fn signals_carry_forward() {
        let mut signal = Signal::new();
        signal.set(1.0, Value::Int(10));
        signal.set(5.0, Value::Int(50));
        assert_eq!(signal.at(OrderedFloat(0.0)), None);
        assert_eq!(signal.at(OrderedFloat(1.0)), Some(&Value::Int(10)));
        assert_eq!(signal.at(OrderedFloat(3.0)), Some(&Value::Int(10)));
        assert_eq!(signal.at(OrderedFloat(7.0)), Some(&Value::Int(50)));
    }

    #[test]
    fn repeated_writes_keep_the_last() {
        let mut signal = Signal::new();
        signal.set(1.0, Value::Int(10));
        signal.set(1.0, Value::Int(20));
        assert_eq!(signal.len(), 1);
        assert_eq!(signal.at(OrderedFloat(1.0)), Some(&Value::Int(20)));
    }

    #[test]
    fn compaction_drops_repeated_values() {
        let mut signal: Signal = [
            (0.0, Value::Bool(true)),
            (1.0, Value::Bool(true)),
            (2.0, Value::Bool(false)),
            (3.0, Value::Bool(false)),
        ]
        .into_iter()
        .collect();
        signal.compact();
        assert_eq!(signal.len(), 2);
        assert_eq!(signal.at(OrderedFloat(1.0)), Some(&Value::Bool(true)));
        assert_eq!(signal.at(OrderedFloat(3.0)), Some(&Value::Bool(false)));
    }

    #[test]
    fn merge_prefers_other_where_defined() {
        let mut left = Trace::new();
        left.set(&path("a"), 0.0, Value::Int(1));
        left.set(&path("a"), 2.0, Value::Int(2));
        let mut right = Trace::new();
        right.set(&path("a"), 1.0, Value::Int(9));

        let merged = left.merge(&right);
        let signal = merged.get(&path("a")).unwrap();
        // Before right's first breakpoint, left's value survives.
        assert_eq!(signal.at(OrderedFloat(0.0)), Some(&Value::Int(1)));
        // From right's first breakpoint on, right's carried value wins.
        assert_eq!(signal.at(OrderedFloat(1.0)), Some(&Value::Int(9)));
        assert_eq!(signal.at(OrderedFloat(2.0)), Some(&Value::Int(9)));
    }

    #[test]
    fn merge_copies_absent_paths() {
        let mut left = Trace::new();
        left.set(&path("a"), 0.0, Value::Int(1));
        let mut right = Trace::new();
        right.set(&path("b"), 0.0, Value::Int(2));

        let merged = left.merge(&right);
        assert_eq!(merged.atoms(), BTreeSet::from([path("a"), path("b")]));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut trace = Trace::new();
        trace.set(&path("a"), 0.0, Value::Int(1));
        trace.set(&path("a"), 2.0, Value::Int(2));
        trace.set(&path("b"), 1.0, Value::Bool(true));
        assert_eq!(trace.merge(&trace), trace);
    }

    #[test]
    fn projection_lifts_booleans() {
        let mut trace = Trace::new();
        trace.set(&path("p"), 0.0, Value::Bool(true));
        trace.set(&path("x"), 0.0, Value::Int(4));

        let p = Atom::new(path("p")).unwrap();
        let x = Atom::new(path("x")).unwrap();
        let missing = Atom::new(path("missing")).unwrap();
        let projected = trace.project([&p, &x, &missing], Connective::Zadeh);

        assert_eq!(projected.len(), 2);
        assert_eq!(projected[&path("p")], vec![(OrderedFloat(0.0), Value::from(1.0))]);
        assert_eq!(projected[&path("x")], vec![(OrderedFloat(0.0), Value::Int(4))]);
    }

    #[test]
    fn record_flattens_nested_structures() {
        let mut trace = Trace::new();
        trace.record(
            &json!({
                "cobot": {
                    "velocity": 1.5,
                    "position": {"in_bench": true},
                    "waypoints": [4, 7],
                },
                "timestamp": 3.0,
            }),
            |entry| entry.get("timestamp").and_then(|t| t.as_f64()),
        );

        let velocity = trace.get(&path("cobot::velocity")).unwrap();
        assert_eq!(velocity.at(OrderedFloat(3.0)), Some(&Value::from(1.5)));
        let in_bench = trace.get(&path("cobot::position::in_bench")).unwrap();
        assert_eq!(in_bench.at(OrderedFloat(3.0)), Some(&Value::Bool(true)));
        let second = trace.get(&path("cobot::waypoints::1")).unwrap();
        assert_eq!(second.at(OrderedFloat(3.0)), Some(&Value::Int(7)));
    }

    #[test]
    fn record_skips_entries_without_timestamps() {
        let mut trace = Trace::new();
        trace.record(
            &json!([
                {"entity": {"ready": true}, "timestamp": 1.0},
                {"entity": {"ready": false}},
            ]),
            |entry| entry.get("timestamp").and_then(|t| t.as_f64()),
        );
        let ready = trace.get(&path("entity::ready")).unwrap();
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn merged_breakpoints_carry_values_forward() {
        let mut trace = Trace::new();
        trace.set(&path("a"), 0.0, Value::Int(1));
        trace.set(&path("a"), 2.0, Value::Int(2));
        trace.set(&path("b"), 1.0, Value::symbol("x"));

        let paths = [path("a"), path("b")];
        let rows: Vec<_> = trace.iter_merged(&paths).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, OrderedFloat(0.0));
        assert_eq!(rows[0].1, vec![Some(&Value::Int(1)), None]);
        assert_eq!(rows[1].1, vec![Some(&Value::Int(1)), Some(&Value::symbol("x"))]);
        assert_eq!(rows[2].1, vec![Some(&Value::Int(2)), Some(&Value::symbol("x"))]);
    }
}
