//! Paths, atoms and the construction-time context façade.
//!
//! An [`Atom`] is the leaf of observability: it names a signal through a
//! hierarchical [`Path`] and optionally declares how its values are bucketed
//! for coverage. [`Context`] and [`Alias`] are construction-time conveniences
//! that assemble atoms and formulae under nested paths; they play no role at
//! evaluation time.

use crate::domain::Domain;
use crate::formula::{Formula, Operand};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Separator used in the canonical display form of a [`Path`].
pub const PATH_SEPARATOR: &str = "::";

/// Errors raised while constructing paths, atoms or contexts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    /// A path segment was empty.
    #[error("path segments must not be empty")]
    EmptySegment,
    /// An atom was given an empty path.
    #[error("atoms require a non-empty path")]
    EmptyPath,
}

/// A hierarchical identifier for an observable quantity.
///
/// Paths are finite ordered sequences of non-empty name segments, displayed
/// joined by `::` and compared by their segment sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    segments: SmallVec<[String; 4]>,
}

impl Path {
    /// The empty path, usable only as the root of a [`Context`].
    pub fn root() -> Self {
        Path::default()
    }

    /// Builds a path from its segments.
    ///
    /// Fails if no segment is given or any segment is empty.
    pub fn new<I, S>(segments: I) -> Result<Self, ComponentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Path::root();
        for segment in segments {
            path.push(segment.into())?;
        }
        if path.is_empty() {
            Err(ComponentError::EmptyPath)
        } else {
            Ok(path)
        }
    }

    fn push(&mut self, segment: String) -> Result<(), ComponentError> {
        if segment.is_empty() {
            Err(ComponentError::EmptySegment)
        } else {
            self.segments.push(segment);
            Ok(())
        }
    }

    /// Returns a new path with `segment` appended.
    pub fn extend(&self, segment: impl Into<String>) -> Result<Self, ComponentError> {
        let mut extended = self.clone();
        extended.push(segment.into())?;
        Ok(extended)
    }

    /// Returns a new path with all of `suffix`'s segments appended.
    pub fn join(&self, suffix: &Path) -> Self {
        let mut joined = self.clone();
        joined.segments.extend(suffix.segments.iter().cloned());
        joined
    }

    /// The segments of the path, in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(PATH_SEPARATOR))
    }
}

impl FromStr for Path {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ComponentError::EmptyPath);
        }
        Path::new(s.split(PATH_SEPARATOR))
    }
}

// Paths serialise as their `::`-joined display form so that they can be used
// as canonical map keys in registry blobs.
impl Serialize for Path {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = String::deserialize(deserializer)?;
        repr.parse().map_err(serde::de::Error::custom)
    }
}

/// A leaf observable: a [`Path`] plus an optional coverage [`Domain`].
///
/// Atoms compare, order and hash by path alone; two atoms differing only in
/// their domain are interchangeable as identifiers but keep their own
/// provenance.
#[derive(Debug, Clone)]
pub struct Atom {
    path: Path,
    domain: Option<Domain>,
}

impl Atom {
    /// Creates an atom over `path` without a declared domain.
    pub fn new(path: Path) -> Result<Self, ComponentError> {
        if path.is_empty() {
            Err(ComponentError::EmptyPath)
        } else {
            Ok(Atom { path, domain: None })
        }
    }

    /// Creates an atom over `path` with a declared coverage domain.
    pub fn with_domain(path: Path, domain: Domain) -> Result<Self, ComponentError> {
        let mut atom = Atom::new(path)?;
        atom.domain = Some(domain);
        Ok(atom)
    }

    /// The path identifying the atom's signal.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The declared coverage domain, if any.
    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    /// The comparison `self < rhs`.
    pub fn lt(&self, rhs: impl Into<Operand>) -> Formula {
        Formula::Lt(self.clone().into(), rhs.into())
    }

    /// The comparison `self = rhs`, up to the evaluation tolerance.
    pub fn eq(&self, rhs: impl Into<Operand>) -> Formula {
        Formula::Eq(self.clone().into(), rhs.into())
    }

    /// The comparison `self <= rhs`, decomposed as `(self < rhs) | (self = rhs)`.
    pub fn le(&self, rhs: impl Into<Operand>) -> Formula {
        let rhs = rhs.into();
        self.lt(rhs.clone()) | self.eq(rhs)
    }

    /// The comparison `self > rhs`.
    pub fn gt(&self, rhs: impl Into<Operand>) -> Formula {
        !self.le(rhs)
    }

    /// The comparison `self >= rhs`.
    pub fn ge(&self, rhs: impl Into<Operand>) -> Formula {
        !self.lt(rhs)
    }

    /// The comparison `self != rhs`.
    pub fn ne(&self, rhs: impl Into<Operand>) -> Formula {
        !self.eq(rhs)
    }

    /// The discrete-step shift of the atom's truth value by `k` steps.
    pub fn shift(&self, k: i64) -> Formula {
        Formula::from(self.clone()) >> k
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Atom {}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// A nestable grouping used at construction time to build atom paths.
///
/// A context carries its accumulated path; attaching a sub-context or a leaf
/// atom returns a new value with the enclosing path prefixed. Contexts
/// produce plain [`Atom`]s and [`Formula`]e and are not consulted during
/// evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Context {
    path: Path,
}

impl Context {
    /// The root context, with an empty path.
    pub fn root() -> Self {
        Context::default()
    }

    /// A context rooted at `path`.
    pub fn new(path: Path) -> Self {
        Context { path }
    }

    /// The accumulated path of the context.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A sub-context named `name` under this context.
    pub fn child(&self, name: impl Into<String>) -> Result<Context, ComponentError> {
        Ok(Context::new(self.path.extend(name)?))
    }

    /// A leaf atom named `name` under this context.
    pub fn atom(&self, name: impl Into<String>) -> Result<Atom, ComponentError> {
        Atom::new(self.path.extend(name)?)
    }

    /// A leaf atom named `name` under this context, with a coverage domain.
    pub fn atom_in(&self, name: impl Into<String>, domain: Domain) -> Result<Atom, ComponentError> {
        Atom::with_domain(self.path.extend(name)?, domain)
    }
}

/// A parametrised formula template.
///
/// Instantiating an alias inside a context rebinds every atom of the template
/// by prefixing the context's path, yielding a plain [`Formula`]. Rebinding
/// happens entirely at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    template: Formula,
}

impl Alias {
    /// Creates an alias from its template formula.
    pub fn new(template: Formula) -> Self {
        Alias { template }
    }

    /// The template formula, with atoms relative to the instantiation point.
    pub fn template(&self) -> &Formula {
        &self.template
    }

    /// Instantiates the alias under `context`.
    pub fn instantiate(&self, context: &Context) -> Formula {
        let rebound: BTreeMap<Atom, Atom> = self
            .template
            .atoms()
            .into_iter()
            .map(|atom| {
                let path = context.path.join(atom.path());
                let prefixed = match atom.domain() {
                    Some(domain) => Atom::with_domain(path, domain.clone()),
                    None => Atom::new(path),
                }
                .expect("prefixing preserves non-empty paths");
                (atom, prefixed)
            })
            .collect();
        self.template.substitute(&rebound)
    }
}
