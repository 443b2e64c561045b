//! The Term model: the tagged value universe of scalars, arrays, sets, and
//! objects that flows through unification, plus the canonical-key machinery
//! used for equality, ordering, and hashing.
//!
//! Grounded on `CoreValue`/`ValueContainer` (`values/core_value.rs`,
//! `values/value_container.rs`) for the enum-of-kinds shape, and on
//! `Resolver::object`/`Resolver::array`/`Resolver::set`/`Resolver::to_term`
//! (`include/rego/resolver.h`) for the constructor contracts.

pub mod key;
pub mod scalar;

use crate::bigint::BigInt;
pub use scalar::Scalar;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TermError {
    #[error("object has conflicting values for key {key}: {left} != {right}")]
    Conflict {
        key: String,
        left: String,
        right: String,
    },
    #[error("value at path element {0:?} is not an object")]
    NotAnObject(String),
}

/// The tagged value universe. Equality, ordering, and hashing are all
/// defined in terms of [`key::canonical_key`], per invariant 4 of the spec
/// (“Values’ canonical keys are pure functions of their Term content”).
#[derive(Debug, Clone)]
pub enum Term {
    Scalar(Scalar),
    /// Insertion order is significant.
    Array(Vec<Term>),
    /// Deduplicated by canonical key; iteration order is the dedup order,
    /// but identity and comparisons only ever go through the sorted key.
    Set(Vec<Term>),
    /// Keys are unique; insertion order is not significant for equality.
    Object(Vec<(Term, Term)>),
}

impl Term {
    pub fn null() -> Self {
        Term::Scalar(Scalar::Null)
    }

    pub fn bool(value: bool) -> Self {
        Term::Scalar(Scalar::Bool(value))
    }

    pub fn int<T: Into<BigInt>>(value: T) -> Self {
        Term::Scalar(Scalar::Int(value.into()))
    }

    pub fn float(value: f64) -> Result<Self, scalar::InvalidFloatError> {
        Scalar::float(value).map(Term::Scalar)
    }

    pub fn str<T: Into<String>>(value: T) -> Self {
        Term::Scalar(Scalar::Str(value.into()))
    }

    /// Deduplicates `nodes` by canonical key (last write wins, matching
    /// `Resolver::set`'s behavior of folding a term sequence into a set).
    pub fn array(nodes: Vec<Term>) -> Self {
        Term::Array(nodes)
    }

    pub fn set(nodes: Vec<Term>) -> Self {
        let mut by_key: BTreeMap<String, Term> = BTreeMap::new();
        for node in nodes {
            by_key.insert(key::canonical_key(&node), node);
        }
        Term::Set(by_key.into_values().collect())
    }

    /// `is_rule = true` rejects duplicate keys with differing values
    /// (`eval_conflict_error`); otherwise last-write-wins.
    pub fn object(items: Vec<(Term, Term)>, is_rule: bool) -> Result<Self, TermError> {
        let mut by_key: indexmap::IndexMap<String, (Term, Term)> = indexmap::IndexMap::new();
        for (k, v) in items {
            let kk = key::canonical_key(&k);
            if let Some((_, existing_v)) = by_key.get(&kk) {
                if is_rule && key::canonical_key(existing_v) != key::canonical_key(&v) {
                    return Err(TermError::Conflict {
                        key: kk,
                        left: key::canonical_key(existing_v),
                        right: key::canonical_key(&v),
                    });
                }
            }
            by_key.insert(kk, (k, v));
        }
        Ok(Term::Object(by_key.into_values().collect()))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Term::Set(_))
    }
    pub fn is_object(&self) -> bool {
        matches!(self, Term::Object(_))
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Term::Array(_))
    }
    pub fn is_scalar(&self) -> bool {
        matches!(self, Term::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Term::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Term::Scalar(s) => s.is_truthy(),
            _ => true,
        }
    }

    pub fn canonical_key(&self) -> String {
        key::canonical_key(self)
    }

    /// Idempotent minimum-wrapping conversion: a `Term` is already a
    /// `Term`, so this is the identity; exists to mirror
    /// `Resolver::to_term`, which in the source promotes a raw value node
    /// to a `Term` wrapper only when one isn't already present.
    pub fn to_term(self) -> Term {
        self
    }

    /// Walks (or creates) intermediate objects along `path`, inserting
    /// `value` at the final segment. Fails with [`TermError::NotAnObject`]
    /// if it meets a non-object along the way.
    pub fn insert_into_object(&mut self, path: &[&str], value: Term) -> Result<(), TermError> {
        let Term::Object(items) = self else {
            return Err(TermError::NotAnObject(
                path.first().map(|s| s.to_string()).unwrap_or_default(),
            ));
        };
        let Some((head, rest)) = path.split_first() else {
            return Ok(());
        };
        let head_key = Term::str(*head);
        let head_canon = head_key.canonical_key();
        let existing = items.iter_mut().find(|(k, _)| k.canonical_key() == head_canon);

        if rest.is_empty() {
            match existing {
                Some((_, v)) => *v = value,
                None => items.push((head_key, value)),
            }
            return Ok(());
        }

        match existing {
            Some((_, v)) => v.insert_into_object(rest, value),
            None => {
                let mut sub = Term::Object(vec![]);
                sub.insert_into_object(rest, value)?;
                items.push((head_key, sub));
                Ok(())
            }
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_key() == other.canonical_key()
    }
}
impl Eq for Term {}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_key().cmp(&other.canonical_key())
    }
}
impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_key().hash(state);
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Scalar(s) => write!(f, "{s}"),
            Term::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Term::Set(items) => {
                let mut sorted: Vec<&Term> = items.iter().collect();
                sorted.sort();
                write!(f, "{{")?;
                for (i, item) in sorted.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Term::Object(items) => {
                let mut sorted: Vec<&(Term, Term)> = items.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                write!(f, "{{")?;
                for (i, (k, v)) in sorted.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Term::bool(value)
    }
}
impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::str(value)
    }
}
impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::str(value)
    }
}
impl From<Scalar> for Term {
    fn from(value: Scalar) -> Self {
        Term::Scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_dedups_by_canonical_key() {
        let s = Term::set(vec![Term::int(1), Term::int(1), Term::int(2)]);
        match s {
            Term::Set(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn object_conflict_detects_differing_values() {
        let result = Term::object(
            vec![
                (Term::str("a"), Term::int(1)),
                (Term::str("a"), Term::int(2)),
            ],
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn object_non_rule_is_last_write_wins() {
        let result = Term::object(
            vec![
                (Term::str("a"), Term::int(1)),
                (Term::str("a"), Term::int(2)),
            ],
            false,
        )
        .unwrap();
        match result {
            Term::Object(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].1, Term::int(2));
            }
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn insert_into_object_creates_intermediate_objects() {
        let mut obj = Term::Object(vec![]);
        obj.insert_into_object(&["a", "b", "c"], Term::int(1)).unwrap();
        assert_eq!(obj.canonical_key(), "{\"a\":{\"b\":{\"c\":n:1}}}");
    }

    #[test]
    fn insert_into_object_rejects_non_object_path_element() {
        let mut obj = Term::object(vec![(Term::str("a"), Term::int(1))], false).unwrap();
        assert!(obj.insert_into_object(&["a", "b"], Term::int(2)).is_err());
    }
}
