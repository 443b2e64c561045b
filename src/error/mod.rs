//! The error taxonomy (spec §7), grounded on `include/rego/errors.h`'s
//! stable error-code strings.
//!
//! Compile errors become [`Node`](crate::tree::Node)s of kind
//! [`crate::tree::Kind::Error`] rooted at the offending subtree so that
//! sibling passes keep running and diagnostics accumulate (spec §4.3);
//! this module only defines the taxonomy and the conversions to/from that
//! node shape.
//!
//! `ErrorCode`'s string form is derived with `strum` rather than
//! hand-matched, the way the teacher reaches for `strum_macros` to turn
//! an enum into its wire string instead of writing the match itself.

use crate::tree::{Kind, Leaf, Node};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Stable error-code identifiers surfaced in query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    /// Compile-time type mismatch (assigning to a non-lvalue, infix type error).
    RegoTypeError,
    /// Surface-syntax failure, passed through from the external parser.
    RegoParseError,
    /// Runtime type mismatch in a built-in argument or an indexing operation.
    EvalTypeError,
    /// A built-in's preconditions were not met.
    EvalBuiltinError,
    /// An object rule produced duplicate keys with differing values.
    EvalConflictError,
    /// A post-pass schema violation -- an internal compiler bug.
    WellformedError,
    /// The unifier exceeded its retry bound, or detected unbounded recursion.
    RuntimeError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// A single diagnostic: a message, the code it was raised under, and a
/// human-readable location hint (a dotted path or source excerpt -- the
/// core does not own source spans, since the surface parser is external).
#[derive(Debug, Clone, PartialEq)]
pub struct RegoError {
    pub message: String,
    pub code: ErrorCode,
    pub location: String,
}

impl RegoError {
    pub fn new(message: impl Into<String>, code: ErrorCode) -> Self {
        RegoError {
            message: message.into(),
            code,
            location: String::new(),
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Wraps this error as an [`Kind::Error`] node, the shape every pass
    /// checks for and refuses to transform further (spec §4.3).
    pub fn into_node(self) -> Node {
        let mut node = Node::new(Kind::Error);
        node.leaf = Leaf::Var(format!("{}:{}", self.code, self.message));
        node
    }
}

impl fmt::Display for RegoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}: {}", self.code, self.message)
        } else {
            write!(f, "{} at {}: {}", self.code, self.location, self.message)
        }
    }
}

impl std::error::Error for RegoError {}

/// Collects every [`Kind::Error`] node reachable from `root`, matching the
/// `result` pass's duty of gathering diagnostics into the final
/// `errors` array (spec §4.4 step 28, §7).
pub fn collect_errors(root: &Node) -> Vec<RegoError> {
    let mut errors = vec![];
    root.walk(&mut |n| {
        if n.kind == Kind::Error {
            if let Leaf::Var(encoded) = &n.leaf {
                if let Some((code, message)) = encoded.split_once(':') {
                    let code = ErrorCode::from_str(code).unwrap_or(ErrorCode::WellformedError);
                    errors.push(RegoError::new(message.to_string(), code));
                }
            }
            false
        } else {
            true
        }
    });
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_node() {
        let err = RegoError::new("duplicate key", ErrorCode::EvalConflictError);
        let node = err.clone().into_node();
        let found = collect_errors(&node);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code.as_str(), "eval_conflict_error");
    }
}
