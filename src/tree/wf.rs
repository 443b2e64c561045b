//! Well-formedness schemas: for each compile stage, the permitted child
//! shape of every structural node kind. Grounded on the `wf::ops` DSL of
//! `include/rego/wf.h` (`Parent <<= ChildA * ChildB++ | ChildC`), reworked
//! as a small Rust combinator since we don't have Trieste's macro-based
//! token algebra.
//!
//! A schema is checked against a tree with [`validate`] after a pass runs;
//! a violation becomes an [`Error`] node rooted at the offending subtree
//! (spec §4.3, §7) rather than a panic, so sibling subtrees can still be
//! checked and their diagnostics collected.

use super::{Kind, Node};
use std::collections::HashMap;
use thiserror::Error;

/// One permitted position in a node's child sequence.
#[derive(Debug, Clone)]
pub enum Slot {
    /// Exactly one child of this kind.
    One(Kind),
    /// Exactly one child, which must be one of these kinds.
    OneOf(Vec<Kind>),
    /// Zero or more children of this kind (`Kind++`).
    Repeat(Kind),
    /// Zero or more children, each one of these kinds.
    RepeatOneOf(Vec<Kind>),
    /// One or more children of this kind (`Kind++[1]`).
    RepeatAtLeastOne(Kind),
}

#[derive(Debug, Clone, Default)]
pub struct Shape(pub Vec<Slot>);

/// `schema(p)` from invariant 1: maps each structural kind to its
/// permitted child shape under pass `p`. Kinds with no entry are treated
/// as opaque leaves and are not structurally checked (e.g. `Var`, `Term`,
/// operator tokens).
#[derive(Debug, Clone, Default)]
pub struct Schema(pub HashMap<Kind, Shape>);

impl Schema {
    pub fn new() -> Self {
        Schema(HashMap::new())
    }

    /// Clones `self` and applies `overrides`, mirroring the source's
    /// `wf_pass_x = wf_pass_prev | (Kind <<= ...)` chaining.
    pub fn extend(&self, overrides: impl IntoIterator<Item = (Kind, Shape)>) -> Schema {
        let mut next = self.clone();
        for (kind, shape) in overrides {
            next.0.insert(kind, shape);
        }
        next
    }

    pub fn rule(mut self, kind: Kind, shape: Shape) -> Self {
        self.0.insert(kind, shape);
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WfViolation {
    #[error("node {0:?} has no schema entry for stage; {1}")]
    UnknownNode(Kind, String),
    #[error("node {parent:?} expected child kind {expected:?} at position {position}, found {found:?}")]
    UnexpectedChild {
        parent: Kind,
        expected: Vec<Kind>,
        position: usize,
        found: Kind,
    },
    #[error("node {parent:?} requires at least one child of kind {expected:?}")]
    MissingRequiredChild { parent: Kind, expected: Kind },
    #[error("node {parent:?} has {actual} children but its schema permits {expected}")]
    WrongArity {
        parent: Kind,
        expected: usize,
        actual: usize,
    },
}

/// Validates `node` and every descendant against `schema`. Collects every
/// violation found rather than stopping at the first, so multiple
/// diagnostics can accumulate in one compile (spec §4.3/§7).
pub fn validate(node: &Node, schema: &Schema) -> Vec<WfViolation> {
    let mut violations = vec![];
    validate_into(node, schema, &mut violations);
    violations
}

fn validate_into(node: &Node, schema: &Schema, out: &mut Vec<WfViolation>) {
    let Some(shape) = schema.0.get(&node.kind) else {
        // Opaque/leaf kind: not structurally checked, but still recurse
        // into any children it happens to carry (e.g. Error nodes).
        for child in &node.children {
            validate_into(child, schema, out);
        }
        return;
    };

    check_shape(node, shape, out);

    for child in &node.children {
        validate_into(child, schema, out);
    }
}

fn check_shape(node: &Node, shape: &Shape, out: &mut Vec<WfViolation>) {
    let mut pos = 0usize;
    for slot in &shape.0 {
        match slot {
            Slot::One(k) => {
                match node.children.get(pos) {
                    Some(c) if c.kind == *k => {}
                    Some(c) => out.push(WfViolation::UnexpectedChild {
                        parent: node.kind,
                        expected: vec![*k],
                        position: pos,
                        found: c.kind,
                    }),
                    None => out.push(WfViolation::MissingRequiredChild {
                        parent: node.kind,
                        expected: *k,
                    }),
                }
                pos += 1;
            }
            Slot::OneOf(ks) => {
                match node.children.get(pos) {
                    Some(c) if ks.contains(&c.kind) => {}
                    Some(c) => out.push(WfViolation::UnexpectedChild {
                        parent: node.kind,
                        expected: ks.clone(),
                        position: pos,
                        found: c.kind,
                    }),
                    None => out.push(WfViolation::MissingRequiredChild {
                        parent: node.kind,
                        expected: ks[0],
                    }),
                }
                pos += 1;
            }
            Slot::Repeat(k) => {
                while let Some(c) = node.children.get(pos) {
                    if c.kind != *k {
                        break;
                    }
                    pos += 1;
                }
            }
            Slot::RepeatOneOf(ks) => {
                while let Some(c) = node.children.get(pos) {
                    if !ks.contains(&c.kind) {
                        break;
                    }
                    pos += 1;
                }
            }
            Slot::RepeatAtLeastOne(k) => {
                let start = pos;
                while let Some(c) = node.children.get(pos) {
                    if c.kind != *k {
                        break;
                    }
                    pos += 1;
                }
                if pos == start {
                    out.push(WfViolation::MissingRequiredChild {
                        parent: node.kind,
                        expected: *k,
                    });
                }
            }
        }
    }
    if pos != node.children.len() {
        out.push(WfViolation::WrongArity {
            parent: node.kind,
            expected: pos,
            actual: node.children.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    #[test]
    fn flags_missing_child() {
        let schema = Schema::new().rule(
            Kind::RuleComp,
            Shape(vec![Slot::One(Kind::Var), Slot::One(Kind::Term)]),
        );
        let node = Node::with_children(Kind::RuleComp, vec![Node::var("allow")]);
        let violations = validate(&node, &schema);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn accepts_well_formed_node() {
        let schema = Schema::new().rule(
            Kind::RuleComp,
            Shape(vec![Slot::One(Kind::Var), Slot::One(Kind::Term)]),
        );
        let node = Node::with_children(
            Kind::RuleComp,
            vec![Node::var("allow"), Node::term(Term::bool(true))],
        );
        assert!(validate(&node, &schema).is_empty());
    }

    #[test]
    fn repeat_allows_zero_or_more() {
        let schema = Schema::new().rule(Kind::Policy, Shape(vec![Slot::Repeat(Kind::Import)]));
        let empty = Node::new(Kind::Policy);
        assert!(validate(&empty, &schema).is_empty());
    }
}
