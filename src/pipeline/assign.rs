//! Pass 19: rewrite unification-operator (`=`) expressions into
//! `AssignInfix(AssignArg, AssignArg)`; every naked expression in a rule
//! body becomes an assignment to a fresh temporary (spec §4.4 step 19).
//!
//! Grounded on `src/unify/assign.cc`. The Go-compatibility convention
//! (`f(a,b,c)` rewritten to `f(a,b) == c` when `f` has arity 2) is
//! implemented behind [`GO_COMPAT_ARITY_REWRITE`], left `false` by
//! default per the compatibility-switch guidance of spec §9's open
//! questions -- flipping it on is a registry-level concern (arity lookup
//! against [`crate::registry::BuiltinRegistry`]), not this pass's.

use crate::pipeline::fresh_temp;
use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};
use std::cell::RefCell;

/// See module doc: left off, as the source leaves this convention
/// undocumented and it's a compatibility affordance, not core semantics.
pub const GO_COMPAT_ARITY_REWRITE: bool = false;

pub fn pass() -> Pass {
    let counter = RefCell::new(0usize);
    Pass::new("assign", Strategy::BottomUp).with_rule(Rule::new(
        "wrap-naked-expr",
        Kind::Literal,
        move |literal| {
            let Some(expr) = literal.child(0) else {
                return RewriteOutcome::NoChange;
            };
            let Some(inner) = expr.child(0) else {
                return RewriteOutcome::NoChange;
            };
            if inner.kind == Kind::AssignInfix {
                return RewriteOutcome::NoChange;
            }
            let mut c = counter.borrow_mut();
            let temp = fresh_temp(&mut c, "assign");
            let assign = Node::with_children(
                Kind::AssignInfix,
                vec![
                    Node::with_children(Kind::AssignArg, vec![Node::var(temp)]),
                    Node::with_children(Kind::AssignArg, vec![inner.clone()]),
                ],
            );
            RewriteOutcome::Replace(Node::with_children(
                Kind::Literal,
                vec![Node::with_children(Kind::Expr, vec![assign])],
            ))
        },
    ))
}

pub fn schema() -> Schema {
    Schema::new()
        .rule(
            Kind::Rego,
            Shape(vec![
                Slot::One(Kind::DataSeq),
                Slot::One(Kind::Input),
                Slot::One(Kind::ModuleSeq),
                Slot::One(Kind::Query),
            ]),
        )
        .rule(
            Kind::AssignInfix,
            Shape(vec![Slot::One(Kind::AssignArg), Slot::One(Kind::AssignArg)]),
        )
}
