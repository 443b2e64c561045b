//! Pass 10: normalize `some x in xs` to `LiteralEnum(x, xs, body)`
//! (spec §4.4 step 10).
//!
//! Grounded on `src/passes/structure.cc`'s `some`-handling, which lifts a
//! `Membership` literal into an explicit enumeration node carrying the
//! rest of the body as its scope.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

pub fn pass() -> Pass {
    Pass::new("explicit_enums", Strategy::BottomUp).with_rule(Rule::new(
        "lift-membership-to-enum",
        Kind::UnifyBody,
        |body| {
            let Some(pos) = body.children.iter().position(|c| {
                c.kind == Kind::Literal && c.child(0).is_some_and(|e| e.kind == Kind::Membership)
            }) else {
                return RewriteOutcome::NoChange;
            };
            let membership = body.children[pos].child(0).unwrap();
            let Some(var) = membership.child(0) else {
                return RewriteOutcome::NoChange;
            };
            let Some(seq) = membership.child(1) else {
                return RewriteOutcome::NoChange;
            };
            let rest: Vec<Node> = body
                .children
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != pos)
                .map(|(_, c)| c.clone())
                .collect();
            let enum_node = Node::with_children(
                Kind::LiteralEnum,
                vec![var.clone(), seq.clone(), Node::with_children(Kind::UnifyBody, rest)],
            );
            RewriteOutcome::Replace(Node::with_children(Kind::UnifyBody, vec![enum_node]))
        },
    ))
}

pub fn schema() -> Schema {
    Schema::new().rule(
        Kind::Rego,
        Shape(vec![
            Slot::One(Kind::DataSeq),
            Slot::One(Kind::Input),
            Slot::One(Kind::ModuleSeq),
            Slot::One(Kind::Query),
        ]),
    )
}
