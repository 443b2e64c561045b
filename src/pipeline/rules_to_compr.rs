//! Pass 12: convert set rules and object rules into forms that yield a
//! comprehension producing the element/pair (spec §4.4 step 12).
//!
//! Grounded on `src/unify/compr.cc`'s rule-to-comprehension lowering,
//! which is how the source lets `rules_to_compr` + `compr` + the
//! unifier share one mechanism for both literal comprehensions and set/
//! object rule bodies.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

pub fn pass() -> Pass {
    Pass::new("rules_to_compr", Strategy::TopDown)
        .with_rule(Rule::new("lower-rule-set", Kind::RuleSet, |node| {
            let (Some(name), Some(elem_var), Some(body)) = (node.child(0), node.child(1), node.child(2)) else {
                return RewriteOutcome::NoChange;
            };
            let compr = Node::with_children(
                Kind::SetCompr,
                vec![Node::with_children(Kind::Expr, vec![elem_var.clone()]), body.clone()],
            );
            RewriteOutcome::Replace(Node::with_children(Kind::RuleComp, vec![name.clone(), compr]))
        }))
        .with_rule(Rule::new("lower-rule-obj", Kind::RuleObj, |node| {
            let (Some(name), Some(key_var), Some(val_var), Some(body)) =
                (node.child(0), node.child(1), node.child(2), node.child(3))
            else {
                return RewriteOutcome::NoChange;
            };
            let compr = Node::with_children(
                Kind::ObjectCompr,
                vec![
                    Node::with_children(Kind::Expr, vec![key_var.clone()]),
                    Node::with_children(Kind::Expr, vec![val_var.clone()]),
                    body.clone(),
                ],
            );
            RewriteOutcome::Replace(Node::with_children(Kind::RuleComp, vec![name.clone(), compr]))
        }))
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
