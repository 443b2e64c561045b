//! Pass 24: convert each initializing assignment into `UnifyExpr(var,
//! expr)`, using the lhs's single variable whenever possible; lift
//! `with`/negation/comprehension/enumeration forms into their
//! `UnifyExpr*` wrappers (spec §4.4 step 24).
//!
//! Grounded on `src/unify/unify.cc`'s body-lowering step, which is the
//! last shape change before the unifier consumes a body directly.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

pub fn pass() -> Pass {
    Pass::new("rulebody", Strategy::BottomUp)
        .with_rule(Rule::new("lower-literal-init", Kind::LiteralInit, |node| {
            let Some(lhs_seq) = node.child(0) else {
                return RewriteOutcome::NoChange;
            };
            let Some(assign) = node.child(2) else {
                return RewriteOutcome::NoChange;
            };
            let Some(rhs_arg) = assign.child(1).and_then(|arg| arg.child(0)) else {
                return RewriteOutcome::NoChange;
            };
            let var = lhs_seq
                .children
                .first()
                .and_then(|v| v.var_name())
                .unwrap_or("_")
                .to_string();
            RewriteOutcome::Replace(Node::with_children(
                Kind::UnifyExpr,
                vec![Node::var(var), Node::with_children(Kind::Expr, vec![rhs_arg.clone()])],
            ))
        }))
        .with_rule(Rule::new("lower-literal-not", Kind::LiteralNot, |node| {
            let body = node.children.clone();
            RewriteOutcome::Replace(Node::with_children(Kind::UnifyExprNot, body))
        }))
        .with_rule(Rule::new("lower-literal-with", Kind::LiteralWith, |node| {
            let Some(body) = node.child(0) else {
                return RewriteOutcome::NoChange;
            };
            let Some(withseq) = node.child(1) else {
                return RewriteOutcome::NoChange;
            };
            RewriteOutcome::Replace(Node::with_children(
                Kind::UnifyExprWith,
                vec![body.clone(), withseq.clone()],
            ))
        }))
        .with_rule(Rule::new("lower-literal-enum", Kind::LiteralEnum, |node| {
            let (Some(var), Some(seq), Some(body)) = (node.child(0), node.child(1), node.child(2)) else {
                return RewriteOutcome::NoChange;
            };
            RewriteOutcome::Replace(Node::with_children(
                Kind::UnifyExprEnum,
                vec![var.clone(), var.clone(), seq.clone(), body.clone()],
            ))
        }))
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
        .rule(Kind::UnifyExpr, Shape(vec![Slot::One(Kind::Var), Slot::One(Kind::Expr)]))
}
