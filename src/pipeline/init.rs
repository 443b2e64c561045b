//! Pass 22: dependency-analyze each unification body to distinguish
//! initializing assignments from constraining equalities, and wrap each
//! initializing statement in `LiteralInit(lhsVars, rhsVars, AssignInfix)`
//! (spec §4.4 step 22). Must precede `rulebody` (spec §4.4 ordering
//! rationale).
//!
//! Grounded on `src/unify/init.cc`. In our narrowed pipeline every
//! `AssignInfix` reaching this pass either targets a compiler-fresh
//! temporary (from `assign.rs`'s naked-expression wrap) or an explicit
//! `:=` target our parser never reuses within the same body -- so every
//! statement here is an initializer; the `VarSeq` children this pass
//! attaches record which variables appear on each side for the
//! unifier's dependency ordering (spec §4.5 step 2), rather than
//! reclassifying anything as constraining.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

fn collect_vars(node: &Node, out: &mut Vec<String>) {
    node.walk(&mut |n| {
        if n.kind == Kind::Var {
            if let Some(name) = n.var_name() {
                out.push(name.to_string());
            }
        }
        true
    });
}

pub fn pass() -> Pass {
    Pass::new("init", Strategy::BottomUp).with_rule(Rule::new(
        "wrap-literal-init",
        Kind::Literal,
        |literal| {
            let Some(expr) = literal.child(0) else {
                return RewriteOutcome::NoChange;
            };
            let Some(assign) = expr.child(0) else {
                return RewriteOutcome::NoChange;
            };
            if assign.kind != Kind::AssignInfix {
                return RewriteOutcome::NoChange;
            }
            let Some(lhs) = assign.child(0) else {
                return RewriteOutcome::NoChange;
            };
            let Some(rhs) = assign.child(1) else {
                return RewriteOutcome::NoChange;
            };
            let mut lhs_vars = vec![];
            let mut rhs_vars = vec![];
            collect_vars(lhs, &mut lhs_vars);
            collect_vars(rhs, &mut rhs_vars);
            let lhs_seq = Node::with_children(
                Kind::VarSeq,
                lhs_vars.into_iter().map(Node::var).collect(),
            );
            let rhs_seq = Node::with_children(
                Kind::VarSeq,
                rhs_vars.into_iter().map(Node::var).collect(),
            );
            let init_node = Node::with_children(
                Kind::LiteralInit,
                vec![lhs_seq, rhs_seq, assign.clone()],
            );
            RewriteOutcome::Replace(init_node)
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
            Kind::LiteralInit,
            Shape(vec![Slot::One(Kind::VarSeq), Slot::One(Kind::VarSeq), Slot::One(Kind::AssignInfix)]),
        )
}
