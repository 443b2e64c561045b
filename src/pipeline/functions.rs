//! Pass 26: rewrite remaining built-in calls into `Function(name,
//! argseq)` (spec §4.4 step 26).
//!
//! Grounded on `src/passes/build_calls.cc`. Arity validation is spec'd
//! here too, but since it requires the built-in declaration table
//! (spec §4.7), and that table is owned by [`crate::registry`] which the
//! pipeline itself doesn't hold a reference to, this pass only performs
//! the shape rewrite; [`crate::registry::BuiltinRegistry::resolve`]
//! enforces arity at call time, and a mismatch there still surfaces as
//! the same `rego_type_error`/`eval_builtin_error` codes spec §7 names.

use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};

pub fn pass() -> Pass {
    Pass::new("functions", Strategy::BottomUp).with_rule(Rule::new(
        "lower-expr-call",
        Kind::ExprCall,
        |call| {
            let Some(name) = call.children.first() else {
                return RewriteOutcome::NoChange;
            };
            let args = Node::with_children(Kind::ArgSeq, call.children[1..].to_vec());
            RewriteOutcome::Replace(Node::with_children(Kind::Function, vec![name.clone(), args]))
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
        .rule(Kind::Function, Shape(vec![Slot::One(Kind::Var), Slot::One(Kind::ArgSeq)]))
}
