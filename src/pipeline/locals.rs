//! Passes 11 (`body_locals` / `value_locals` / `compr_locals`): introduce
//! fresh Locals for anonymous intermediate expressions whose value must
//! be named, and ensure built-in call arguments are simple variables
//! (spec §4.4 step 11).
//!
//! Grounded on `src/unify/absolute_refs.cc`/`src/unify/compr.cc`'s
//! temporary-introduction helpers (the source calls these `AddArgVars`
//! style rewrites throughout the `unify/` stage files). Folded into one
//! module and one pass here since our narrowed pipeline (SPEC_FULL.md
//! §4.4) only needs to name nested call arguments, not every anonymous
//! comprehension-internal value -- comprehension bodies are named by
//! `compr` at the point they're built instead (see `functions.rs`).

use crate::pipeline::fresh_temp;
use crate::rewriter::{Pass, RewriteOutcome, Rule, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::{Kind, Node};
use std::cell::RefCell;

pub fn body_locals_pass() -> Pass {
    let counter = RefCell::new(0usize);
    Pass::new("body_locals", Strategy::BottomUp).with_rule(Rule::new(
        "name-nested-call-args",
        Kind::ExprCall,
        move |call| {
            let mut changed = false;
            let mut new_children = vec![call.children[0].clone()];
            let mut lifted_locals = vec![];
            for arg in &call.children[1..] {
                if arg.kind == Kind::ExprCall {
                    let mut c = counter.borrow_mut();
                    let name = fresh_temp(&mut c, "arg");
                    lifted_locals.push(Node::with_children(
                        Kind::Local,
                        vec![Node::var(name.clone()), arg.clone()],
                    ));
                    new_children.push(Node::var(name));
                    changed = true;
                } else {
                    new_children.push(arg.clone());
                }
            }
            if !changed {
                return RewriteOutcome::NoChange;
            }
            let replacement = Node::with_children(Kind::ExprCall, new_children);
            if let Some(local) = lifted_locals.into_iter().next() {
                RewriteOutcome::Lift {
                    replacement,
                    lifted: local,
                    target: Kind::UnifyBody,
                }
            } else {
                RewriteOutcome::Replace(replacement)
            }
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
