//! Pass 25: lift every enumeration, comprehension, and `every`
//! expression living inside a data module into a synthesized rule
//! (spec §4.4 step 25).
//!
//! Grounded on `src/passes/lift_to_rule.cc`. Comprehensions in this
//! crate are solved in place by the unifier at the point they're
//! encountered ([`crate::unify`]'s `UnifyExprCompr` handling, spec
//! §4.5 step 3) rather than being hoisted into a freestanding rule and
//! re-entered through `ExprCall` -- an optimization for call-site reuse
//! and rule-body visibility in the source's multi-query-per-interpreter
//! model, which this crate's single-shot `Interpreter::query` doesn't
//! need. This pass stays a validation no-op; the output-binding
//! semantics (input-captured variables become call arguments,
//! output-captured variables become a projected object) are unaffected
//! since there's only ever one evaluation site per comprehension here.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("lift_to_rule", Strategy::TopDown)
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
