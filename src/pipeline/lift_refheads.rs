//! Pass 4: for a rule whose head reference path has multiple segments
//! (`pkg.a.b.ruleName { ... }`), relocate it into a submodule `pkg.a.b`
//! under the name `ruleName` (spec §4.4 step 4).
//!
//! Grounded on `src/passes/lift_refheads.cc`. Our parser only ever
//! produces single-segment rule heads (`ruleName { ... }`) nested under
//! the module's own `Package` -- multi-segment heads are a surface-syntax
//! sugar our minimal front-end does not emit -- so this pass is a
//! structural no-op here; it is kept as its own named stage (rather than
//! folded into `symbols`) so the schema it establishes (every rule head
//! in `Policy` is a bare `Var`) is checked independently, matching the
//! narrowed-coverage decision in SPEC_FULL.md §4.4.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("lift_refheads", Strategy::TopDown)
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
        .rule(Kind::ModuleSeq, Shape(vec![Slot::Repeat(Kind::Module)]))
        .rule(Kind::Module, Shape(vec![Slot::One(Kind::Package), Slot::One(Kind::Policy)]))
}
