//! Pass 6: rewrite function-arg value patterns (`f(1,x) := …`) into
//! arg-variable form plus equality checks (`f(a,b) := …; a==1`)
//! (spec §4.4 step 6).
//!
//! Grounded on `src/passes/structure.cc`. Our parser requires function
//! rule arguments to already be bare variables (a narrowed surface
//! grammar, documented in DESIGN.md), so there are no value patterns for
//! this pass to rewrite in practice; it still enforces the arg-seq shape
//! `RuleFunc` depends on.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("replace_argvals", Strategy::TopDown)
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
