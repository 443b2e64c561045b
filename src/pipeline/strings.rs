//! Pass 1: canonicalize raw-string literals to their escaped form.
//!
//! Grounded on the `strings` stage implied by `unify.hh`'s pass table and
//! `include/rego/utils.h`'s escape helpers. Our parser (§3 of
//! SPEC_FULL.md) always emits the escaped form directly, so this pass is
//! a validation no-op in practice: it exists, runs first, and enforces
//! the root shape every later pass assumes, but performs no rewrite.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("strings", Strategy::TopDown)
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
