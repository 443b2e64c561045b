//! Pass 3: detect rule heads whose reference path contains a variable
//! component and rewrite them as comprehension-producing rules, so later
//! stages only ever see scalar-keyed heads (spec §4.4 step 3).
//!
//! Grounded on `src/passes/structure.cc`'s head-shape normalization. Our
//! parser (`src/parser`) only emits scalar rule heads (a plain
//! identifier, optionally with a bracketed set/object key built from a
//! `UnifyBody`-scoped variable already handled by `rules_to_compr`) --
//! variable components directly in the head path itself
//! (`p.a[x].b { ... }`) are surface sugar it does not produce. This pass
//! is kept as its own stage, enforcing the scalar-head schema, per the
//! narrowed-coverage decision in SPEC_FULL.md §4.4.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("varrefheads", Strategy::TopDown)
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
