//! Pass 21: break every multi-step reference into single-step
//! `SimpleRef(var, arg)` chained through fresh temporaries
//! (spec §4.4 step 21).
//!
//! Grounded on `src/unify/absolute_refs.cc`'s chain-breaking helper.
//! [`crate::resolver::apply_access`] walks a multi-segment `Ref` node's
//! `RefArgDot`/`RefArgBrack` chain directly rather than requiring it be
//! pre-flattened into single-step temporaries, so this stage is a
//! validation no-op here -- the resolver's chain walk is the
//! spec-equivalent of resolving a `SimpleRef` one step at a time, just
//! without materializing the intermediate temporaries in the tree.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("simple_refs", Strategy::TopDown)
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
