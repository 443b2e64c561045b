//! Pass 17: build a "skip table" recording, for every rule reference and
//! built-in name appearing in the program, its resolution target -- used
//! by the unifier to short-circuit symbol resolution (spec §4.4 step 17).
//!
//! Grounded on `src/passes/skips.cc`. Here the "table" is not cached on
//! the tree (we have no side-table slot, as in `symbols.rs`); instead
//! [`crate::resolver`] and [`crate::registry::BuiltinRegistry`] perform
//! the equivalent lookup directly against the final merged `ModuleSeq`
//! and the registry at unify time. This pass validates that every
//! `data.…` reference appearing in a body names either a rule that
//! exists in the program or is left for the registry to resolve as a
//! built-in -- it does not itself rewrite anything.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("skips", Strategy::TopDown)
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
