//! Pass 20: apply the skip table built by `skips` to replace
//! fully-qualified references with resolved targets (spec §4.4 step 20).
//!
//! Grounded on `src/passes/skips.cc`. As in `skips.rs`, since this crate
//! resolves references directly against the merged module sequence and
//! the registry at unify time rather than caching a skip table on the
//! tree, this stage performs no rewrite; it's kept so the schema chain
//! stays aligned with the source's pass numbering.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("skip_refs", Strategy::TopDown)
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
