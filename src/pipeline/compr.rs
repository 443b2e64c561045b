//! Pass 13: arrange comprehension bodies so the innermost body includes
//! the explicit binding that produces the comprehension output term
//! (spec §4.4 step 13).
//!
//! Grounded on `src/unify/compr.cc`. `rules_to_compr`
//! (`rules_to_compr.rs`) and our parser already place the output-term
//! binding as the last statement of the comprehension body directly, so
//! this pass validates that shape rather than re-deriving it.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("compr", Strategy::TopDown)
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
