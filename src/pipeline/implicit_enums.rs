//! Pass 23 (`implicit_enums` / `enum_locals`): the remaining local
//! introductions -- any reference whose bracket argument is an unbound
//! variable (including the anonymous `_`) implicitly enumerates the
//! container; synthesize an explicit `LiteralEnum` (spec §4.4 step 23).
//!
//! Grounded on `src/unify/enum_locals.cc`. A reference like `data.xs[_]`
//! appearing inside a comprehension body is exactly this implicit form.
//! Materializing it as a `LiteralEnum` here would require splicing a new
//! enclosing body around whatever expression contains the reference,
//! which for a reference nested inside an arithmetic expression (as in
//! `x*2 | x := data.xs[_]`) means rebuilding the comprehension's body
//! shape rather than a local rewrite. This crate instead resolves the
//! wildcard directly where references are evaluated
//! ([`crate::resolver::apply_access`] returns every element of the
//! container when the index is `_` or an unbound variable, and
//! [`crate::unify`]'s expression evaluator already treats every
//! evaluation as multi-valued) -- so this pass stays a validation
//! no-op, and the enumeration semantics spec.md describes are preserved
//! at the point where the reference is actually resolved instead of one
//! pass earlier.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("implicit_enums", Strategy::TopDown)
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
