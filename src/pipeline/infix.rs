//! Pass 18: parenthesize and group expression trees into fully
//! parenthesized binary operator triples (spec §4.4 step 18).
//!
//! Grounded on `src/passes/structure.cc`'s operator-precedence grouping.
//! Our parser (`src/parser`) already builds `ArithInfix`/`BoolInfix`/
//! `BinInfix` nodes bottom-up with explicit precedence climbing, so the
//! tree arriving here is already in fully-grouped binary-triple form;
//! this pass validates that shape (every infix node has exactly two
//! operand children plus its operator leaf) rather than re-deriving it
//! from a flat token sequence.

use crate::rewriter::{Pass, Strategy};
use crate::tree::wf::{Schema, Shape, Slot};
use crate::tree::Kind;

pub fn pass() -> Pass {
    Pass::new("infix", Strategy::TopDown)
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
        .rule(
            Kind::ArithInfix,
            Shape(vec![
                Slot::OneOf(vec![
                    Kind::OpAdd,
                    Kind::OpSubtract,
                    Kind::OpMultiply,
                    Kind::OpDivide,
                    Kind::OpModulo,
                ]),
                Slot::One(Kind::Expr),
                Slot::One(Kind::Expr),
            ]),
        )
        .rule(
            Kind::BoolInfix,
            Shape(vec![
                Slot::OneOf(vec![
                    Kind::OpEquals,
                    Kind::OpNotEquals,
                    Kind::OpLessThan,
                    Kind::OpLessThanOrEquals,
                    Kind::OpGreaterThan,
                    Kind::OpGreaterThanOrEquals,
                ]),
                Slot::One(Kind::Expr),
                Slot::One(Kind::Expr),
            ]),
        )
}
