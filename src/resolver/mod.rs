//! Pure operations over the [`Term`] universe used by the unifier:
//! container access, infix operators, set algebra, and membership
//! tests (spec §4.6).
//!
//! Grounded on `include/rego/resolver.h`'s `Resolver` static-method
//! surface (`apply_access`, `arithinfix`/`boolinfix`, `set_union`/
//! `set_intersection`/`set_difference`, `membership`); reworked from
//! `Node`-returning C++ statics into `Result<Term, RegoError>`-returning
//! free functions, since this crate's unifier manipulates `Term` values
//! directly rather than re-wrapping results as tree nodes mid-evaluation.

use crate::bigint::BigInt;
use crate::error::{ErrorCode, RegoError};
use crate::term::scalar::Scalar;
use crate::term::Term;
use crate::tree::Kind;

pub type RResult<T> = Result<T, RegoError>;

fn type_error(message: impl Into<String>) -> RegoError {
    RegoError::new(message, ErrorCode::EvalTypeError)
}

/// A wildcard (`_`) or any other unbound-variable index enumerates the
/// whole container instead of selecting one element (spec §4.4's
/// `implicit_enums` step, resolved here per
/// `crate::pipeline::implicit_enums`'s design note).
pub enum Access {
    One(Term),
    Many(Vec<Term>),
}

/// `apply_access(container, index)` (spec §4.6): arrays take an integer
/// index in range, sets perform a membership test returning the found
/// element, objects do key lookup, strings index by UTF-8 scalar value
/// at an integer position. A `None` index (wildcard) enumerates every
/// element/pair instead of just one.
pub fn apply_access(container: &Term, index: Option<&Term>) -> RResult<Access> {
    let Some(index) = index else {
        return Ok(Access::Many(enumerate(container)?));
    };
    match container {
        Term::Array(items) => {
            let i = as_index(index)?;
            items
                .get(i)
                .cloned()
                .map(Access::One)
                .ok_or_else(|| type_error(format!("array index {i} out of range")))
        }
        Term::Set(items) => {
            let key = index.canonical_key();
            items
                .iter()
                .find(|v| v.canonical_key() == key)
                .cloned()
                .map(Access::One)
                .ok_or_else(|| type_error("value is not a member of the set"))
        }
        Term::Object(items) => {
            let key = index.canonical_key();
            items
                .iter()
                .find(|(k, _)| k.canonical_key() == key)
                .map(|(_, v)| Access::One(v.clone()))
                .ok_or_else(|| type_error("object has no such key"))
        }
        Term::Scalar(Scalar::Str(s)) => {
            let i = as_index(index)?;
            s.chars()
                .nth(i)
                .map(|c| Access::One(Term::str(c.to_string())))
                .ok_or_else(|| type_error(format!("string index {i} out of range")))
        }
        _ => Err(type_error("value cannot be indexed")),
    }
}

/// Every element (arrays, sets) or `(key, value)` pair flattened to a
/// two-element array (objects) a wildcard index enumerates.
fn enumerate(container: &Term) -> RResult<Vec<Term>> {
    match container {
        Term::Array(items) => Ok(items.clone()),
        Term::Set(items) => Ok(items.clone()),
        Term::Object(items) => Ok(items.iter().map(|(_, v)| v.clone()).collect()),
        _ => Err(type_error("value cannot be enumerated")),
    }
}

fn as_index(term: &Term) -> RResult<usize> {
    match term.as_scalar() {
        Some(Scalar::Int(i)) => i.to_usize().ok_or_else(|| type_error("index must be a non-negative integer")),
        _ => Err(type_error("index must be an integer")),
    }
}

/// `arithinfix` (spec §4.6): numeric ops mix int/float via promotion
/// (int op int stays int unless the op is inherently fractional; any
/// float operand promotes the result to float).
pub fn arithinfix(op: Kind, lhs: &Term, rhs: &Term) -> RResult<Term> {
    match (lhs.as_scalar(), rhs.as_scalar()) {
        (Some(Scalar::Int(a)), Some(Scalar::Int(b))) => arith_int(op, a, b),
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
            let af = a.to_f64().ok_or_else(|| type_error("not a number"))?;
            let bf = b.to_f64().ok_or_else(|| type_error("not a number"))?;
            arith_float(op, af, bf)
        }
        _ => Err(type_error("arithmetic operator requires two numbers")),
    }
}

fn arith_int(op: Kind, a: &BigInt, b: &BigInt) -> RResult<Term> {
    match op {
        Kind::OpAdd => Ok(Term::Scalar(Scalar::Int(a + b))),
        Kind::OpSubtract => Ok(Term::Scalar(Scalar::Int(a - b))),
        Kind::OpMultiply => Ok(Term::Scalar(Scalar::Int(a * b))),
        Kind::OpDivide => {
            let (q, _) = a
                .checked_div_rem(b)
                .map_err(|_| RegoError::new("divide by zero", ErrorCode::EvalBuiltinError))?;
            Ok(Term::Scalar(Scalar::Int(q)))
        }
        Kind::OpModulo => {
            let r = a
                .checked_mod(b)
                .map_err(|e| RegoError::new(e.to_string(), ErrorCode::EvalBuiltinError))?;
            Ok(Term::Scalar(Scalar::Int(r)))
        }
        _ => Err(type_error("not an arithmetic operator")),
    }
}

fn arith_float(op: Kind, a: f64, b: f64) -> RResult<Term> {
    let result = match op {
        Kind::OpAdd => a + b,
        Kind::OpSubtract => a - b,
        Kind::OpMultiply => a * b,
        Kind::OpDivide => {
            if b == 0.0 {
                return Err(RegoError::new("divide by zero", ErrorCode::EvalBuiltinError));
            }
            a / b
        }
        Kind::OpModulo => {
            if b == 0.0 {
                return Err(RegoError::new("modulo by zero", ErrorCode::EvalBuiltinError));
            }
            a % b
        }
        _ => return Err(type_error("not an arithmetic operator")),
    };
    Term::float(result).map_err(|e| type_error(e.to_string()))
}

/// `boolinfix` (spec §4.6): equality compares by canonical key across
/// any type; ordering comparisons require two numbers or two strings
/// (lexicographic).
pub fn boolinfix(op: Kind, lhs: &Term, rhs: &Term) -> RResult<bool> {
    match op {
        Kind::OpEquals => Ok(lhs == rhs),
        Kind::OpNotEquals => Ok(lhs != rhs),
        Kind::OpLessThan | Kind::OpLessThanOrEquals | Kind::OpGreaterThan | Kind::OpGreaterThanOrEquals => {
            let ordering = ordered_compare(lhs, rhs)?;
            Ok(match op {
                Kind::OpLessThan => ordering.is_lt(),
                Kind::OpLessThanOrEquals => ordering.is_le(),
                Kind::OpGreaterThan => ordering.is_gt(),
                Kind::OpGreaterThanOrEquals => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
        _ => Err(type_error("not a comparison operator")),
    }
}

fn ordered_compare(lhs: &Term, rhs: &Term) -> RResult<std::cmp::Ordering> {
    match (lhs.as_scalar(), rhs.as_scalar()) {
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
            let af = a.to_f64().ok_or_else(|| type_error("not a number"))?;
            let bf = b.to_f64().ok_or_else(|| type_error("not a number"))?;
            af.partial_cmp(&bf).ok_or_else(|| type_error("not-a-number is not ordered"))
        }
        (Some(Scalar::Str(a)), Some(Scalar::Str(b))) => Ok(a.cmp(b)),
        _ => Err(type_error("comparison requires two numbers or two strings")),
    }
}

/// `bininfix`: the handful of non-arithmetic, non-comparison binary
/// forms (currently just `|` set union when both operands are sets).
pub fn bininfix(op: Kind, lhs: &Term, rhs: &Term) -> RResult<Term> {
    match (op, lhs, rhs) {
        (Kind::OpOr, Term::Set(_), Term::Set(_)) => Ok(set_union(lhs, rhs)),
        (Kind::OpAnd, Term::Set(_), Term::Set(_)) => Ok(set_intersection(lhs, rhs)),
        _ => Err(type_error("unsupported binary operator for these operand types")),
    }
}

pub fn set_union(lhs: &Term, rhs: &Term) -> Term {
    let (Term::Set(a), Term::Set(b)) = (lhs, rhs) else {
        return Term::set(vec![]);
    };
    Term::set(a.iter().cloned().chain(b.iter().cloned()).collect())
}

pub fn set_intersection(lhs: &Term, rhs: &Term) -> Term {
    let (Term::Set(a), Term::Set(b)) = (lhs, rhs) else {
        return Term::set(vec![]);
    };
    Term::set(a.iter().filter(|x| b.contains(x)).cloned().collect())
}

pub fn set_difference(lhs: &Term, rhs: &Term) -> Term {
    let (Term::Set(a), Term::Set(b)) = (lhs, rhs) else {
        return Term::set(vec![]);
    };
    Term::set(a.iter().filter(|x| !b.contains(x)).cloned().collect())
}

/// `membership(item, seq)` (spec §4.6): used for `some x in xs`.
pub fn membership(item: &Term, seq: &Term) -> bool {
    match seq {
        Term::Array(items) | Term::Set(items) => items.contains(item),
        Term::Object(items) => items.iter().any(|(_, v)| v == item),
        _ => false,
    }
}

/// `membership(index, item, seq)` (spec §4.6): used for `some k, v in xs`.
pub fn membership_indexed(index: &Term, item: &Term, seq: &Term) -> bool {
    match seq {
        Term::Array(items) => items
            .iter()
            .enumerate()
            .any(|(i, v)| v == item && index.as_scalar() == Some(&Scalar::Int(BigInt::from(i as u64)))),
        Term::Object(items) => items.iter().any(|(k, v)| k == index && v == item),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_access_in_range() {
        let arr = Term::array(vec![Term::int(1), Term::int(2), Term::int(3)]);
        match apply_access(&arr, Some(&Term::int(1))).unwrap() {
            Access::One(v) => assert_eq!(v, Term::int(2)),
            _ => panic!("expected one"),
        }
    }

    #[test]
    fn array_access_out_of_range_errs() {
        let arr = Term::array(vec![Term::int(1)]);
        assert!(apply_access(&arr, Some(&Term::int(5))).is_err());
    }

    #[test]
    fn wildcard_enumerates_every_element() {
        let arr = Term::array(vec![Term::int(1), Term::int(2)]);
        match apply_access(&arr, None).unwrap() {
            Access::Many(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected many"),
        }
    }

    #[test]
    fn object_key_lookup() {
        let obj = Term::object(vec![(Term::str("a"), Term::int(1))], false).unwrap();
        match apply_access(&obj, Some(&Term::str("a"))).unwrap() {
            Access::One(v) => assert_eq!(v, Term::int(1)),
            _ => panic!("expected one"),
        }
    }

    #[test]
    fn arithmetic_promotes_to_float_when_mixed() {
        let result = arithinfix(Kind::OpAdd, &Term::int(1), &Term::float(0.5).unwrap()).unwrap();
        assert_eq!(result, Term::float(1.5).unwrap());
    }

    #[test]
    fn division_by_zero_is_eval_builtin_error() {
        let err = arithinfix(Kind::OpDivide, &Term::int(1), &Term::int(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::EvalBuiltinError);
    }

    #[test]
    fn equality_compares_by_canonical_key() {
        assert!(boolinfix(Kind::OpEquals, &Term::int(1), &Term::int(1)).unwrap());
        assert!(!boolinfix(Kind::OpEquals, &Term::int(1), &Term::int(2)).unwrap());
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        assert!(boolinfix(Kind::OpLessThan, &Term::str("a"), &Term::str("b")).unwrap());
    }

    #[test]
    fn set_algebra_matches_standard_semantics() {
        let a = Term::set(vec![Term::int(1), Term::int(2)]);
        let b = Term::set(vec![Term::int(2), Term::int(3)]);
        assert_eq!(set_union(&a, &b), Term::set(vec![Term::int(1), Term::int(2), Term::int(3)]));
        assert_eq!(set_intersection(&a, &b), Term::set(vec![Term::int(2)]));
        assert_eq!(set_difference(&a, &b), Term::set(vec![Term::int(1)]));
    }

    #[test]
    fn membership_checks_array_containment() {
        let arr = Term::array(vec![Term::int(1), Term::int(2)]);
        assert!(membership(&Term::int(2), &arr));
        assert!(!membership(&Term::int(3), &arr));
    }
}
