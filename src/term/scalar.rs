//! Scalar terms: int, float, string, bool, null.
//!
//! Grounded on `CoreValue`'s scalar variants
//! (`values/core_value.rs` in the teacher crate) and on the `Scalar` grammar
//! node of the source spec (`wf.h`: `Scalar <<= JSONString | Int | Float | True | False | Null`).

use crate::bigint::BigInt;
use ordered_float::OrderedFloat;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scalar {
    Int(BigInt),
    /// Stored as `OrderedFloat` so floats can sit in canonical-key-ordered
    /// sets/maps; `NaN`/`Inf` are rejected at construction (see [`Scalar::float`]).
    Float(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidFloatError;

impl Display for InvalidFloatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NaN and Inf are not valid Rego number literals")
    }
}
impl std::error::Error for InvalidFloatError {}

impl Scalar {
    pub fn int<T: Into<BigInt>>(value: T) -> Self {
        Scalar::Int(value.into())
    }

    /// Rejects `NaN`/`Inf`, matching the spec's construction-time check.
    pub fn float(value: f64) -> Result<Self, InvalidFloatError> {
        if value.is_nan() || value.is_infinite() {
            return Err(InvalidFloatError);
        }
        Ok(Scalar::Float(OrderedFloat(value)))
    }

    pub fn str<T: Into<String>>(value: T) -> Self {
        Scalar::Str(value.into())
    }

    pub fn bool(value: bool) -> Self {
        Scalar::Bool(value)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Scalar::Bool(false))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => i.to_f64(),
            Scalar::Float(f) => Some(f.0),
            _ => None,
        }
    }

    /// Canonical key fragment for this scalar; see [`crate::term::key::canonical_key`].
    pub fn canonical_key(&self) -> String {
        match self {
            Scalar::Int(i) => format!("n:{i}"),
            Scalar::Float(f) => format!("n:{}", format_float(f.0)),
            Scalar::Str(s) => format!("s:{}", escape_json_string(s)),
            Scalar::Bool(b) => format!("b:{b}"),
            Scalar::Null => "null".to_string(),
        }
    }
}

/// Renders a float the way the canonical key wants it: shortest
/// round-trippable decimal, without forcing a trailing `.0` for exact
/// integral floats (so `1.0` and integer `1` remain distinguishable
/// through their `n:` prefix, but share ordering within the Float family).
fn format_float(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn escape_json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"))
}

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{}", format_float(v.0)),
            Scalar::Str(s) => write!(f, "{}", escape_json_string(s)),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}
impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}
impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

macro_rules! impl_scalar_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Scalar {
                fn from(value: $t) -> Self {
                    Scalar::Int(BigInt::from(value))
                }
            }
        )*
    };
}
impl_scalar_from_int!(i8, u8, i16, u16, i32, u32, i64, u64, i128, u128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_rejected() {
        assert!(Scalar::float(f64::NAN).is_err());
        assert!(Scalar::float(f64::INFINITY).is_err());
    }

    #[test]
    fn canonical_key_distinguishes_kinds() {
        assert_ne!(
            Scalar::bool(true).canonical_key(),
            Scalar::str("true").canonical_key()
        );
    }
}
