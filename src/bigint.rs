//! Arbitrary-precision signed decimal integers.
//!
//! Grounded on the source-backed `BigInt` of rego-cpp (`include/rego/bigint.h`),
//! but built on `num_bigint::BigInt` rather than reimplementing string
//! arithmetic over `Location` views, since we do not share Trieste's
//! source-as-storage model.

use num::bigint::Sign;
use num_bigint::BigInt as NumBigInt;
use num_traits::{Num, ToPrimitive, Zero};
use std::fmt::Display;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BigIntError {
    ParseError(String),
    DivideByZero,
}

impl Display for BigIntError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BigIntError::ParseError(s) => write!(f, "invalid integer literal: {s}"),
            BigIntError::DivideByZero => write!(f, "divide by zero"),
        }
    }
}

impl std::error::Error for BigIntError {}

/// An arbitrary-precision signed integer. Canonical form is `"0"` or
/// digits without a leading zero, optionally preceded by `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigInt(NumBigInt);

impl BigInt {
    pub fn zero() -> Self {
        BigInt(NumBigInt::zero())
    }

    pub fn one() -> Self {
        BigInt(NumBigInt::from(1))
    }

    pub fn from_str_radix(s: &str, radix: u32) -> Result<Self, BigIntError> {
        let cleaned: String = s.chars().filter(|c| *c != '_').collect();
        NumBigInt::from_str_radix(&cleaned, radix)
            .map(BigInt)
            .map_err(|_| BigIntError::ParseError(s.to_string()))
    }

    pub fn is_int(s: &str) -> bool {
        let cleaned = s.strip_prefix('-').unwrap_or(s);
        !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn increment(&self) -> Self {
        BigInt(&self.0 + 1)
    }

    pub fn decrement(&self) -> Self {
        BigInt(&self.0 - 1)
    }

    pub fn negate(&self) -> Self {
        BigInt(-self.0.clone())
    }

    /// Fails rather than truncating; overflow is reported by the caller.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.0.to_f64()
    }

    /// Negative or overflowing values yield `None`, matching the source's
    /// `to_size` contract (used for array/string indexing).
    pub fn to_usize(&self) -> Option<usize> {
        if self.is_negative() {
            return None;
        }
        self.0.to_usize()
    }

    pub fn checked_div_rem(&self, rhs: &Self) -> Result<(Self, Self), BigIntError> {
        if rhs.0.is_zero() {
            return Err(BigIntError::DivideByZero);
        }
        let q = &self.0 / &rhs.0;
        let r = &self.0 % &rhs.0;
        Ok((BigInt(q), BigInt(r)))
    }

    pub fn checked_mod(&self, rhs: &Self) -> Result<Self, BigIntError> {
        if rhs.0.is_zero() {
            return Err(BigIntError::DivideByZero);
        }
        Ok(BigInt(&self.0 % &rhs.0))
    }
}

impl FromStr for BigInt {
    type Err = BigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumBigInt::from_str(s)
            .map(BigInt)
            .map_err(|_| BigIntError::ParseError(s.to_string()))
    }
}

impl Display for BigInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BigInt {
                fn from(value: $t) -> Self {
                    BigInt(NumBigInt::from(value))
                }
            }
        )*
    };
}
impl_from_int!(i8, u8, i16, u16, i32, u32, i64, u64, i128, u128, isize, usize);

impl Neg for BigInt {
    type Output = Self;
    fn neg(self) -> Self::Output {
        BigInt(-self.0)
    }
}

impl Add for &BigInt {
    type Output = BigInt;
    fn add(self, rhs: Self) -> Self::Output {
        BigInt(&self.0 + &rhs.0)
    }
}

impl Sub for &BigInt {
    type Output = BigInt;
    fn sub(self, rhs: Self) -> Self::Output {
        BigInt(&self.0 - &rhs.0)
    }
}

impl Mul for &BigInt {
    type Output = BigInt;
    fn mul(self, rhs: Self) -> Self::Output {
        BigInt(&self.0 * &rhs.0)
    }
}

/// Integer division; truncates toward zero like most languages in the
/// Rego family. Panics on division by zero -- callers that can observe a
/// zero divisor (the `div` built-in) must check first via
/// [`BigInt::checked_div_rem`].
impl Div for &BigInt {
    type Output = BigInt;
    fn div(self, rhs: Self) -> Self::Output {
        BigInt(&self.0 / &rhs.0)
    }
}

impl Rem for &BigInt {
    type Output = BigInt;
    fn rem(self, rhs: Self) -> Self::Output {
        BigInt(&self.0 % &rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_is_arbitrary_precision() {
        let a = BigInt::from_str("123456789012345678901234567890").unwrap();
        let b = BigInt::from_str("1").unwrap();
        assert_eq!((&a + &b).to_string(), "123456789012345678901234567891");
    }

    #[test]
    fn negative_formatting() {
        let a = BigInt::from_str("-12345").unwrap();
        assert_eq!(a.to_string(), "-12345");
        assert!(a.is_negative());
    }

    #[test]
    fn zero_is_canonical() {
        assert_eq!(BigInt::zero().to_string(), "0");
        assert!(!BigInt::zero().is_negative());
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let a = BigInt::from(10);
        let z = BigInt::zero();
        assert_eq!(a.checked_div_rem(&z), Err(BigIntError::DivideByZero));
    }

    #[test]
    fn to_usize_rejects_negative() {
        assert_eq!(BigInt::from(-1i64).to_usize(), None);
        assert_eq!(BigInt::from(5u64).to_usize(), Some(5));
    }
}
