//! Exact constant values and their working-precision projections.
//!
//! Every numeric literal embedded in an expression graph keeps a symbolic,
//! precision-agnostic representation. The compiler stores these alongside
//! the memory slot they occupy; the program projects them into the machine
//! bank once and into the arbitrary-precision bank on every precision
//! change. Projection is the only lossy step.

use std::fmt;

use num_complex::Complex64;
use rug::{Complex, Float, Integer, Rational};

/// Converts a count of decimal digits into mpfr bits, with a small guard.
pub(crate) fn digits_to_bits(digits: u32) -> u32 {
    (digits as f64 * std::f64::consts::LOG2_10).ceil() as u32 + 8
}

/// The exact value of an embedded constant.
///
/// Carries enough information to produce a working-precision scalar at any
/// requested precision.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicValue {
    Integer(Integer),
    Rational(Rational),
    /// An arbitrary-precision real, kept at the precision it was created with.
    Real(Float),
    /// An arbitrary-precision complex, kept at the precision it was created with.
    Complex(Complex),
}

impl SymbolicValue {
    /// Projects into the machine-precision bank.
    pub fn to_dbl(&self) -> Complex64 {
        match self {
            SymbolicValue::Integer(v) => Complex64::new(v.to_f64(), 0.0),
            SymbolicValue::Rational(v) => Complex64::new(v.to_f64(), 0.0),
            SymbolicValue::Real(v) => Complex64::new(v.to_f64(), 0.0),
            SymbolicValue::Complex(v) => Complex64::new(v.real().to_f64(), v.imag().to_f64()),
        }
    }

    /// Projects into the arbitrary-precision bank at the given precision.
    pub fn to_mp(&self, prec_bits: u32) -> Complex {
        match self {
            SymbolicValue::Integer(v) => Complex::with_val(prec_bits, v),
            SymbolicValue::Rational(v) => Complex::with_val(prec_bits, v),
            SymbolicValue::Real(v) => Complex::with_val(prec_bits, v),
            SymbolicValue::Complex(v) => Complex::with_val(prec_bits, v),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            SymbolicValue::Integer(v) => *v == 0,
            SymbolicValue::Rational(v) => *v == 0,
            SymbolicValue::Real(v) => v.is_zero(),
            SymbolicValue::Complex(v) => v.real().is_zero() && v.imag().is_zero(),
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            SymbolicValue::Integer(v) => *v == 1,
            SymbolicValue::Rational(v) => *v == 1,
            SymbolicValue::Real(v) => *v == 1,
            SymbolicValue::Complex(v) => *v.real() == 1 && v.imag().is_zero(),
        }
    }
}

impl fmt::Display for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicValue::Integer(v) => write!(f, "{}", v),
            SymbolicValue::Rational(v) => write!(f, "{}", v),
            SymbolicValue::Real(v) => write!(f, "{}", v),
            SymbolicValue::Complex(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_projection() {
        let v = SymbolicValue::Integer(Integer::from(-3));
        assert_eq!(v.to_dbl(), Complex64::new(-3.0, 0.0));
        let mp = v.to_mp(128);
        assert_eq!(*mp.real(), -3);
        assert!(mp.imag().is_zero());
    }

    #[test]
    fn test_rational_projection() {
        let v = SymbolicValue::Rational(Rational::from((1, 4)));
        assert_eq!(v.to_dbl(), Complex64::new(0.25, 0.0));
        assert_eq!(*v.to_mp(64).real(), 0.25);
    }

    #[test]
    fn test_rational_survives_precision_change() {
        // 1/3 is inexact at every finite precision; the projection must be
        // computed from the exact value each time, not from a prior rounding.
        let v = SymbolicValue::Rational(Rational::from((1, 3)));
        let coarse = v.to_mp(digits_to_bits(50));
        let fine = v.to_mp(digits_to_bits(200));
        assert_ne!(coarse, fine);
        assert_eq!(coarse, v.to_mp(digits_to_bits(50)));
    }

    #[test]
    fn test_zero_and_one_predicates() {
        assert!(SymbolicValue::Integer(Integer::from(0)).is_zero());
        assert!(SymbolicValue::Integer(Integer::from(1)).is_one());
        assert!(SymbolicValue::Rational(Rational::from((0, 5))).is_zero());
        assert!(!SymbolicValue::Real(Float::with_val(53, 0.5)).is_one());
        assert!(SymbolicValue::Complex(Complex::with_val(53, (1.0, 0.0))).is_one());
        assert!(!SymbolicValue::Complex(Complex::with_val(53, (1.0, 2.0))).is_one());
    }

    #[test]
    fn test_digits_to_bits_is_monotone() {
        assert!(digits_to_bits(50) < digits_to_bits(200));
        // 16 digits needs at least the 53 bits of a double
        assert!(digits_to_bits(16) >= 53);
    }
}
