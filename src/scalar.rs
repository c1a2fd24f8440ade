//! Working scalar types and the typed memory banks.
//!
//! The evaluator is generic over a [`Scalar`]: a complex number type with
//! field arithmetic and the principal-branch transcendentals. Two
//! instantiations are provided, machine precision (`num_complex::Complex64`)
//! and arbitrary precision (`rug::Complex`). A compiled program owns one
//! [`Memory`] bank per instantiation; the scalar type selects its bank
//! through the trait, mirroring how the call site picks the working
//! precision.
//!
//! Division by zero and the logarithm of zero follow the scalar's natural
//! semantics: machine precision yields IEEE infinities/NaNs, arbitrary
//! precision reports `EvalError::NumericDomain`.

use std::fmt;

use num_complex::Complex64;
use rug::ops::PowAssign;
use rug::Complex;

use crate::errors::EvalError;

/// The scratch memory of a compiled program: one flat bank per scalar type.
///
/// Both banks share a single layout; slot `i` means the same quantity in
/// either one.
#[derive(Debug, Clone)]
pub struct Memory {
    pub(crate) dbl: Vec<Complex64>,
    pub(crate) mp: Vec<Complex>,
}

impl Memory {
    pub(crate) fn new(len: usize, prec_bits: u32) -> Self {
        Self {
            dbl: vec![Complex64::new(0.0, 0.0); len],
            mp: vec![Complex::new(prec_bits); len],
        }
    }
}

/// A working scalar the evaluator can run over.
///
/// Binary operations take both operands by reference; arbitrary-precision
/// values are not `Copy` and the hot loop must not clone more than the one
/// result it writes. `pow`, `exp`, `log`, and the trigonometric functions
/// use the principal branch.
pub trait Scalar:
    Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// A zero value, used to size output containers before they are filled.
    fn zero() -> Self;

    fn add(a: &Self, b: &Self) -> Self;
    fn sub(a: &Self, b: &Self) -> Self;
    fn mul(a: &Self, b: &Self) -> Self;
    fn div(a: &Self, b: &Self) -> Result<Self, EvalError>;
    fn neg(a: &Self) -> Self;
    fn pow(a: &Self, b: &Self) -> Result<Self, EvalError>;
    fn exp(a: &Self) -> Self;
    fn log(a: &Self) -> Result<Self, EvalError>;
    fn sin(a: &Self) -> Self;
    fn cos(a: &Self) -> Self;
    fn tan(a: &Self) -> Self;
    fn asin(a: &Self) -> Self;
    fn acos(a: &Self) -> Self;
    fn atan(a: &Self) -> Self;

    /// The bank holding this scalar type's slots.
    fn bank(memory: &Memory) -> &[Self];

    /// Mutable access to this scalar type's bank.
    fn bank_mut(memory: &mut Memory) -> &mut [Self];
}

impl Scalar for Complex64 {
    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn add(a: &Self, b: &Self) -> Self {
        a + b
    }

    fn sub(a: &Self, b: &Self) -> Self {
        a - b
    }

    fn mul(a: &Self, b: &Self) -> Self {
        a * b
    }

    fn div(a: &Self, b: &Self) -> Result<Self, EvalError> {
        Ok(a / b)
    }

    fn neg(a: &Self) -> Self {
        -a
    }

    fn pow(a: &Self, b: &Self) -> Result<Self, EvalError> {
        Ok(a.powc(*b))
    }

    fn exp(a: &Self) -> Self {
        a.exp()
    }

    fn log(a: &Self) -> Result<Self, EvalError> {
        Ok(a.ln())
    }

    fn sin(a: &Self) -> Self {
        a.sin()
    }

    fn cos(a: &Self) -> Self {
        a.cos()
    }

    fn tan(a: &Self) -> Self {
        a.tan()
    }

    fn asin(a: &Self) -> Self {
        a.asin()
    }

    fn acos(a: &Self) -> Self {
        a.acos()
    }

    fn atan(a: &Self) -> Self {
        a.atan()
    }

    fn bank(memory: &Memory) -> &[Self] {
        &memory.dbl
    }

    fn bank_mut(memory: &mut Memory) -> &mut [Self] {
        &mut memory.dbl
    }
}

fn mp_is_zero(value: &Complex) -> bool {
    value.real().is_zero() && value.imag().is_zero()
}

impl Scalar for Complex {
    fn zero() -> Self {
        Complex::new(53)
    }

    fn add(a: &Self, b: &Self) -> Self {
        let mut r = a.clone();
        r += b;
        r
    }

    fn sub(a: &Self, b: &Self) -> Self {
        let mut r = a.clone();
        r -= b;
        r
    }

    fn mul(a: &Self, b: &Self) -> Self {
        let mut r = a.clone();
        r *= b;
        r
    }

    fn div(a: &Self, b: &Self) -> Result<Self, EvalError> {
        if mp_is_zero(b) {
            return Err(EvalError::NumericDomain { op: "div" });
        }
        let mut r = a.clone();
        r /= b;
        Ok(r)
    }

    fn neg(a: &Self) -> Self {
        -a.clone()
    }

    fn pow(a: &Self, b: &Self) -> Result<Self, EvalError> {
        if mp_is_zero(a) && b.real().is_sign_negative() {
            return Err(EvalError::NumericDomain { op: "pow" });
        }
        let mut r = a.clone();
        r.pow_assign(b);
        Ok(r)
    }

    fn exp(a: &Self) -> Self {
        a.clone().exp()
    }

    fn log(a: &Self) -> Result<Self, EvalError> {
        if mp_is_zero(a) {
            return Err(EvalError::NumericDomain { op: "log" });
        }
        Ok(a.clone().ln())
    }

    fn sin(a: &Self) -> Self {
        a.clone().sin()
    }

    fn cos(a: &Self) -> Self {
        a.clone().cos()
    }

    fn tan(a: &Self) -> Self {
        a.clone().tan()
    }

    fn asin(a: &Self) -> Self {
        a.clone().asin()
    }

    fn acos(a: &Self) -> Self {
        a.clone().acos()
    }

    fn atan(a: &Self) -> Self {
        a.clone().atan()
    }

    fn bank(memory: &Memory) -> &[Self] {
        &memory.mp
    }

    fn bank_mut(memory: &mut Memory) -> &mut [Self] {
        &mut memory.mp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_division_by_zero_is_ieee() {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let r = <Complex64 as Scalar>::div(&one, &zero).unwrap();
        assert!(r.re.is_nan() || r.re.is_infinite());
    }

    #[test]
    fn test_mp_division_by_zero_is_an_error() {
        let one = Complex::with_val(128, (1.0, 0.0));
        let zero = Complex::with_val(128, (0.0, 0.0));
        let err = <Complex as Scalar>::div(&one, &zero).unwrap_err();
        assert!(matches!(err, EvalError::NumericDomain { op: "div" }));
    }

    #[test]
    fn test_mp_log_of_zero_is_an_error() {
        let zero = Complex::with_val(128, (0.0, 0.0));
        assert!(<Complex as Scalar>::log(&zero).is_err());
    }

    #[test]
    fn test_mp_result_keeps_lhs_precision() {
        let a = Complex::with_val(256, (1.5, 0.0));
        let b = Complex::with_val(64, (2.5, 0.0));
        let r = <Complex as Scalar>::add(&a, &b);
        assert_eq!(r.prec(), (256, 256));
        assert_eq!(*r.real(), 4);
    }

    #[test]
    fn test_exp_of_zero() {
        let zero = Complex::with_val(128, (0.0, 0.0));
        let r = <Complex as Scalar>::exp(&zero);
        assert_eq!(*r.real(), 1);
        assert!(r.imag().is_zero());
    }

    #[test]
    fn test_banks_are_selected_by_scalar_type() {
        let mut memory = Memory::new(3, 128);
        <Complex64 as Scalar>::bank_mut(&mut memory)[1] = Complex64::new(2.0, 0.0);
        <Complex as Scalar>::bank_mut(&mut memory)[1] = Complex::with_val(128, (7.0, 0.0));
        assert_eq!(<Complex64 as Scalar>::bank(&memory)[1].re, 2.0);
        assert_eq!(*<Complex as Scalar>::bank(&memory)[1].real(), 7);
    }
}
