//! A trait for vector-like output containers.
//!
//! The program's accessors copy function values and time derivatives into
//! any container implementing [`Vector`], resizing it to the declared
//! dimension first. Implementations are provided for `Vec`, fixed-size
//! arrays, and (behind the matching cargo features) `nalgebra` and
//! `ndarray` vectors.

use crate::scalar::Scalar;

/// A contiguous, resizable-by-replacement vector of scalars.
pub trait Vector<S: Scalar> {
    /// Returns a reference to the vector's data as a slice.
    fn as_slice(&self) -> &[S];

    /// Returns a mutable reference to the vector's data as a slice.
    fn as_mut_slice(&mut self) -> &mut [S];

    /// Creates a new vector of the specified length filled with zeros.
    fn zeros(len: usize) -> Self;

    /// Returns the length of the vector.
    fn len(&self) -> usize;

    /// Checks if the vector is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Scalar> Vector<S> for Vec<S> {
    fn as_slice(&self) -> &[S] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [S] {
        self
    }

    fn zeros(len: usize) -> Self {
        vec![S::zero(); len]
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Fixed-size arrays work when the compile-time size matches the program's
/// dimension.
impl<S: Scalar, const N: usize> Vector<S> for [S; N] {
    fn as_slice(&self) -> &[S] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [S] {
        self
    }

    fn zeros(len: usize) -> Self {
        assert_eq!(len, N, "array length must match const generic size");
        std::array::from_fn(|_| S::zero())
    }

    fn len(&self) -> usize {
        N
    }
}

#[cfg(feature = "nalgebra")]
impl<S: Scalar + nalgebra::Scalar> Vector<S> for nalgebra::DVector<S> {
    fn as_slice(&self) -> &[S] {
        self.as_slice()
    }

    fn as_mut_slice(&mut self) -> &mut [S] {
        self.as_mut_slice()
    }

    fn zeros(len: usize) -> Self {
        nalgebra::DVector::from_element(len, S::zero())
    }

    fn len(&self) -> usize {
        self.nrows()
    }
}

#[cfg(feature = "ndarray")]
impl<S: Scalar> Vector<S> for ndarray::Array1<S> {
    fn as_slice(&self) -> &[S] {
        self.as_slice().unwrap()
    }

    fn as_mut_slice(&mut self) -> &mut [S] {
        self.as_slice_mut().unwrap()
    }

    fn zeros(len: usize) -> Self {
        ndarray::Array1::from_elem(len, S::zero())
    }

    fn len(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_vec_backend() {
        let mut v: Vec<Complex64> = Vector::zeros(3);
        assert_eq!(Vector::len(&v), 3);
        Vector::as_mut_slice(&mut v)[1] = Complex64::new(2.0, -1.0);
        assert_eq!(Vector::as_slice(&v)[1], Complex64::new(2.0, -1.0));
    }

    #[test]
    fn test_array_backend() {
        let mut a: [Complex64; 2] = Vector::zeros(2);
        Vector::as_mut_slice(&mut a)[0] = Complex64::new(1.0, 0.0);
        assert_eq!(a[0], Complex64::new(1.0, 0.0));
    }

    #[cfg(feature = "nalgebra")]
    #[test]
    fn test_nalgebra_backend() {
        let mut v: nalgebra::DVector<Complex64> = Vector::zeros(4);
        assert_eq!(Vector::len(&v), 4);
        Vector::as_mut_slice(&mut v)[3] = Complex64::new(4.0, 0.0);
        assert_eq!(v[3], Complex64::new(4.0, 0.0));
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_ndarray_backend() {
        let mut v: ndarray::Array1<Complex64> = Vector::zeros(4);
        Vector::as_mut_slice(&mut v)[2] = Complex64::new(3.0, 0.0);
        assert_eq!(v[2], Complex64::new(3.0, 0.0));
    }
}
