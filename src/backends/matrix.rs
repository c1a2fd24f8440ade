//! A trait for matrix-like output containers.
//!
//! The Jacobian accessor copies into any container implementing
//! [`Matrix`], resizing it to F×V first. Access goes through `(row,
//! column)` indexing rather than a flat slice: the supported container
//! types disagree on storage order, and the scalars are not `Copy`.
//! Implementations are provided for nested `Vec`s and (behind the matching
//! cargo features) `nalgebra` and `ndarray` matrices.

use crate::scalar::Scalar;

/// A two-dimensional container of scalars, indexed `(row, column)`.
pub trait Matrix<S: Scalar> {
    /// Creates a new matrix of the specified dimensions filled with zeros.
    fn zeros(rows: usize, cols: usize) -> Self;

    /// Returns the dimensions of the matrix as (rows, columns).
    fn dims(&self) -> (usize, usize);

    /// Returns a reference to the entry at `(row, col)`.
    fn get(&self, row: usize, col: usize) -> &S;

    /// Replaces the entry at `(row, col)`.
    fn set(&mut self, row: usize, col: usize, value: S);
}

impl<S: Scalar> Matrix<S> for Vec<Vec<S>> {
    fn zeros(rows: usize, cols: usize) -> Self {
        vec![vec![S::zero(); cols]; rows]
    }

    fn dims(&self) -> (usize, usize) {
        (self.len(), self.first().map_or(0, |row| row.len()))
    }

    fn get(&self, row: usize, col: usize) -> &S {
        &self[row][col]
    }

    fn set(&mut self, row: usize, col: usize, value: S) {
        self[row][col] = value;
    }
}

#[cfg(feature = "nalgebra")]
impl<S: Scalar + nalgebra::Scalar> Matrix<S> for nalgebra::DMatrix<S> {
    fn zeros(rows: usize, cols: usize) -> Self {
        nalgebra::DMatrix::from_element(rows, cols, S::zero())
    }

    fn dims(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn get(&self, row: usize, col: usize) -> &S {
        &self[(row, col)]
    }

    fn set(&mut self, row: usize, col: usize, value: S) {
        self[(row, col)] = value;
    }
}

#[cfg(feature = "ndarray")]
impl<S: Scalar> Matrix<S> for ndarray::Array2<S> {
    fn zeros(rows: usize, cols: usize) -> Self {
        ndarray::Array2::from_elem((rows, cols), S::zero())
    }

    fn dims(&self) -> (usize, usize) {
        self.dim()
    }

    fn get(&self, row: usize, col: usize) -> &S {
        &self[[row, col]]
    }

    fn set(&mut self, row: usize, col: usize, value: S) {
        self[[row, col]] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn test_nested_vec_matrix() {
        let mut m: Vec<Vec<Complex64>> = Matrix::zeros(2, 3);
        assert_eq!(m.dims(), (2, 3));
        m.set(1, 2, c(6.0));
        assert_eq!(*Matrix::get(&m, 1, 2), c(6.0));
        assert_eq!(*Matrix::get(&m, 0, 0), c(0.0));
    }

    #[cfg(feature = "nalgebra")]
    #[test]
    fn test_nalgebra_matrix() {
        let mut m: nalgebra::DMatrix<Complex64> = Matrix::zeros(2, 2);
        assert_eq!(Matrix::dims(&m), (2, 2));
        m.set(0, 1, c(2.0));
        assert_eq!(*Matrix::get(&m, 0, 1), c(2.0));
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_ndarray_matrix() {
        let mut m: ndarray::Array2<Complex64> = Matrix::zeros(2, 2);
        assert_eq!(Matrix::dims(&m), (2, 2));
        m.set(1, 0, c(3.0));
        assert_eq!(*Matrix::get(&m, 1, 0), c(3.0));
    }
}
