//! Numeric matrices: element-wise arithmetic, products, powers and Gauss-Jordan elimination.

use std::cmp::Ordering;

use num_complex::Complex;
use num_traits::{One, Zero};

use super::{MatrixEvaluation, Precision, scalar};

impl<T: Precision> MatrixEvaluation<T> {
    pub fn new(rows: usize, columns: usize, entries: Vec<Complex<T>>) -> Option<Self> {
        (rows * columns == entries.len() && rows > 0).then_some(Self { rows, columns, entries })
    }

    pub fn identity(n: usize) -> Self {
        let entries = (0..n * n)
            .map(|i| if i / n == i % n { Complex::one() } else { Complex::zero() })
            .collect();
        Self { rows: n, columns: n, entries }
    }

    pub fn at(&self, row: usize, column: usize) -> Complex<T> {
        self.entries[row * self.columns + column]
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.columns
    }

    pub(super) fn map(&self, f: impl Fn(Complex<T>) -> Complex<T>) -> Self {
        Self { rows: self.rows, columns: self.columns, entries: self.entries.iter().copied().map(f).collect() }
    }

    /// Entry-wise combination of two matrices of the same dimensions.
    pub(super) fn zip(&self, other: &Self, f: impl Fn(Complex<T>, Complex<T>) -> Complex<T>) -> Option<Self> {
        if (self.rows, self.columns) != (other.rows, other.columns) {
            return None;
        }
        let entries = self.entries.iter().zip(&other.entries).map(|(&a, &b)| f(a, b)).collect();
        Some(Self { rows: self.rows, columns: self.columns, entries })
    }

    pub fn product(&self, other: &Self) -> Option<Self> {
        if self.columns != other.rows {
            return None;
        }
        let mut entries = Vec::with_capacity(self.rows * other.columns);
        for row in 0..self.rows {
            for column in 0..other.columns {
                let value = (0..self.columns).fold(Complex::zero(), |sum, k| {
                    scalar::add(sum, scalar::multiply(self.at(row, k), other.at(k, column)))
                });
                entries.push(value);
            }
        }
        Some(Self { rows: self.rows, columns: other.columns, entries })
    }

    /// Integer power of a square matrix; negative exponents go through the inverse.
    pub fn power(&self, exponent: i64) -> Option<Self> {
        if !self.is_square() {
            return None;
        }
        let mut base = if exponent < 0 { self.inverse()? } else { self.clone() };
        let mut remaining = exponent.unsigned_abs();
        let mut result = Self::identity(self.rows);
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.product(&base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.product(&base)?;
            }
        }
        Some(result)
    }

    pub fn transpose(&self) -> Self {
        let entries = (0..self.columns)
            .flat_map(|column| (0..self.rows).map(move |row| (row, column)))
            .map(|(row, column)| self.at(row, column))
            .collect();
        Self { rows: self.columns, columns: self.rows, entries }
    }

    pub fn trace(&self) -> Option<Complex<T>> {
        self.is_square().then(|| (0..self.rows).fold(Complex::zero(), |sum, i| scalar::add(sum, self.at(i, i))))
    }

    /// Row index of the largest pivot candidate in `column`, at or below `start`.
    fn pivot(rows: &[Vec<Complex<T>>], column: usize, start: usize) -> Option<usize> {
        (start..rows.len())
            .filter(|&row| !rows[row][column].is_zero())
            .max_by(|&a, &b| {
                let (a, b) = (rows[a][column].norm(), rows[b][column].norm());
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            })
    }

    fn to_rows(&self) -> Vec<Vec<Complex<T>>> {
        self.entries.chunks(self.columns).map(<[_]>::to_vec).collect()
    }

    /// Determinant by Gaussian elimination with partial pivoting.
    pub fn determinant(&self) -> Option<Complex<T>> {
        if !self.is_square() {
            return None;
        }
        let n = self.rows;
        let mut rows = self.to_rows();
        let mut determinant = Complex::one();
        for column in 0..n {
            let Some(pivot) = Self::pivot(&rows, column, column) else {
                return Some(Complex::zero());
            };
            if pivot != column {
                rows.swap(pivot, column);
                determinant = -determinant;
            }
            let head = rows[column][column];
            determinant = scalar::multiply(determinant, head);
            for row in column + 1..n {
                let factor = rows[row][column] / head;
                for k in column..n {
                    let delta = factor * rows[column][k];
                    rows[row][k] = rows[row][k] - delta;
                }
            }
        }
        Some(determinant)
    }

    /// Inverse by Gauss-Jordan elimination, `None` for singular or non-square matrices.
    pub fn inverse(&self) -> Option<Self> {
        if !self.is_square() {
            return None;
        }
        let n = self.rows;
        let identity = Self::identity(n);
        let mut rows: Vec<Vec<Complex<T>>> = self
            .to_rows()
            .into_iter()
            .zip(identity.to_rows())
            .map(|(mut left, right)| {
                left.extend(right);
                left
            })
            .collect();
        for column in 0..n {
            let pivot = Self::pivot(&rows, column, column)?;
            rows.swap(pivot, column);
            let head = rows[column][column];
            for value in rows[column].iter_mut() {
                *value = *value / head;
            }
            for row in 0..n {
                if row == column || rows[row][column].is_zero() {
                    continue;
                }
                let factor = rows[row][column];
                for k in 0..2 * n {
                    let delta = factor * rows[column][k];
                    rows[row][k] = rows[row][k] - delta;
                }
            }
        }
        let entries = rows.into_iter().flat_map(|row| row.into_iter().skip(n)).collect();
        Some(Self { rows: n, columns: n, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, columns: usize, values: &[f64]) -> MatrixEvaluation<f64> {
        let entries = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
        MatrixEvaluation::new(rows, columns, entries).unwrap()
    }

    #[test]
    fn determinant_needs_pivoting() {
        let m = matrix(3, 3, &[0.0, 2.0, 1.0, 1.0, 1.0, 1.0, 2.0, 0.0, 3.0]);
        assert!((m.determinant().unwrap().re + 4.0).abs() < 1e-12);
        let singular = matrix(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(singular.determinant().unwrap().re, 0.0);
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let m = matrix(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let product = m.inverse().unwrap().product(&m).unwrap();
        for (i, value) in product.entries.iter().enumerate() {
            let expected = if i % 3 == 0 { 1.0 } else { 0.0 };
            assert!((value.re - expected).abs() < 1e-12);
        }
        assert!(matrix(2, 2, &[1.0, 2.0, 2.0, 4.0]).inverse().is_none());
    }

    #[test]
    fn powers_and_transpose() {
        let m = matrix(2, 2, &[1.0, 1.0, 0.0, 1.0]);
        assert_eq!(m.power(5).unwrap().at(0, 1).re, 5.0);
        assert_eq!(m.power(-1).unwrap().at(0, 1).re, -1.0);
        let wide = matrix(1, 3, &[1.0, 2.0, 3.0]);
        let tall = wide.transpose();
        assert_eq!((tall.rows, tall.columns), (3, 1));
        assert_eq!(tall.at(2, 0).re, 3.0);
        assert_eq!(wide.product(&tall).unwrap().at(0, 0).re, 14.0);
        assert!(wide.power(2).is_none());
    }
}
