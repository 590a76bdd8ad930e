//! Matrix arithmetic and matrix functions.
//!
//! Entries stay symbolic: sums and products of entries go through the ordinary reducers.
//! Determinants and inverses are computed exactly when every entry is rational.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

use super::{ReductionContext, ReductionResult, add, multiply, negate, power};
use crate::{
    expr::{Expression, variant::ExprType},
    pool::{Pool, PoolResult},
};

/// Largest matrix exponent multiplied out.
const MAX_MATRIX_EXPONENT: u32 = 1024;
/// Largest symbolic determinant computed by cofactor expansion.
const MAX_COFACTOR_DIMENSION: usize = 3;

/// Row-major entries of a matrix node.
struct Grid {
    rows: usize,
    columns: usize,
    entries: Vec<Expression>,
}

impl Grid {
    fn from_expression(e: Expression) -> Option<Self> {
        let (rows, columns) = e.matrix_dimensions()?;
        Some(Self { rows, columns, entries: e.into_children() })
    }

    fn at(&self, row: usize, column: usize) -> &Expression {
        &self.entries[row * self.columns + column]
    }

    fn is_square(&self) -> bool {
        self.rows == self.columns
    }

    fn rationals(&self) -> Option<Vec<Vec<BigRational>>> {
        let mut rows = Vec::with_capacity(self.rows);
        for row in self.entries.chunks(self.columns.max(1)) {
            rows.push(row.iter().map(Expression::rational).collect::<Option<Vec<_>>>()?);
        }
        Some(rows)
    }

    fn build(self, pool: &Pool) -> PoolResult<Expression> {
        pool.matrix(self.rows, self.columns, self.entries)
    }
}

fn identity(pool: &Pool, n: usize) -> PoolResult<Grid> {
    let mut entries = Vec::with_capacity(n * n);
    for row in 0..n {
        for column in 0..n {
            entries.push(pool.integer(i32::from(row == column))?);
        }
    }
    Ok(Grid { rows: n, columns: n, entries })
}

fn rational_grid(pool: &Pool, values: Vec<Vec<BigRational>>) -> PoolResult<Grid> {
    let rows = values.len();
    let columns = values.first().map_or(0, Vec::len);
    let mut entries = Vec::with_capacity(rows * columns);
    for value in values.into_iter().flatten() {
        entries.push(pool.rational(value)?);
    }
    Ok(Grid { rows, columns, entries })
}

/// `None` when the inner dimensions disagree.
fn product(pool: &Pool, lhs: &Grid, rhs: &Grid, ctx: &ReductionContext) -> ReductionResult<Option<Grid>> {
    if lhs.columns != rhs.rows {
        return Ok(None);
    }
    let mut entries = Vec::with_capacity(lhs.rows * rhs.columns);
    for row in 0..lhs.rows {
        for column in 0..rhs.columns {
            let mut terms = Vec::with_capacity(lhs.columns);
            for k in 0..lhs.columns {
                terms.push(multiply(pool, vec![lhs.at(row, k).clone(), rhs.at(k, column).clone()], ctx)?);
            }
            entries.push(add(pool, terms, ctx)?);
        }
    }
    Ok(Some(Grid { rows: lhs.rows, columns: rhs.columns, entries }))
}

/// Element-wise sum. Every term must be a matrix of the same dimensions.
pub(super) fn add_matrices(pool: &Pool, terms: Vec<Expression>, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let dimensions = terms.first().and_then(Expression::matrix_dimensions);
    if terms.iter().any(|term| term.matrix_dimensions() != dimensions) {
        return Ok(pool.undefined()?);
    }
    let Some((rows, columns)) = dimensions else {
        return Ok(pool.undefined()?);
    };
    let grids: Vec<Vec<Expression>> = terms.into_iter().map(Expression::into_children).collect();
    let mut entries = Vec::with_capacity(rows * columns);
    for index in 0..rows * columns {
        let column: Vec<Expression> = grids.iter().map(|grid| grid[index].clone()).collect();
        entries.push(add(pool, column, ctx)?);
    }
    Ok(pool.matrix(rows, columns, entries)?)
}

/// Product of matrices in their original order, scaled by the scalar factors.
pub(super) fn multiply_matrices(
    pool: &Pool,
    factors: Vec<Expression>,
    ctx: &ReductionContext,
) -> ReductionResult<Expression> {
    let mut scalars = Vec::new();
    let mut accumulated: Option<Grid> = None;
    for factor in factors {
        if !factor.is_matrix() {
            scalars.push(factor);
            continue;
        }
        let Some(grid) = Grid::from_expression(factor) else {
            return Ok(pool.undefined()?);
        };
        accumulated = match accumulated {
            None => Some(grid),
            Some(lhs) => match product(pool, &lhs, &grid, ctx)? {
                Some(result) => Some(result),
                None => return Ok(pool.undefined()?),
            },
        };
    }
    let Some(mut grid) = accumulated else {
        return multiply(pool, scalars, ctx);
    };
    if !scalars.is_empty() {
        let mut scaled = Vec::with_capacity(grid.entries.len());
        for entry in grid.entries {
            let mut factors = scalars.clone();
            factors.push(entry);
            scaled.push(multiply(pool, factors, ctx)?);
        }
        grid.entries = scaled;
    }
    Ok(grid.build(pool)?)
}

/// `m^n` for a square matrix: repeated products for `n ≥ 0`, the inverse for `n = -1`.
pub(super) fn matrix_power(
    pool: &Pool,
    m: Expression,
    n: &BigInt,
    ctx: &ReductionContext,
) -> ReductionResult<Expression> {
    let Some(grid) = Grid::from_expression(m) else {
        return Ok(pool.undefined()?);
    };
    if !grid.is_square() {
        return Ok(pool.undefined()?);
    }
    if *n == BigInt::from(-1) {
        return inverse(pool, grid, ctx);
    }
    let Some(mut exponent) = n.to_u32() else {
        return Ok(pool.undefined()?);
    };
    if exponent > MAX_MATRIX_EXPONENT {
        let base = grid.build(pool)?;
        return Ok(pool.operator(ExprType::Power, [base, pool.integer(exponent)?])?);
    }

    let mut result = identity(pool, grid.rows)?;
    let mut square = grid;
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = product(pool, &result, &square, ctx)?.unwrap_or(result);
        }
        exponent >>= 1;
        if exponent > 0 {
            square = product(pool, &square, &square, ctx)?.unwrap_or(square);
        }
    }
    Ok(result.build(pool)?)
}

fn rational_determinant(mut m: Vec<Vec<BigRational>>) -> BigRational {
    let n = m.len();
    let mut sign = BigRational::one();
    let mut previous = BigRational::one();
    for k in 0..n.saturating_sub(1) {
        if m[k][k].is_zero() {
            let Some(pivot) = (k + 1..n).find(|&i| !m[i][k].is_zero()) else {
                return BigRational::zero();
            };
            m.swap(k, pivot);
            sign = -sign;
        }
        for i in k + 1..n {
            for j in k + 1..n {
                let value = (&m[i][j] * &m[k][k] - &m[i][k] * &m[k][j]) / &previous;
                m[i][j] = value;
            }
        }
        previous = m[k][k].clone();
    }
    match m.last().and_then(|row| row.last()) {
        Some(last) => sign * last,
        None => BigRational::one(),
    }
}

/// Gauss-Jordan elimination, `None` when singular.
fn rational_inverse(m: &[Vec<BigRational>]) -> Option<Vec<Vec<BigRational>>> {
    let n = m.len();
    let mut augmented: Vec<Vec<BigRational>> = m
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut row = row.clone();
            row.extend((0..n).map(|j| if i == j { BigRational::one() } else { BigRational::zero() }));
            row
        })
        .collect();
    for column in 0..n {
        let pivot = (column..n).find(|&row| !augmented[row][column].is_zero())?;
        augmented.swap(column, pivot);
        let scale = augmented[column][column].recip();
        for value in augmented[column].iter_mut() {
            *value *= &scale;
        }
        for row in 0..n {
            if row == column || augmented[row][column].is_zero() {
                continue;
            }
            let factor = augmented[row][column].clone();
            for j in 0..2 * n {
                let delta = &factor * &augmented[column][j];
                augmented[row][j] -= delta;
            }
        }
    }
    Some(augmented.into_iter().map(|row| row[n..].to_vec()).collect())
}

fn symbolic_determinant(pool: &Pool, grid: &Grid, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let n = grid.rows;
    if n == 1 {
        return Ok(grid.at(0, 0).clone());
    }
    let mut terms = Vec::with_capacity(n);
    for column in 0..n {
        let mut minor = Vec::with_capacity((n - 1) * (n - 1));
        for row in 1..n {
            for other in (0..n).filter(|&c| c != column) {
                minor.push(grid.at(row, other).clone());
            }
        }
        let minor = Grid { rows: n - 1, columns: n - 1, entries: minor };
        let cofactor = symbolic_determinant(pool, &minor, ctx)?;
        let term = multiply(pool, vec![grid.at(0, column).clone(), cofactor], ctx)?;
        terms.push(if column % 2 == 1 { negate(pool, term, ctx)? } else { term });
    }
    add(pool, terms, ctx)
}

fn inverse(pool: &Pool, grid: Grid, ctx: &ReductionContext) -> ReductionResult<Expression> {
    if let Some(values) = grid.rationals() {
        return match rational_inverse(&values) {
            Some(inverse) => Ok(rational_grid(pool, inverse)?.build(pool)?),
            None => Ok(pool.undefined()?),
        };
    }
    if grid.rows == 1 {
        let entry = power(pool, grid.at(0, 0).clone(), pool.integer(-1)?, ctx)?;
        return Ok(pool.matrix(1, 1, [entry])?);
    }
    let m = grid.build(pool)?;
    Ok(pool.operator(ExprType::MatrixInverse, [m])?)
}

/// `det`, `inverse`, `trace`, `transpose` and `dim`. Scalars act as 1×1 matrices.
pub(super) fn reduce_function(e: Expression, ctx: &ReductionContext) -> ReductionResult<Expression> {
    let pool = e.pool().clone();
    let kind = e.kind();
    let Some([argument]) = e.into_operands::<1>() else {
        return Ok(pool.undefined()?);
    };

    if !argument.is_matrix() {
        return match kind {
            ExprType::MatrixInverse => power(&pool, argument, pool.integer(-1)?, ctx),
            ExprType::MatrixDimension => Ok(pool.matrix(1, 2, [pool.integer(1)?, pool.integer(1)?])?),
            _ => Ok(argument),
        };
    }
    let Some(grid) = Grid::from_expression(argument) else {
        return Ok(pool.undefined()?);
    };

    match kind {
        ExprType::MatrixDimension => {
            Ok(pool.matrix(1, 2, [pool.integer(grid.rows as u64)?, pool.integer(grid.columns as u64)?])?)
        }
        ExprType::MatrixTranspose => {
            let mut entries = Vec::with_capacity(grid.entries.len());
            for column in 0..grid.columns {
                for row in 0..grid.rows {
                    entries.push(grid.at(row, column).clone());
                }
            }
            Ok(pool.matrix(grid.columns, grid.rows, entries)?)
        }
        _ if !grid.is_square() => Ok(pool.undefined()?),
        ExprType::MatrixTrace => {
            let diagonal = (0..grid.rows).map(|i| grid.at(i, i).clone()).collect();
            add(&pool, diagonal, ctx)
        }
        ExprType::MatrixInverse => inverse(&pool, grid, ctx),
        ExprType::Determinant => {
            if let Some(values) = grid.rationals() {
                return Ok(pool.rational(rational_determinant(values))?);
            }
            if grid.rows <= MAX_COFACTOR_DIMENSION {
                return symbolic_determinant(&pool, &grid, ctx);
            }
            let m = grid.build(&pool)?;
            Ok(pool.operator(ExprType::Determinant, [m])?)
        }
        _ => Ok(pool.undefined()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rationals(rows: &[&[i64]]) -> Vec<Vec<BigRational>> {
        rows.iter()
            .map(|row| row.iter().map(|&v| BigRational::from_integer(v.into())).collect())
            .collect()
    }

    #[test]
    fn bareiss_determinant() {
        assert_eq!(rational_determinant(rationals(&[&[1, 2], &[3, 4]])), BigRational::from_integer((-2).into()));
        let m = rationals(&[&[0, 1, 2], &[1, 0, 3], &[4, -3, 8]]);
        assert_eq!(rational_determinant(m), BigRational::from_integer((-2).into()));
        assert!(rational_determinant(rationals(&[&[1, 2], &[2, 4]])).is_zero());
    }

    #[test]
    fn gauss_jordan_inverse() {
        let inverse = rational_inverse(&rationals(&[&[2, 0], &[0, 4]])).unwrap();
        assert_eq!(inverse[0][0], BigRational::new(1.into(), 2.into()));
        assert_eq!(inverse[1][1], BigRational::new(1.into(), 4.into()));
        assert!(rational_inverse(&rationals(&[&[1, 2], &[2, 4]])).is_none());
    }
}
