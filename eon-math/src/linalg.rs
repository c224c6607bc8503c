// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Small dense linear algebra for readout training.
//!
//! The trainer only ever needs one thing from this module: solve the
//! regularized normal equations
//!
//! `W = Cᵀ · (XᵀX + λI)⁻¹`
//!
//! where `G = XᵀX + λI` is the `n × n` Gram accumulator and `C = XᵀY` the
//! `n × k` cross accumulator. That contract is the [`NormalEquationSolver`]
//! trait, so a library solver can replace the naive ones here without touching
//! training code.
//!
//! All arithmetic is f64. Cost is O(n³); reservoirs stay in the tens to low
//! hundreds of units because of it.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Pivot magnitudes below this are replaced by it instead of dividing by ~0.
pub const PIVOT_FLOOR: f64 = 1e-10;

// ─── Dense Matrix ────────────────────────────────────

/// Row-major dense `rows × cols` matrix of f64.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Wrap row-major data.
    ///
    /// # Panics
    /// Panics if `data.len() != rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Matrix data length {} doesn't match {}×{}",
            data.len(),
            rows,
            cols
        );
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Add `value` to every diagonal entry.
    pub fn add_diagonal(&mut self, value: f64) {
        let n = self.rows.min(self.cols);
        for i in 0..n {
            self.data[i * self.cols + i] += value;
        }
    }

    /// Accumulate `x · xᵀ` into the upper triangle only.
    ///
    /// Call [`DenseMatrix::symmetrize_from_upper`] once accumulation is done.
    pub fn accumulate_gram_upper(&mut self, x: &[f64]) {
        debug_assert_eq!(self.rows, self.cols);
        debug_assert_eq!(x.len(), self.rows);
        let n = self.cols;
        for a in 0..n {
            let xa = x[a];
            if xa == 0.0 {
                continue;
            }
            let row = &mut self.data[a * n..(a + 1) * n];
            for b in a..n {
                row[b] += xa * x[b];
            }
        }
    }

    /// Accumulate `x · yᵀ` (rows = `x.len()`, cols = `y.len()`).
    pub fn accumulate_outer(&mut self, x: &[f64], y: &[f64]) {
        debug_assert_eq!(x.len(), self.rows);
        debug_assert_eq!(y.len(), self.cols);
        let k = self.cols;
        for (a, &xa) in x.iter().enumerate() {
            let row = &mut self.data[a * k..(a + 1) * k];
            for (dst, &yb) in row.iter_mut().zip(y) {
                *dst += xa * yb;
            }
        }
    }

    /// Mirror the upper triangle into the lower triangle.
    pub fn symmetrize_from_upper(&mut self) {
        let n = self.rows;
        for a in 0..n {
            for b in (a + 1)..n {
                self.data[b * n + a] = self.data[a * n + b];
            }
        }
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        t
    }

    /// `self · rhs`
    ///
    /// # Panics
    /// Panics on inner dimension mismatch.
    pub fn matmul(&self, rhs: &DenseMatrix) -> DenseMatrix {
        assert_eq!(
            self.cols, rhs.rows,
            "matmul dimension mismatch: {}×{} · {}×{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = DenseMatrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for p in 0..self.cols {
                let a = self.data[i * self.cols + p];
                if a == 0.0 {
                    continue;
                }
                let src = &rhs.data[p * rhs.cols..(p + 1) * rhs.cols];
                let dst = &mut out.data[i * rhs.cols..(i + 1) * rhs.cols];
                for (d, &b) in dst.iter_mut().zip(src) {
                    *d += a * b;
                }
            }
        }
        out
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let cols = self.cols;
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.data.split_at_mut(hi * cols);
        head[lo * cols..(lo + 1) * cols].swap_with_slice(&mut tail[..cols]);
    }
}

impl Index<(usize, usize)> for DenseMatrix {
    type Output = f64;

    fn index(&self, (r, c): (usize, usize)) -> &f64 {
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut f64 {
        &mut self.data[r * self.cols + c]
    }
}

// ─── Solvers ─────────────────────────────────────────

/// Solves regularized normal equations for a linear readout.
pub trait NormalEquationSolver: fmt::Debug + Send + Sync {
    /// Given the symmetric Gram accumulator `gram` (`n × n`) and the cross
    /// accumulator `cross` (`n × k`), return `crossᵀ · gram⁻¹` (`k × n`).
    ///
    /// Must not panic on singular or near-singular input.
    fn solve(&self, gram: &DenseMatrix, cross: &DenseMatrix) -> DenseMatrix;

    fn name(&self) -> &'static str;
}

/// Gauss-Jordan elimination with partial pivoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussJordanSolver;

impl NormalEquationSolver for GaussJordanSolver {
    fn solve(&self, gram: &DenseMatrix, cross: &DenseMatrix) -> DenseMatrix {
        let inverse = invert_gauss_jordan(gram);
        cross.transpose().matmul(&inverse)
    }

    fn name(&self) -> &'static str {
        "gauss-jordan"
    }
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
///
/// For each column the largest-magnitude pivot among the remaining rows is
/// swapped into place (mirrored in the identity-initialized inverse), the pivot
/// row is normalized and the column is eliminated from every other row.
/// A pivot smaller than [`PIVOT_FLOOR`] in magnitude is replaced by the floor
/// (keeping its sign), so degenerate input degrades the result instead of
/// producing a division by zero.
///
/// # Panics
/// Panics if `a` is not square.
pub fn invert_gauss_jordan(a: &DenseMatrix) -> DenseMatrix {
    assert_eq!(a.rows, a.cols, "Gauss-Jordan needs a square matrix");
    let n = a.rows;
    let mut work = a.clone();
    let mut inv = DenseMatrix::identity(n);

    for col in 0..n {
        let mut pivot_row = col;
        let mut best = work[(col, col)].abs();
        for r in (col + 1)..n {
            let mag = work[(r, col)].abs();
            if mag > best {
                best = mag;
                pivot_row = r;
            }
        }
        work.swap_rows(col, pivot_row);
        inv.swap_rows(col, pivot_row);

        let mut pivot = work[(col, col)];
        if pivot.abs() < PIVOT_FLOOR {
            pivot = if pivot < 0.0 { -PIVOT_FLOOR } else { PIVOT_FLOOR };
        }
        let scale = 1.0 / pivot;
        for v in &mut work.data[col * n..(col + 1) * n] {
            *v *= scale;
        }
        for v in &mut inv.data[col * n..(col + 1) * n] {
            *v *= scale;
        }

        let pivot_work = work.row(col).to_vec();
        let pivot_inv = inv.row(col).to_vec();
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = work[(r, col)];
            if factor == 0.0 {
                continue;
            }
            let row = &mut work.data[r * n..(r + 1) * n];
            for (dst, &p) in row.iter_mut().zip(&pivot_work) {
                *dst -= factor * p;
            }
            let row = &mut inv.data[r * n..(r + 1) * n];
            for (dst, &p) in row.iter_mut().zip(&pivot_inv) {
                *dst -= factor * p;
            }
        }
    }

    inv
}

/// Cholesky factorization `G = L·Lᵀ` followed by forward/back substitution.
///
/// Roughly half the flops of Gauss-Jordan. Non-positive diagonal terms are
/// clamped to a small positive value so indefinite input still yields finite
/// weights.
#[derive(Debug, Clone, Copy, Default)]
pub struct CholeskySolver;

impl NormalEquationSolver for CholeskySolver {
    fn solve(&self, gram: &DenseMatrix, cross: &DenseMatrix) -> DenseMatrix {
        assert_eq!(gram.rows, gram.cols, "Cholesky needs a square matrix");
        assert_eq!(gram.rows, cross.rows, "Gram/cross row mismatch");
        let n = gram.rows;
        let lower = cholesky_lower(gram);
        let upper = lower.transpose();

        // One output at a time: L·z = c, then Lᵀ·w = z into row `o` of W
        let mut weights = DenseMatrix::zeros(cross.cols, n);
        let mut z = vec![0.0f64; n];
        for o in 0..cross.cols {
            for i in 0..n {
                let row = lower.row(i);
                z[i] = (cross[(i, o)] - dot(&row[..i], &z[..i])) / row[i];
            }
            let w = &mut weights.data[o * n..(o + 1) * n];
            for i in (0..n).rev() {
                let row = upper.row(i);
                let value = (z[i] - dot(&row[i + 1..], &w[i + 1..])) / row[i];
                w[i] = value;
            }
        }
        weights
    }

    fn name(&self) -> &'static str {
        "cholesky"
    }
}

/// Lower-triangular `L` with `a = L·Lᵀ`, flooring non-positive pivots.
fn cholesky_lower(a: &DenseMatrix) -> DenseMatrix {
    let n = a.rows;
    let mut l = DenseMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let sum = dot(&l.row(i)[..j], &l.row(j)[..j]);
            let value = if i == j {
                let pivot = a[(i, i)] - sum;
                if pivot > 0.0 {
                    pivot.sqrt()
                } else {
                    PIVOT_FLOOR
                }
            } else {
                (a[(i, j)] - sum) / l[(j, j)]
            };
            l[(i, j)] = value;
        }
    }
    l
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
