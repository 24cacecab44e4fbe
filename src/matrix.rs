//! Dense row-major matrix of observations × variables
//!
//! The harness moves feature data around as one flat `Vec<f64>` with a
//! row-major layout: row = observation, column = variable. Partitioning and
//! variable selection reduce to row/column gathers, which stay cache-friendly
//! on this layout even for microarray-sized variable counts.

use crate::{Error, Result};

/// Row-major numeric matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a matrix from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Dataset` if `data.len() != rows * cols`.
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::Dataset(format!(
                "matrix buffer has {} values, expected {rows}x{cols} = {}",
                data.len(),
                rows * cols
            )));
        }
        Ok(Self { data, rows, cols })
    }

    /// Create a zero-filled matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    /// Number of rows (observations).
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (variables).
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds (slice indexing).
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    /// Mutable value at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row as a slice.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Gather a subset of rows into a new matrix, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Dataset` if any index is out of bounds.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            if idx >= self.rows {
                return Err(Error::Dataset(format!(
                    "row index {idx} out of bounds (matrix has {} rows)",
                    self.rows
                )));
            }
            data.extend_from_slice(self.row(idx));
        }
        Ok(Self {
            data,
            rows: indices.len(),
            cols: self.cols,
        })
    }

    /// Gather a subset of columns into a new matrix, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Dataset` if any index is out of bounds.
    pub fn select_columns(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&c| c >= self.cols) {
            return Err(Error::Dataset(format!(
                "column index {bad} out of bounds (matrix has {} columns)",
                self.cols
            )));
        }
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for row in 0..self.rows {
            let src = self.row(row);
            data.extend(indices.iter().map(|&c| src[c]));
        }
        Ok(Self {
            data,
            rows: self.rows,
            cols: indices.len(),
        })
    }

    /// Column iterator over one variable's values.
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        debug_assert!(col < self.cols);
        (0..self.rows).map(move |r| self.get(r, col))
    }
}
