//! Data
//!
//! Containers for the arrays that flow into a reduction: borrowed column-major
//! matrices, column-oriented frames, and the `ArrayLike` enum that lets callers
//! hand over any of them.
use serde::{Deserialize, Serialize};

/// Contiguous Column Major Matrix data container.
///
/// This structure holds a dense matrix of values in a single contiguous memory block.
/// It follows column-major order (Fortran-style), which allows for efficient column slicing.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f32`, `f64`).
#[derive(Debug, Clone, Copy)]
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    stride1: usize,
    stride2: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            stride1: rows,
            stride2: 1,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        let mut idx = self.stride2 * i;
        idx += j * self.stride1;
        idx
    }

    /// Get access to a row of the data, as an iterator.
    pub fn get_row_iter(&self, row: usize) -> std::iter::StepBy<std::iter::Skip<std::slice::Iter<'a, T>>> {
        self.data.iter().skip(row).step_by(self.rows)
    }

    /// Get a slice of a column in the matrix.
    ///
    /// * `col` - The index of the column to select.
    /// * `start_row` - The index of the start of the slice.
    /// * `end_row` - The index of the end of the slice of the column to select.
    pub fn get_col_slice(&self, col: usize, start_row: usize, end_row: usize) -> &[T] {
        let i = self.item_index(start_row, col);
        let j = self.item_index(end_row, col);
        &self.data[i..j]
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        self.get_col_slice(col, 0, self.rows)
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.get_row_iter(row).copied().collect()
    }
}

/// Column Major Matrix that owns its contents.
///
/// Validated inputs are copied into this form once, and every estimator
/// fit borrows a [`Matrix`] view of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnedMatrix {
    /// The raw data, column-major.
    pub data: Vec<f64>,
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl OwnedMatrix {
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        OwnedMatrix { data, rows, cols }
    }

    /// Borrow the contents as a [`Matrix`].
    pub fn view(&self) -> Matrix<'_, f64> {
        Matrix::new(&self.data, self.rows, self.cols)
    }
}

/// Columnar matrix storing columns as separate slices.
///
/// This is the data-frame shaped input: each column lives in its own buffer,
/// as in Arrow or Polars, and is referenced rather than copied.
/// Validity masks (bitmaps) mark null entries without relying on NaN patterns.
#[derive(Debug, Clone)]
pub struct ColumnarMatrix<'a, T> {
    /// The columns of the matrix. Each element is a slice representing one column.
    pub columns: Vec<&'a [T]>,
    /// Optional validity mask for each column.
    /// * If the vector is present, it must have the same length as `columns`.
    /// * If a specific column's mask is `None`, all values are considered valid.
    /// * Bit set (1) means valid, bit unset (0) means null/missing.
    pub masks: Option<Vec<Option<&'a [u8]>>>,
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl<'a, T> ColumnarMatrix<'a, T> {
    /// Create a new columnar matrix from a vector of column slices.
    ///
    /// The row count is taken from the first column; an empty frame has zero rows.
    /// Columns of unequal length are rejected during input validation.
    pub fn new(columns: Vec<&'a [T]>, masks: Option<Vec<Option<&'a [u8]>>>) -> Self {
        let cols = columns.len();
        let rows = columns.first().map_or(0, |c| c.len());
        ColumnarMatrix {
            columns,
            masks,
            rows,
            cols,
        }
    }

    /// Get a single reference to an item in the matrix.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.columns[j][i]
    }

    /// Get an entire column in the matrix.
    pub fn get_col(&self, col: usize) -> &[T] {
        self.columns[col]
    }

    /// Check if a value at (row, col) is valid (not null).
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        if let Some(ref masks) = self.masks {
            if let Some(Some(mask)) = masks.get(col) {
                let byte_idx = row / 8;
                let bit_idx = row % 8;
                if byte_idx < mask.len() {
                    return (mask[byte_idx] >> bit_idx) & 1 != 0;
                }
                return false;
            }
        }
        true
    }
}

/// Any of the array shapes accepted by `fit` and `predict`.
///
/// Numeric inputs (`X`, `y`) must be `Matrix`, `Frame` or `Vector`;
/// sensitive features additionally accept categorical `Labels` and `LabelFrame`.
#[derive(Debug, Clone)]
pub enum ArrayLike<'a> {
    /// Dense, column-major 2-D array.
    Matrix(Matrix<'a, f64>),
    /// Column-oriented 2-D frame.
    Frame(ColumnarMatrix<'a, f64>),
    /// 1-D numeric array.
    Vector(&'a [f64]),
    /// 1-D categorical array.
    Labels(&'a [String]),
    /// Column-oriented 2-D categorical frame.
    LabelFrame(ColumnarMatrix<'a, String>),
}

impl<'a> ArrayLike<'a> {
    /// Number of rows, and number of columns for 2-D inputs.
    pub fn shape(&self) -> (usize, Option<usize>) {
        match self {
            ArrayLike::Matrix(m) => (m.rows, Some(m.cols)),
            ArrayLike::Frame(f) => (f.rows, Some(f.cols)),
            ArrayLike::Vector(v) => (v.len(), None),
            ArrayLike::Labels(v) => (v.len(), None),
            ArrayLike::LabelFrame(f) => (f.rows, Some(f.cols)),
        }
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.shape().0
    }
}

impl<'a> From<Matrix<'a, f64>> for ArrayLike<'a> {
    fn from(m: Matrix<'a, f64>) -> Self {
        ArrayLike::Matrix(m)
    }
}

impl<'a> From<ColumnarMatrix<'a, f64>> for ArrayLike<'a> {
    fn from(f: ColumnarMatrix<'a, f64>) -> Self {
        ArrayLike::Frame(f)
    }
}

impl<'a> From<&'a [f64]> for ArrayLike<'a> {
    fn from(v: &'a [f64]) -> Self {
        ArrayLike::Vector(v)
    }
}

impl<'a> From<&'a [String]> for ArrayLike<'a> {
    fn from(v: &'a [String]) -> Self {
        ArrayLike::Labels(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_get() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 2, 3);
        assert_eq!(m.get(0, 0), &1);
        assert_eq!(m.get(1, 0), &2);
    }

    #[test]
    fn test_matrix_get_col_slice() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_col_slice(0, 0, 3), &vec![1, 2, 3]);
        assert_eq!(m.get_col_slice(1, 0, 2), &vec![5, 6]);
        assert_eq!(m.get_col_slice(1, 1, 3), &vec![6, 7]);
    }

    #[test]
    fn test_matrix_row() {
        let v = vec![1, 2, 3, 5, 6, 7];
        let m = Matrix::new(&v, 3, 2);
        assert_eq!(m.get_row(2), vec![3, 7]);
        assert_eq!(m.get_row(0), vec![1, 5]);
    }

    #[test]
    fn test_owned_matrix_view() {
        let m = OwnedMatrix::new(vec![1., 2., 3., 4.], 2, 2);
        let view = m.view();
        assert_eq!(view.get_col(1), &[3., 4.]);
        assert_eq!(view.get_row(0), vec![1., 3.]);
    }

    #[test]
    fn test_columnar_validity_mask() {
        let c0 = vec![1., 2., 3.];
        let c1 = vec![4., 5., 6.];
        // Second row of the second column is null.
        let mask: Vec<u8> = vec![0b0000_0101];
        let frame = ColumnarMatrix::new(vec![c0.as_slice(), c1.as_slice()], Some(vec![None, Some(mask.as_slice())]));
        assert_eq!(frame.rows, 3);
        assert_eq!(frame.cols, 2);
        assert!(frame.is_valid(1, 0));
        assert!(frame.is_valid(0, 1));
        assert!(!frame.is_valid(1, 1));
        assert_eq!(frame.get(2, 1), &6.);
    }

    #[test]
    fn test_array_like_shape() {
        let v = vec![0., 1., 0.];
        assert_eq!(ArrayLike::from(v.as_slice()).shape(), (3, None));
        let m = Matrix::new(&v, 3, 1);
        assert_eq!(ArrayLike::from(m).shape(), (3, Some(1)));
    }
}
