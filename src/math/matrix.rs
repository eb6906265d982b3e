use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::random::standard_normal;

/// Row-major dense matrix.
///
/// Layer weights are stored as `outputs × inputs`, so row `o` holds every
/// incoming weight of output unit `o`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// He initialization: samples from N(0, sqrt(2 / cols)).
    ///
    /// `cols` is the fan-in, i.e. the number of inputs of the layer.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let std_dev = (2.0 / cols as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for value in row.iter_mut() {
                *value = standard_normal(rng) * std_dev;
            }
        }
        res
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let rows = data.len();
        let cols = data.first().map_or(0, |row| row.len());
        Matrix { rows, cols, data }
    }

    /// True when every row has exactly `cols` entries.
    pub fn is_rectangular(&self) -> bool {
        self.data.len() == self.rows && self.data.iter().all(|row| row.len() == self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    /// `self · v`, where `v.len() == cols`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.cols);
        self.data
            .iter()
            .map(|row| row.iter().zip(v).map(|(w, x)| w * x).sum())
            .collect()
    }

    /// `selfᵀ · v`, where `v.len() == rows`.
    pub fn transpose_mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.rows);
        let mut res = vec![0.0; self.cols];
        for (row, &scale) in self.data.iter().zip(v) {
            for (acc, w) in res.iter_mut().zip(row) {
                *acc += w * scale;
            }
        }
        res
    }

    /// Adds the outer product `left ⊗ right` in place.
    pub fn add_outer(&mut self, left: &[f64], right: &[f64]) {
        debug_assert_eq!(left.len(), self.rows);
        debug_assert_eq!(right.len(), self.cols);
        for (row, &l) in self.data.iter_mut().zip(left) {
            for (value, &r) in row.iter_mut().zip(right) {
                *value += l * r;
            }
        }
    }

    /// `self -= other * scale`, element-wise.
    pub fn sub_scaled(&mut self, other: &Matrix, scale: f64) {
        assert_eq!((self.rows, self.cols), (other.rows, other.cols), "Matrices are of incorrect sizes");
        for (row, other_row) in self.data.iter_mut().zip(&other.data) {
            for (value, g) in row.iter_mut().zip(other_row) {
                *value -= g * scale;
            }
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
