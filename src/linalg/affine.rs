//   Copyright 2025 relumip developers
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

//! Affine transformations stored as detached numeric snapshots

use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;

/// An affine function f(x) = mat @ x + bias with mat: R^{m x n} and bias: R^m.
///
/// The parameters are plain `ndarray` matrices without any residual link to
/// the training framework they were exported from.
#[derive(Clone, PartialEq)]
pub struct AffFunc {
    pub mat: Array2<f64>,
    pub bias: Array1<f64>,
}

impl AffFunc {
    /// Create a new affine function from a weight matrix of shape
    /// ``[outdim, indim]`` and a bias vector of length ``outdim``.
    pub fn from_mats(mat: Array2<f64>, bias: Array1<f64>) -> AffFunc {
        assert_eq!(
            mat.len_of(Axis(0)),
            bias.len_of(Axis(0)),
            "Dimensions mismatch of matrix and bias: {} x {} and {}",
            mat.len_of(Axis(0)),
            mat.len_of(Axis(1)),
            bias.len_of(Axis(0))
        );
        debug_assert!(
            mat.iter().chain(bias.iter()).all(|x| x.is_finite()),
            "Non-finite weights are deprecated"
        );

        AffFunc { mat, bias }
    }

    /// Creates an affine function that implements the identity function f(x)=x.
    pub fn identity(dim: usize) -> AffFunc {
        AffFunc::from_mats(Array2::eye(dim), Array1::zeros(dim))
    }

    /// Creates an affine function that implements the zero function f(x)=0.
    pub fn zeros(dim: usize) -> AffFunc {
        AffFunc::from_mats(Array2::zeros((dim, dim)), Array1::zeros(dim))
    }

    #[inline]
    pub fn indim(&self) -> usize {
        self.mat.len_of(Axis(1))
    }

    #[inline]
    pub fn outdim(&self) -> usize {
        self.mat.len_of(Axis(0))
    }

    /// Evaluates this function at the given point.
    pub fn apply(&self, x: &ArrayView1<f64>) -> Array1<f64> {
        assert_eq!(
            x.len(),
            self.indim(),
            "Dimension mismatch: function expects input of size {}, got {}",
            self.indim(),
            x.len()
        );
        self.mat.dot(x) + &self.bias
    }

    /// Evaluates this function on a batch of inputs where each row of ``x``
    /// is one sample.
    pub fn apply_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        assert_eq!(
            x.ncols(),
            self.indim(),
            "Dimension mismatch: function expects input of size {}, got {}",
            self.indim(),
            x.ncols()
        );
        x.dot(&self.mat.t()) + &self.bias
    }

    /// Creates an affine function with weights drawn uniformly from [-1, 1).
    pub fn from_random(dim_out: usize, dim_in: usize) -> AffFunc {
        let mut rng = rand::thread_rng();
        let mut mat = Array2::zeros((dim_out, dim_in));
        let mut bias = Array1::zeros(dim_out);
        for i in 0..dim_out {
            for j in 0..dim_in {
                mat[[i, j]] = rng.gen_range(-1.0..1.0);
            }
            bias[i] = rng.gen_range(-1.0..1.0);
        }

        AffFunc::from_mats(mat, bias)
    }
}

impl fmt::Debug for AffFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AffFunc")
            .field(&self.mat)
            .field(&self.bias)
            .finish()
    }
}
