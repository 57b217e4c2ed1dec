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

//! Two-dimensional grids of decision variables

use ndarray::Array2;

use super::EmbedError;
use crate::milp::model::{MilpModel, Var};

/// A 2-D grid of decision variables where rows are samples of a batch and
/// columns are features.
///
/// Cloning a `VarArray` copies the handles, not the variables: two clones
/// refer to the same columns of the underlying model.
#[derive(Clone, Debug, PartialEq)]
pub struct VarArray {
    vars: Array2<Var>,
}

impl VarArray {
    /// Creates a fresh ``rows x cols`` grid of continuous variables on
    /// ``model``, all sharing the given bounds.
    pub fn new(model: &mut MilpModel, rows: usize, cols: usize, lb: f64, ub: f64) -> VarArray {
        let vars = Array2::from_shape_fn((rows, cols), |_| model.add_var(lb, ub));
        VarArray { vars }
    }

    /// Creates a fresh grid of continuous variables with per-element bounds.
    pub fn with_bounds(model: &mut MilpModel, lb: &Array2<f64>, ub: &Array2<f64>) -> VarArray {
        assert_eq!(
            lb.dim(),
            ub.dim(),
            "Dimension mismatch of bound arrays: {:?} and {:?}",
            lb.dim(),
            ub.dim()
        );
        let vars = Array2::from_shape_fn(lb.dim(), |idx| model.add_var(lb[idx], ub[idx]));
        VarArray { vars }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.vars.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.vars.ncols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.vars.dim()
    }

    /// The variable handle at the given batch row and feature column.
    #[inline]
    pub fn var(&self, row: usize, col: usize) -> Var {
        self.vars[[row, col]]
    }

    /// The lower bounds of all variables in this grid.
    pub fn lower(&self, model: &MilpModel) -> Array2<f64> {
        self.vars.mapv(|var| model.lower_bound(var))
    }

    /// The upper bounds of all variables in this grid.
    pub fn upper(&self, model: &MilpModel) -> Array2<f64> {
        self.vars.mapv(|var| model.upper_bound(var))
    }

    /// Pins every variable of this grid to the corresponding entry of
    /// ``values`` by adding equality constraints.
    pub fn fix_values(&self, model: &mut MilpModel, values: &Array2<f64>) {
        assert_eq!(
            self.shape(),
            values.dim(),
            "Dimension mismatch: variable array is {:?}, values are {:?}",
            self.shape(),
            values.dim()
        );
        for (var, value) in self.vars.iter().zip(values.iter()) {
            model.fix(*var, *value);
        }
    }

    /// Reads the values assigned to this grid by the last solve.
    pub fn values(&self, model: &MilpModel) -> Result<Array2<f64>, EmbedError> {
        if !model.has_solution() {
            return Err(EmbedError::NoSolution);
        }
        Ok(self.vars.mapv(|var| {
            model
                .value(var)
                .unwrap_or_else(|| unreachable!("solution checked above"))
        }))
    }
}
