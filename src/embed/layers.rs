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

//! Per-layer encoders turning affine maps and activations into constraints

use itertools::iproduct;
use log::trace;
use ndarray::Array2;

use super::network::EmbedConfig;
use super::vars::VarArray;
use super::EmbedError;
use crate::linalg::affine::AffFunc;
use crate::milp::model::{Constr, MilpModel, Var};
use crate::nn::arch::Activation;

/// The variables and constraints added to a model for a single layer.
///
/// The ``input`` grid is shared with the predecessor layer (or the caller),
/// the ``output`` grid with the successor layer.
#[derive(Clone, Debug)]
pub struct LayerEmbedding {
    pub input: VarArray,
    pub output: VarArray,
    pub constrs: Vec<Constr>,
    pub binaries: Vec<Var>,
}

/// Encodes ``output = input @ W^T + b`` with one equality constraint per
/// sample row and output column.
///
/// If no ``output`` grid is supplied, a fresh one is created whose bounds
/// are obtained by interval propagation from the bounds of ``input``.
pub fn encode_affine(
    model: &mut MilpModel,
    input: &VarArray,
    func: &AffFunc,
    output: Option<VarArray>,
) -> LayerEmbedding {
    assert_eq!(
        input.ncols(),
        func.indim(),
        "Dimension mismatch: affine layer expects input of width {}, got {}",
        func.indim(),
        input.ncols()
    );

    let output = output.unwrap_or_else(|| {
        let (lb, ub) = propagate_affine(model, input, func);
        VarArray::with_bounds(model, &lb, &ub)
    });
    assert_eq!(
        output.shape(),
        (input.nrows(), func.outdim()),
        "Dimension mismatch: affine layer produces {:?}, output array is {:?}",
        (input.nrows(), func.outdim()),
        output.shape()
    );

    let mut constrs = Vec::with_capacity(input.nrows() * func.outdim());
    for row in 0..input.nrows() {
        for col in 0..func.outdim() {
            let mut terms = Vec::with_capacity(func.indim() + 1);
            terms.push((output.var(row, col), 1.0));
            for j in 0..func.indim() {
                let w = func.mat[[col, j]];
                if w != 0.0 {
                    terms.push((input.var(row, j), -w));
                }
            }
            constrs.push(model.add_eq(terms, func.bias[col]));
        }
    }

    trace!(
        "encoded affine layer ({}x{}) with {} equalities",
        func.indim(),
        func.outdim(),
        constrs.len()
    );

    LayerEmbedding {
        input: input.clone(),
        output,
        constrs,
        binaries: Vec::new(),
    }
}

/// Encodes an element-wise activation over every entry of ``input``.
///
/// Identity becomes plain equalities. ReLU is encoded exactly with the
/// big-M scheme described in the crate documentation, using the bounds of
/// each pre-activation variable as big-M constants (clipped to
/// [`EmbedConfig::default_bound`] where they are infinite). Unsupported
/// activation kinds are rejected; validation guarantees they never reach
/// this point during a network embedding.
pub fn encode_activation(
    model: &mut MilpModel,
    input: &VarArray,
    kind: Activation,
    output: Option<VarArray>,
    config: &EmbedConfig,
) -> Result<LayerEmbedding, EmbedError> {
    match kind {
        Activation::Identity => Ok(encode_identity(model, input, output)),
        Activation::ReLU => Ok(encode_relu(model, input, output, config)),
        other => Err(EmbedError::UnsupportedLayer {
            kind: other.name().to_string(),
        }),
    }
}

fn encode_identity(
    model: &mut MilpModel,
    input: &VarArray,
    output: Option<VarArray>,
) -> LayerEmbedding {
    let output = output.unwrap_or_else(|| {
        let lb = input.lower(model);
        let ub = input.upper(model);
        VarArray::with_bounds(model, &lb, &ub)
    });
    assert_eq!(
        output.shape(),
        input.shape(),
        "Dimension mismatch: identity layer preserves {:?}, output array is {:?}",
        input.shape(),
        output.shape()
    );

    let mut constrs = Vec::with_capacity(input.nrows() * input.ncols());
    for (row, col) in iproduct!(0..input.nrows(), 0..input.ncols()) {
        constrs.push(model.add_eq(
            vec![(output.var(row, col), 1.0), (input.var(row, col), -1.0)],
            0.0,
        ));
    }

    LayerEmbedding {
        input: input.clone(),
        output,
        constrs,
        binaries: Vec::new(),
    }
}

fn encode_relu(
    model: &mut MilpModel,
    input: &VarArray,
    output: Option<VarArray>,
    config: &EmbedConfig,
) -> LayerEmbedding {
    let in_lb = input.lower(model);
    let in_ub = input.upper(model);

    let output = output.unwrap_or_else(|| {
        let lb = in_lb.mapv(|l| l.max(0.));
        let ub = in_ub.mapv(|u| finite_or(u, config.default_bound).max(0.));
        VarArray::with_bounds(model, &lb, &ub)
    });
    assert_eq!(
        output.shape(),
        input.shape(),
        "Dimension mismatch: ReLU layer preserves {:?}, output array is {:?}",
        input.shape(),
        output.shape()
    );

    let mut constrs = Vec::new();
    let mut binaries = Vec::new();

    for (row, col) in iproduct!(0..input.nrows(), 0..input.ncols()) {
        let x = input.var(row, col);
        let y = output.var(row, col);
        let l = finite_or(in_lb[[row, col]], -config.default_bound);
        let u = finite_or(in_ub[[row, col]], config.default_bound);

        if u <= 0.0 {
            // stably inactive neuron
            constrs.push(model.add_eq(vec![(y, 1.0)], 0.0));
        } else if l >= 0.0 {
            // stably active neuron
            constrs.push(model.add_eq(vec![(y, 1.0), (x, -1.0)], 0.0));
        } else {
            let d = model.add_binary();
            constrs.push(model.add_ge(vec![(y, 1.0)], 0.0));
            constrs.push(model.add_ge(vec![(y, 1.0), (x, -1.0)], 0.0));
            // d = 0 forces y = 0 (and thereby x <= 0), d = 1 forces y = x
            constrs.push(model.add_le(vec![(y, 1.0), (d, -u)], 0.0));
            constrs.push(model.add_le(vec![(y, 1.0), (x, -1.0), (d, -l)], -l));
            binaries.push(d);
        }
    }

    trace!(
        "encoded ReLU layer over {:?} with {} binaries",
        input.shape(),
        binaries.len()
    );

    LayerEmbedding {
        input: input.clone(),
        output,
        constrs,
        binaries,
    }
}

/// Interval propagation of variable bounds through an affine map.
fn propagate_affine(
    model: &MilpModel,
    input: &VarArray,
    func: &AffFunc,
) -> (Array2<f64>, Array2<f64>) {
    let in_lb = input.lower(model);
    let in_ub = input.upper(model);

    let mut lb = Array2::zeros((input.nrows(), func.outdim()));
    let mut ub = Array2::zeros((input.nrows(), func.outdim()));

    for row in 0..input.nrows() {
        for col in 0..func.outdim() {
            let mut lo = func.bias[col];
            let mut hi = func.bias[col];
            for j in 0..func.indim() {
                let w = func.mat[[col, j]];
                if w > 0.0 {
                    lo += w * in_lb[[row, j]];
                    hi += w * in_ub[[row, j]];
                } else if w < 0.0 {
                    lo += w * in_ub[[row, j]];
                    hi += w * in_lb[[row, j]];
                }
            }
            lb[[row, col]] = lo;
            ub[[row, col]] = hi;
        }
    }

    (lb, ub)
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
