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

//! Embedding whole networks by chaining per-layer encoders

use std::path::Path;

use float_ord::FloatOrd;
use log::debug;
use ndarray::Array2;

use super::layers::{encode_activation, encode_affine, LayerEmbedding};
use super::vars::VarArray;
use super::visitor::{EmbedConsole, EmbedCsv, EmbedVisitor, NoOpVis};
use super::EmbedError;
use crate::milp::model::MilpModel;
use crate::nn::arch::{Activation, Layer, Network};

/// Tunables of the embedding process.
#[derive(Clone, Debug)]
pub struct EmbedConfig {
    /// Substitute magnitude for infinite variable bounds when a finite
    /// big-M constant is required by the ReLU encoding.
    pub default_bound: f64,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfig {
            default_bound: 1e6,
        }
    }
}

/// The complete embedding of a network into a model.
///
/// Holds a read-only reference to the embedded network, the overall input
/// and output variable grids, and one [`LayerEmbedding`] per network layer.
/// The output grid of each layer embedding is identical (same variable
/// handles) to the input grid of its successor.
#[derive(Clone, Debug)]
pub struct NetworkEmbedding<'a> {
    pub network: &'a Network,
    pub input: VarArray,
    pub output: VarArray,
    pub layers: Vec<LayerEmbedding>,
}

impl NetworkEmbedding<'_> {
    /// Compares the model's solution against the network's own forward pass.
    ///
    /// Reads the solved input values, recomputes the forward pass on them
    /// numerically, and returns the element-wise difference to the solved
    /// output values. The model is not mutated.
    ///
    /// Fails with [`EmbedError::NoSolution`] if the model has not been
    /// solved yet or was found infeasible.
    pub fn get_error(&self, model: &MilpModel) -> Result<Array2<f64>, EmbedError> {
        let x = self.input.values(model)?;
        let y = self.output.values(model)?;
        Ok(self.network.forward(&x) - y)
    }

    /// The largest absolute entry of [`NetworkEmbedding::get_error`].
    pub fn max_abs_error(&self, model: &MilpModel) -> Result<f64, EmbedError> {
        let error = self.get_error(model)?;
        Ok(error
            .iter()
            .map(|e| FloatOrd(e.abs()))
            .max()
            .map(|FloatOrd(e)| e)
            .unwrap_or(0.))
    }
}

/// Checks a single layer for MILP support.
///
/// Validation and encoding both consult this predicate, so the two passes
/// cannot disagree on which layers are legal.
fn check_layer(layer: &Layer) -> Result<(), EmbedError> {
    match layer {
        Layer::Affine(_) => Ok(()),
        Layer::Activation(Activation::Identity) | Layer::Activation(Activation::ReLU) => Ok(()),
        Layer::Activation(other) => Err(EmbedError::UnsupportedLayer {
            kind: other.name().to_string(),
        }),
    }
}

/// Scans every layer of ``network`` for MILP support.
///
/// This pass touches no solver state: if it fails, the model is exactly as
/// it was before the embedding call.
pub fn validate(network: &Network) -> Result<(), EmbedError> {
    for layer in network.layers() {
        check_layer(layer)?;
    }
    Ok(())
}

/// Embeds ``network`` into ``model``.
///
/// ``input`` supplies the variables fed into the first layer and must have
/// column count equal to the network's declared input width. If ``output``
/// is given, it is used as the last layer's output grid and must match the
/// network's output width; otherwise a fresh grid is created.
///
/// Fails with [`EmbedError::UnsupportedLayer`] before any variable or
/// constraint is created if the network contains a layer kind the
/// translation does not support.
pub fn embed<'a>(
    model: &mut MilpModel,
    network: &'a Network,
    input: VarArray,
    output: Option<VarArray>,
    config: &EmbedConfig,
) -> Result<NetworkEmbedding<'a>, EmbedError> {
    embed_generic(model, network, input, output, config, &mut NoOpVis {})
}

/// Specialization of [`embed_generic`] that logs the progress of every
/// layer to the console.
pub fn embed_verbose<'a>(
    model: &mut MilpModel,
    network: &'a Network,
    input: VarArray,
    output: Option<VarArray>,
    config: &EmbedConfig,
) -> Result<NetworkEmbedding<'a>, EmbedError> {
    embed_generic(
        model,
        network,
        input,
        output,
        config,
        &mut EmbedConsole::new(),
    )
}

/// Specialization of [`embed_generic`] that records per-layer statistics
/// in a csv file located at ``path``.
pub fn embed_csv<'a, P: AsRef<Path>>(
    model: &mut MilpModel,
    network: &'a Network,
    input: VarArray,
    output: Option<VarArray>,
    config: &EmbedConfig,
    path: P,
) -> Result<NetworkEmbedding<'a>, EmbedError> {
    embed_generic(
        model,
        network,
        input,
        output,
        config,
        &mut EmbedCsv::new(path),
    )
}

/// Generic implementation of the embedding process.
///
/// After validation, the layers are walked in order while a "current input"
/// grid is threaded from each layer's output into the next layer's input.
/// All layers but the last receive freshly created output grids; the last
/// layer writes into the caller-supplied ``output`` grid if one was given.
///
/// Behavior can be customized by providing an appropriate ``visitor``.
pub fn embed_generic<'a, Visitor>(
    model: &mut MilpModel,
    network: &'a Network,
    input: VarArray,
    output: Option<VarArray>,
    config: &EmbedConfig,
    visitor: &mut Visitor,
) -> Result<NetworkEmbedding<'a>, EmbedError>
where
    Visitor: EmbedVisitor,
{
    assert!(!network.is_empty(), "Cannot embed a network without layers");
    assert_eq!(
        input.ncols(),
        network.in_dim(),
        "Dimension mismatch: network expects input of width {}, got {}",
        network.in_dim(),
        input.ncols()
    );
    if let Some(out) = &output {
        assert_eq!(
            out.shape(),
            (input.nrows(), network.out_dim()),
            "Dimension mismatch: network produces {:?}, output array is {:?}",
            (input.nrows(), network.out_dim()),
            out.shape()
        );
    }

    validate(network)?;

    visitor.start_embed(network.len(), input.nrows());

    let (last, head) = network
        .layers()
        .split_last()
        .unwrap_or_else(|| unreachable!("emptiness checked above"));

    let mut layers = Vec::with_capacity(network.len());
    let mut current = input.clone();

    for layer in head {
        let embedding = encode_step(model, layer, &current, None, config, visitor)?;
        current = embedding.output.clone();
        layers.push(embedding);
    }

    // terminal step: the caller's output grid, if any, becomes the output
    // of the final layer
    let embedding = encode_step(model, last, &current, output, config, visitor)?;
    let output = embedding.output.clone();
    layers.push(embedding);

    visitor.finish_embed(model.num_vars(), model.num_constrs());
    debug!(
        "embedded {} layers into {} variables and {} constraints",
        layers.len(),
        model.num_vars(),
        model.num_constrs()
    );

    Ok(NetworkEmbedding {
        network,
        input,
        output,
        layers,
    })
}

fn encode_step<Visitor>(
    model: &mut MilpModel,
    layer: &Layer,
    input: &VarArray,
    output: Option<VarArray>,
    config: &EmbedConfig,
    visitor: &mut Visitor,
) -> Result<LayerEmbedding, EmbedError>
where
    Visitor: EmbedVisitor,
{
    visitor.start_layer(layer);
    let vars_before = model.num_vars();
    let constrs_before = model.num_constrs();

    let embedding = match layer {
        Layer::Affine(aff) => encode_affine(model, input, aff, output),
        Layer::Activation(kind) => encode_activation(model, input, *kind, output, config)?,
    };

    visitor.finish_layer(
        layer,
        model.num_vars() - vars_before,
        model.num_constrs() - constrs_before,
        embedding.binaries.len(),
    );
    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2, Array2};

    use super::*;
    use crate::linalg::affine::AffFunc;
    use crate::milp::solve::MilpStatus;

    fn toy_net() -> Network {
        let mut net = Network::new(2);
        net.affine(AffFunc::from_mats(
            arr2(&[[1., -1.], [0.5, 2.]]),
            arr1(&[0.5, -1.]),
        ))
        .unwrap();
        net.relu();
        net.affine(AffFunc::from_mats(arr2(&[[1., 1.]]), arr1(&[-0.25])))
            .unwrap();
        net
    }

    #[test]
    fn test_validate() {
        assert!(validate(&toy_net()).is_ok());

        let mut net = toy_net();
        net.hard_sigmoid();
        assert!(matches!(
            validate(&net),
            Err(EmbedError::UnsupportedLayer { .. })
        ));
    }

    #[test]
    fn test_layer_chaining() {
        let net = toy_net();
        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 2, -5., 5.);

        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

        assert_eq!(embedding.layers.len(), net.len());
        for pair in embedding.layers.windows(2) {
            assert_eq!(pair[0].output, pair[1].input);
        }
        assert_eq!(embedding.input, embedding.layers[0].input);
        assert_eq!(
            embedding.output,
            embedding.layers.last().unwrap().output
        );
    }

    #[test]
    fn test_supplied_output() {
        let net = toy_net();
        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 2, -5., 5.);
        let output = VarArray::new(&mut model, 1, 1, f64::NEG_INFINITY, f64::INFINITY);

        let embedding = embed(
            &mut model,
            &net,
            input,
            Some(output.clone()),
            &EmbedConfig::default(),
        )
        .unwrap();

        assert_eq!(embedding.output, output);
        assert_eq!(embedding.layers.last().unwrap().output, output);
    }

    #[test]
    fn test_no_mutation_on_unsupported_layer() {
        let mut net = toy_net();
        net.leaky_relu(0.01);

        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 2, -5., 5.);
        let vars_before = model.num_vars();
        let constrs_before = model.num_constrs();

        let result = embed(&mut model, &net, input, None, &EmbedConfig::default());

        assert!(matches!(
            result,
            Err(EmbedError::UnsupportedLayer { ref kind }) if kind == "LeakyReLU"
        ));
        assert_eq!(model.num_vars(), vars_before);
        assert_eq!(model.num_constrs(), constrs_before);
    }

    #[test]
    fn test_get_error_zero_on_solution() {
        let net = toy_net();
        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 2, 2, -5., 5.);

        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();
        embedding
            .input
            .fix_values(&mut model, &arr2(&[[3., -1.], [-2., 0.5]]));

        assert!(matches!(model.solve(), MilpStatus::Optimal(_)));

        let error = embedding.get_error(&model).unwrap();
        assert_eq!(error.dim(), (2, 1));
        assert_relative_eq!(error, Array2::zeros((2, 1)), epsilon = 1e-6);
        assert!(embedding.max_abs_error(&model).unwrap() < 1e-6);
    }

    #[test]
    fn test_get_error_without_solution() {
        let net = toy_net();
        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 2, -5., 5.);

        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

        assert!(matches!(
            embedding.get_error(&model),
            Err(EmbedError::NoSolution)
        ));
    }
}
