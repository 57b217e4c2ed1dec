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

//! Layer sequences of trained feed-forward networks and their evaluation

use std::fmt::Display;

use delegate::delegate;
use ndarray::Array2;
use thiserror::Error;

use crate::linalg::affine::AffFunc;

/// Element-wise activation functions.
///
/// All kinds listed here can be evaluated with [`Network::forward`].
/// The MILP embedder supports only ``Identity`` and ``ReLU``; the remaining
/// kinds are rejected during validation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Activation {
    /// The pass-through activation f(x) = x
    Identity,
    /// The rectified linear unit f(x) = max(0, x)
    ReLU,
    /// f(x) = x if x > 0 else alpha * x
    LeakyReLU(f64),
    /// The hard hyperbolic tangent, clamping inputs to [-1, 1]
    HardTanh,
    /// The piece-wise linear approximation of the sigmoid function
    HardSigmoid,
}

impl Activation {
    /// Evaluates this activation at a single point.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::ReLU => x.max(0.),
            Activation::LeakyReLU(alpha) => {
                if x > 0. {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::HardTanh => x.clamp(-1., 1.),
            Activation::HardSigmoid => (x / 6. + 0.5).clamp(0., 1.),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Identity => "Identity",
            Activation::ReLU => "ReLU",
            Activation::LeakyReLU(_) => "LeakyReLU",
            Activation::HardTanh => "HardTanh",
            Activation::HardSigmoid => "HardSigmoid",
        }
    }
}

/// A simple enum type to specify the layer structure of a neural network.
///
/// Layers are detached numeric snapshots: an affine layer owns its weight
/// and bias matrices, an activation layer is described by its kind alone.
#[derive(Clone, Debug)]
pub enum Layer {
    /// A fully connected layer f(x) = W @ x + b
    Affine(AffFunc),
    /// An element-wise activation applied to every component of the input
    Activation(Activation),
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Affine(_) => "Affine",
            Layer::Activation(act) => act.name(),
        }
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Affine(aff) => write!(f, "Affine ({}x{})", aff.indim(), aff.outdim()),
            Layer::Activation(Activation::LeakyReLU(alpha)) => {
                write!(f, "LeakyReLU (alpha={})", alpha)
            }
            Layer::Activation(act) => write!(f, "{}", act.name()),
        }
    }
}

#[derive(Error, Clone, Debug)]
pub enum ShapeError {
    #[error("Shape mismatch: expected {expected}, got {got}")]
    Dim { expected: usize, got: usize },
    #[error("Index {index} is out of bounds (length: {len})")]
    Index { index: usize, len: usize },
}

/// An ordered sequence of layers together with its input dimension.
///
/// Networks are immutable once built and never mutated by the embedding;
/// embeddings only hold a read-only reference to them.
#[derive(Clone, Debug)]
pub struct Network {
    in_dim: usize,
    current_dim: usize,
    layers: Vec<Layer>,
}

impl Network {
    /// Creates an empty network expecting inputs of the given dimension.
    pub fn new(in_dim: usize) -> Network {
        Network {
            in_dim,
            current_dim: in_dim,
            layers: Vec::new(),
        }
    }

    /// Builds a network from an already assembled layer sequence, checking
    /// that adjacent layers have compatible dimensions.
    pub fn from_layers<I>(in_dim: usize, layers: I) -> Result<Network, ShapeError>
    where
        I: IntoIterator<Item = Layer>,
    {
        let mut net = Network::new(in_dim);
        for layer in layers {
            match layer {
                Layer::Affine(aff) => net.affine(aff)?,
                Layer::Activation(act) => net.activation(act),
            }
        }
        Ok(net)
    }

    /// Appends a fully connected layer.
    pub fn affine(&mut self, aff: AffFunc) -> Result<(), ShapeError> {
        if aff.indim() != self.current_dim {
            return Err(ShapeError::Dim {
                expected: self.current_dim,
                got: aff.indim(),
            });
        }
        self.current_dim = aff.outdim();
        self.layers.push(Layer::Affine(aff));
        Ok(())
    }

    /// Appends an element-wise activation layer.
    pub fn activation(&mut self, act: Activation) {
        self.layers.push(Layer::Activation(act));
    }

    /// Appends a ReLU activation layer.
    pub fn relu(&mut self) {
        self.activation(Activation::ReLU);
    }

    /// Appends an identity activation layer.
    pub fn identity(&mut self) {
        self.activation(Activation::Identity);
    }

    /// Appends a leaky ReLU activation layer.
    pub fn leaky_relu(&mut self, alpha: f64) {
        self.activation(Activation::LeakyReLU(alpha));
    }

    /// Appends a hard tanh activation layer.
    pub fn hard_tanh(&mut self) {
        self.activation(Activation::HardTanh);
    }

    /// Appends a hard sigmoid activation layer.
    pub fn hard_sigmoid(&mut self) {
        self.activation(Activation::HardSigmoid);
    }

    /// The declared input width of this network.
    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// The output width after the last layer added so far.
    #[inline]
    pub fn out_dim(&self) -> usize {
        self.current_dim
    }

    /// The layers of this network in evaluation order.
    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    delegate! {
        to self.layers {
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
        }
    }

    /// Evaluates this network on a batch of inputs where each row of ``x``
    /// is one sample.
    ///
    /// This is a pure numeric forward pass over the stored layer snapshots,
    /// decoupled from any gradient-tracking machinery.
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        assert_eq!(
            x.ncols(),
            self.in_dim,
            "Dimension mismatch: network expects input of width {}, got {}",
            self.in_dim,
            x.ncols()
        );

        let mut current = x.to_owned();
        for layer in &self.layers {
            current = match layer {
                Layer::Affine(aff) => aff.apply_batch(&current),
                Layer::Activation(act) => current.mapv(|v| act.apply(v)),
            };
        }
        current
    }
}
