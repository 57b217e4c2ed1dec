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

/*!
Exact embeddings of neural networks into mixed-integer linear programs.

This crate translates a trained feed-forward neural network (alternating
affine layers and piece-wise linear activations) into decision variables and
constraints of a [MILP](https://en.wikipedia.org/wiki/Integer_programming)
model such that feasible assignments of the optimizer variables correspond
exactly to forward passes of the network. The embedding is not a convex
relaxation: for the ReLU activation a big-M formulation with binary
indicator variables is used whose feasible set is precisely the ReLU graph.

`relumip` supports the following operations:
 - embed a sequence of affine and ReLU layers into a [`MilpModel`](crate::milp::model::MilpModel)
 - solve the resulting program exactly with a branch-and-bound over the
   indicator variables (LP relaxations via `minilp`)
 - evaluate the network on solved input values and compare against the
   solved output values ([`get_error`](crate::embed::network::NetworkEmbedding::get_error))
 - load pretrained layer stacks from the `numpy` npz format

# Quick Start
Networks are described by the [`Network`](crate::nn::arch::Network) struct,
whose affine layers are encoded with [`AffFunc`](crate::linalg::affine::AffFunc)
based on `ndarray` matrices. The following example embeds a small ReLU
network over two inputs and checks the solution against the network's own
forward pass:

```rust
use ndarray::{arr1, arr2};
use relumip::embed::network::{embed, EmbedConfig};
use relumip::embed::vars::VarArray;
use relumip::linalg::affine::AffFunc;
use relumip::milp::model::MilpModel;
use relumip::milp::solve::MilpStatus;
use relumip::nn::arch::Network;

let mut net = Network::new(2);
net.affine(AffFunc::from_mats(
    arr2(&[[1.0, -1.0], [0.5, 2.0]]),
    arr1(&[0.5, -1.0]),
)).unwrap();
net.relu();

let mut model = MilpModel::new();
let input = VarArray::new(&mut model, 1, 2, -10.0, 10.0);
let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

embedding.input.fix_values(&mut model, &arr2(&[[3.0, -1.0]]));
assert!(matches!(model.solve(), MilpStatus::Optimal(_)));

let error = embedding.get_error(&model).unwrap();
assert!(error.iter().all(|e| e.abs() < 1e-6));
```

# Exactness
The crux of the embedding is the rectified-linear unit. For a pre-activation
variable `x` with bounds `[l, u]` the crate adds a binary `d` and the
constraints `y >= 0`, `y >= x`, `y <= u*d` and `y <= x - l*(1 - d)`. The
bounds `[l, u]` are derived by interval propagation from the declared bounds
of the input variables through every affine layer. Whenever these bounds are
valid the feasible set of the encoding projected onto `(x, y)` is exactly
`y = max(0, x)`. Neurons whose bounds already fix the active phase are
encoded without a binary.

Networks may contain further activations (leaky ReLU, hard tanh, hard
sigmoid) for evaluation purposes, but the embedder only supports affine,
identity and ReLU layers and rejects everything else up front, before any
variable or constraint is created.
*/

#![warn(
    missing_debug_implementations,
    rust_2021_compatibility
)]

pub mod embed;
pub mod linalg;
pub mod milp;
pub mod nn;
