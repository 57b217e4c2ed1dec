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

//! Reading pretrained layer sequences from the numpy npz format

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2};
use ndarray_npy::{NpzReader, ReadNpyError, ReadNpzError};
use regex::Regex;
use thiserror::Error;

use super::arch::{Activation, Layer, Network, ShapeError};
use crate::linalg::affine::AffFunc;

#[derive(Error, Debug)]
pub enum NetworkIoError {
    #[error("Failed to read npz archive")]
    Npz(#[from] ReadNpzError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("Layer {index} has weights but no bias")]
    MissingBias { index: usize },
    #[error("Archive contains no linear layer")]
    NoLinearLayer,
}

/// Reads a network from an npz archive.
///
/// The archive is expected to contain one entry per layer parameter, named
/// ``<index>.linear.weights`` / ``<index>.linear.bias`` for affine layers
/// and ``<index>.relu`` for ReLU layers (an ``.npy`` suffix on the entry
/// names is accepted as produced by ``numpy.savez``). Layers are assembled
/// in numeric index order; entries with other names are ignored.
pub fn read_network<P: AsRef<Path>>(path: &P) -> Result<Network, NetworkIoError> {
    let file = File::open(path)
        .map_err(ReadNpyError::from)
        .map_err(ReadNpzError::from)?;
    let mut npz = NpzReader::new(file)?;

    let names = npz.names()?;
    let pattern = Regex::new(r"^(\d+)\.(linear\.weights|linear\.bias|relu)(\.npy)?$").unwrap();

    let mut weights: BTreeMap<usize, String> = BTreeMap::new();
    let mut biases: BTreeMap<usize, String> = BTreeMap::new();
    let mut relus: BTreeSet<usize> = BTreeSet::new();

    for name in &names {
        let caps = match pattern.captures(name) {
            Some(caps) => caps,
            None => continue,
        };
        let index: usize = caps[1].parse().expect("regex only matches digits");
        match caps.get(2).map(|m| m.as_str()) {
            Some("linear.weights") => {
                weights.insert(index, name.clone());
            }
            Some("linear.bias") => {
                biases.insert(index, name.clone());
            }
            Some("relu") => {
                relus.insert(index);
            }
            _ => unreachable!(),
        }
    }

    let indices: BTreeSet<usize> = weights.keys().copied().chain(relus.iter().copied()).collect();

    let mut layers = Vec::with_capacity(indices.len());
    let mut in_dim = None;

    for index in indices {
        if relus.contains(&index) {
            layers.push(Layer::Activation(Activation::ReLU));
        } else {
            let weight_name = &weights[&index];
            let bias_name = biases
                .get(&index)
                .ok_or(NetworkIoError::MissingBias { index })?;

            let mat: Array2<f64> = npz.by_name(weight_name)?;
            let bias: Array1<f64> = npz.by_name(bias_name)?;
            let aff = AffFunc::from_mats(mat, bias);

            in_dim.get_or_insert(aff.indim());
            layers.push(Layer::Affine(aff));
        }
    }

    let in_dim = in_dim.ok_or(NetworkIoError::NoLinearLayer)?;
    Ok(Network::from_layers(in_dim, layers)?)
}
