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

//! Translation of layer sequences into MILP variables and constraints

use thiserror::Error;

pub mod layers;
pub mod network;
pub mod vars;
pub mod visitor;

#[derive(Error, Clone, Debug)]
pub enum EmbedError {
    /// Raised during validation when the network contains a layer the MILP
    /// translation does not support. No solver state is created in this case.
    #[error("Model translation unsupported for layer kind {kind}")]
    UnsupportedLayer { kind: String },
    /// Raised by error evaluation when the model has not been solved yet or
    /// was found infeasible. Recoverable: solve first, then retry.
    #[error("No solution available: optimize the model first")]
    NoSolution,
}
