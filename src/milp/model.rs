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

//! An append-only store of MILP variables and linear constraints

use ndarray::Array1;

/// Handle of a decision variable of a [`MilpModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Var(pub(crate) usize);

impl Var {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Handle of a linear constraint of a [`MilpModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Constr(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct VarDef {
    pub lb: f64,
    pub ub: f64,
    pub kind: VarKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstrOp {
    Eq,
    Le,
    Ge,
}

#[derive(Clone, Debug)]
pub(crate) struct LinConstr {
    pub terms: Vec<(Var, f64)>,
    pub op: ConstrOp,
    pub rhs: f64,
}

/// A mixed-integer linear program under construction.
///
/// The model is a shared mutable resource with an append-only discipline:
/// variables and constraints are only ever added, existing entries are never
/// removed or rewritten. After a successful [`solve`](crate::milp::solve)
/// call the assigned values can be queried per variable via [`MilpModel::value`].
#[derive(Clone, Debug, Default)]
pub struct MilpModel {
    pub(crate) vars: Vec<VarDef>,
    pub(crate) constrs: Vec<LinConstr>,
    pub(crate) solution: Option<Array1<f64>>,
}

impl MilpModel {
    pub fn new() -> MilpModel {
        MilpModel {
            vars: Vec::new(),
            constrs: Vec::new(),
            solution: None,
        }
    }

    /// Adds a continuous decision variable with the given bounds.
    ///
    /// Unbounded variables are expressed with infinite bounds.
    pub fn add_var(&mut self, lb: f64, ub: f64) -> Var {
        assert!(
            lb <= ub,
            "Invalid variable bounds: lower {} exceeds upper {}",
            lb,
            ub
        );
        self.vars.push(VarDef {
            lb,
            ub,
            kind: VarKind::Continuous,
        });
        Var(self.vars.len() - 1)
    }

    /// Adds a binary decision variable with domain {0, 1}.
    pub fn add_binary(&mut self) -> Var {
        self.vars.push(VarDef {
            lb: 0.,
            ub: 1.,
            kind: VarKind::Binary,
        });
        Var(self.vars.len() - 1)
    }

    /// Adds a linear constraint ``terms (op) rhs``.
    pub fn add_constr(&mut self, terms: Vec<(Var, f64)>, op: ConstrOp, rhs: f64) -> Constr {
        debug_assert!(
            terms.iter().all(|(var, _)| var.0 < self.vars.len()),
            "Constraint references a variable of a different model"
        );
        self.constrs.push(LinConstr { terms, op, rhs });
        Constr(self.constrs.len() - 1)
    }

    /// Adds a linear equality constraint ``terms == rhs``.
    #[inline]
    pub fn add_eq(&mut self, terms: Vec<(Var, f64)>, rhs: f64) -> Constr {
        self.add_constr(terms, ConstrOp::Eq, rhs)
    }

    /// Adds a linear inequality constraint ``terms <= rhs``.
    #[inline]
    pub fn add_le(&mut self, terms: Vec<(Var, f64)>, rhs: f64) -> Constr {
        self.add_constr(terms, ConstrOp::Le, rhs)
    }

    /// Adds a linear inequality constraint ``terms >= rhs``.
    #[inline]
    pub fn add_ge(&mut self, terms: Vec<(Var, f64)>, rhs: f64) -> Constr {
        self.add_constr(terms, ConstrOp::Ge, rhs)
    }

    /// Pins a variable to a fixed value with an equality constraint.
    #[inline]
    pub fn fix(&mut self, var: Var, value: f64) -> Constr {
        self.add_eq(vec![(var, 1.0)], value)
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn num_constrs(&self) -> usize {
        self.constrs.len()
    }

    #[inline]
    pub fn num_binaries(&self) -> usize {
        self.vars
            .iter()
            .filter(|def| def.kind == VarKind::Binary)
            .count()
    }

    #[inline]
    pub fn lower_bound(&self, var: Var) -> f64 {
        self.vars[var.0].lb
    }

    #[inline]
    pub fn upper_bound(&self, var: Var) -> f64 {
        self.vars[var.0].ub
    }

    #[inline]
    pub fn kind(&self, var: Var) -> VarKind {
        self.vars[var.0].kind
    }

    /// Returns whether the model currently holds a completed solution.
    #[inline]
    pub fn has_solution(&self) -> bool {
        self.solution.is_some()
    }

    /// The value assigned to ``var`` by the last successful solve, if any.
    #[inline]
    pub fn value(&self, var: Var) -> Option<f64> {
        self.solution.as_ref().map(|sol| sol[var.0])
    }
}
