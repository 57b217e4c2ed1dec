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

//! Exact MILP solving via branch-and-bound over LP relaxations

use float_ord::FloatOrd;
use log::{debug, trace};
use minilp::{ComparisonOp, OptimizationDirection, Problem, Variable};
use ndarray::Array1;

use super::model::{ConstrOp, MilpModel, Var, VarKind};

/// Tolerance under which a relaxed binary counts as integral.
const INT_TOL: f64 = 1e-6;

/// Result of solving a [`MilpModel`].
#[derive(Clone, Debug, PartialEq)]
pub enum MilpStatus {
    Infeasible,
    Unbounded,
    Optimal(Array1<f64>),
}

impl MilpModel {
    /// Searches for any feasible assignment of the model's variables.
    ///
    /// On success the solution is retained on the model and can be queried
    /// via [`MilpModel::value`](crate::milp::model::MilpModel::value).
    pub fn solve(&mut self) -> MilpStatus {
        self.minimize(&[])
    }

    /// Minimizes the given linear objective over the model's feasible set.
    pub fn minimize(&mut self, objective: &[(Var, f64)]) -> MilpStatus {
        let status = self.branch_and_bound(objective);
        if let MilpStatus::Optimal(sol) = &status {
            self.solution = Some(sol.clone());
        }
        status
    }

    /// Depth-first branch-and-bound over the binary variables, solving one
    /// LP relaxation per node with `minilp`.
    fn branch_and_bound(&self, objective: &[(Var, f64)]) -> MilpStatus {
        let mut obj = vec![0.0; self.vars.len()];
        for (var, coeff) in objective {
            obj[var.index()] += *coeff;
        }

        let binaries: Vec<usize> = self
            .vars
            .iter()
            .enumerate()
            .filter(|(_, def)| def.kind == VarKind::Binary)
            .map(|(idx, _)| idx)
            .collect();

        // each node is described by the binaries fixed on the path to it
        let mut stack: Vec<Vec<(usize, f64)>> = vec![Vec::new()];
        let mut best: Option<(f64, Array1<f64>)> = None;
        let mut nodes = 0usize;

        while let Some(fixings) = stack.pop() {
            nodes += 1;
            let relaxation = self.solve_relaxation(&obj, &fixings);

            let (objval, values) = match relaxation {
                Err(minilp::Error::Infeasible) => continue,
                Err(minilp::Error::Unbounded) => return MilpStatus::Unbounded,
                Ok(sol) => sol,
            };

            if let Some((incumbent, _)) = &best {
                if objval >= incumbent - 1e-9 {
                    continue;
                }
            }

            let fractional = binaries
                .iter()
                .map(|&idx| {
                    let v = values[idx];
                    (idx, v, (v - v.round()).abs())
                })
                .filter(|(_, _, frac)| *frac > INT_TOL)
                .max_by_key(|(_, _, frac)| FloatOrd(*frac));

            match fractional {
                None => {
                    trace!(
                        "incumbent with objective {} after {} nodes",
                        objval,
                        nodes
                    );
                    best = Some((objval, values));
                }
                Some((idx, value, _)) => {
                    let mut down = fixings.clone();
                    down.push((idx, 0.0));
                    let mut up = fixings;
                    up.push((idx, 1.0));

                    // explore the branch suggested by the relaxation first
                    if value > 0.5 {
                        stack.push(down);
                        stack.push(up);
                    } else {
                        stack.push(up);
                        stack.push(down);
                    }
                }
            }
        }

        debug!("branch-and-bound finished after {} nodes", nodes);

        match best {
            Some((_, sol)) => MilpStatus::Optimal(sol),
            None => MilpStatus::Infeasible,
        }
    }

    /// Solves the LP relaxation of this model with the given binary fixings.
    fn solve_relaxation(
        &self,
        obj: &[f64],
        fixings: &[(usize, f64)],
    ) -> Result<(f64, Array1<f64>), minilp::Error> {
        let mut pb = Problem::new(OptimizationDirection::Minimize);

        let mut fixed: Vec<Option<f64>> = vec![None; self.vars.len()];
        for (idx, value) in fixings {
            fixed[*idx] = Some(*value);
        }

        let vars: Vec<Variable> = self
            .vars
            .iter()
            .enumerate()
            .map(|(idx, def)| {
                let (lb, ub) = match fixed[idx] {
                    Some(value) => (value, value),
                    None => (def.lb, def.ub),
                };
                pb.add_var(obj[idx], (lb, ub))
            })
            .collect();

        for constr in &self.constrs {
            let terms: Vec<(Variable, f64)> = constr
                .terms
                .iter()
                .map(|(var, coeff)| (vars[var.index()], *coeff))
                .collect();
            let op = match constr.op {
                ConstrOp::Eq => ComparisonOp::Eq,
                ConstrOp::Le => ComparisonOp::Le,
                ConstrOp::Ge => ComparisonOp::Ge,
            };
            pb.add_constraint(terms.as_slice(), op, constr.rhs);
        }

        let sol = pb.solve()?;
        let values = Array1::from_iter(vars.iter().map(|var| sol[*var]));
        Ok((sol.objective(), values))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::arr1;

    use super::*;

    #[test]
    fn test_lp_feasible() {
        let mut model = MilpModel::new();
        let x = model.add_var(0., 4.);
        let y = model.add_var(0., 4.);
        model.add_ge(vec![(x, 1.0), (y, 1.0)], 3.0);

        assert!(matches!(model.solve(), MilpStatus::Optimal(_)));
        assert!(model.has_solution());
    }

    #[test]
    fn test_lp_infeasible() {
        let mut model = MilpModel::new();
        let x = model.add_var(0., 1.);
        model.add_ge(vec![(x, 1.0)], 2.0);

        assert_eq!(model.solve(), MilpStatus::Infeasible);
        assert!(!model.has_solution());
    }

    #[test]
    fn test_lp_unbounded() {
        let mut model = MilpModel::new();
        let x = model.add_var(f64::NEG_INFINITY, f64::INFINITY);
        model.add_le(vec![(x, 1.0)], 5.0);

        assert_eq!(model.minimize(&[(x, 1.0)]), MilpStatus::Unbounded);
    }

    #[test]
    fn test_minimize_lp() {
        let mut model = MilpModel::new();
        let x = model.add_var(0., 10.);
        let y = model.add_var(0., 10.);
        model.add_ge(vec![(x, 1.0), (y, 2.0)], 4.0);

        let status = model.minimize(&[(x, 1.0), (y, 1.0)]);

        // optimum at x = 0, y = 2
        match status {
            MilpStatus::Optimal(sol) => {
                assert_relative_eq!(sol[x.index()], 0.0, epsilon = 1e-6);
                assert_relative_eq!(sol[y.index()], 2.0, epsilon = 1e-6);
            }
            other => panic!("expected optimal solution, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_branching() {
        // minimize x + 10 d  s.t.  x >= 1 - 5 d,  x <= 5 d, x in [0, 5]
        // d = 0 forces x >= 1 and x <= 0, infeasible; hence d = 1, x = 0
        let mut model = MilpModel::new();
        let x = model.add_var(0., 5.);
        let d = model.add_binary();
        model.add_ge(vec![(x, 1.0), (d, 5.0)], 1.0);
        model.add_le(vec![(x, 1.0), (d, -5.0)], 0.0);

        let status = model.minimize(&[(x, 1.0), (d, 10.0)]);

        match status {
            MilpStatus::Optimal(sol) => {
                assert_relative_eq!(sol[d.index()], 1.0, epsilon = 1e-6);
                assert_relative_eq!(sol[x.index()], 0.0, epsilon = 1e-6);
            }
            other => panic!("expected optimal solution, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_knapsack() {
        // maximize value == minimize negated value over three items
        let mut model = MilpModel::new();
        let items: Vec<_> = (0..3).map(|_| model.add_binary()).collect();
        let weights = [3.0, 4.0, 5.0];
        let values = [4.0, 5.0, 7.0];

        let capacity: Vec<(Var, f64)> =
            items.iter().zip(weights).map(|(d, w)| (*d, w)).collect();
        model.add_le(capacity, 7.0);

        let objective: Vec<(Var, f64)> =
            items.iter().zip(values).map(|(d, v)| (*d, -v)).collect();
        let status = model.minimize(&objective);

        // best packing is items 0 and 1 (weight 7, value 9)
        match status {
            MilpStatus::Optimal(sol) => {
                assert_relative_eq!(
                    arr1(&[
                        sol[items[0].index()],
                        sol[items[1].index()],
                        sol[items[2].index()]
                    ]),
                    arr1(&[1.0, 1.0, 0.0]),
                    epsilon = 1e-6
                );
            }
            other => panic!("expected optimal solution, got {:?}", other),
        }
    }

    #[test]
    fn test_solution_retained() {
        let mut model = MilpModel::new();
        let x = model.add_var(0., 5.);
        model.add_ge(vec![(x, 1.0)], 2.0);
        model.add_le(vec![(x, 1.0)], 2.0);
        model.solve();

        assert_relative_eq!(model.value(x).unwrap(), 2.0, epsilon = 1e-6);
    }
}
