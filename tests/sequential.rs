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

/// End-to-end tests: embed a layer sequence, solve the resulting program
/// and compare the solution against the network's own forward pass.
#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assertables::{assert_ge, assert_le};
    use ndarray::{arr1, arr2, Array, Array2};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    use relumip::embed::network::{embed, EmbedConfig};
    use relumip::embed::vars::VarArray;
    use relumip::linalg::affine::AffFunc;
    use relumip::milp::model::MilpModel;
    use relumip::milp::solve::MilpStatus;
    use relumip::nn::arch::Network;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn solve_fixed(net: &Network, x: &Array2<f64>) -> Array2<f64> {
        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, x.nrows(), x.ncols(), -100., 100.);
        let embedding = embed(&mut model, net, input, None, &EmbedConfig::default()).unwrap();

        embedding.input.fix_values(&mut model, x);
        match model.solve() {
            MilpStatus::Optimal(_) => embedding.output.values(&model).unwrap(),
            other => panic!("expected optimal solution, got {:?}", other),
        }
    }

    #[test]
    fn test_affine_roundtrip() {
        init_logger();

        // a single affine layer with 2 inputs and 3 outputs on a 1-row input
        let mut net = Network::new(2);
        net.affine(AffFunc::from_mats(
            arr2(&[[1., 2.], [-1., 0.], [0.5, -2.]]),
            arr1(&[1., 0., -1.]),
        ))
        .unwrap();

        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 2, -10., 10.);
        let vars_before = model.num_vars();
        let constrs_before = model.num_constrs();

        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

        assert_eq!(model.num_vars() - vars_before, 3);
        assert_eq!(model.num_constrs() - constrs_before, 3);

        embedding.input.fix_values(&mut model, &arr2(&[[2., -1.]]));
        assert!(matches!(model.solve(), MilpStatus::Optimal(_)));
        assert_relative_eq!(
            embedding.output.values(&model).unwrap(),
            arr2(&[[1., -2., 4.]]),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_relu_negative_input() {
        init_logger();

        let mut net = Network::new(1);
        net.relu();

        assert_relative_eq!(
            solve_fixed(&net, &arr2(&[[-2.]])),
            arr2(&[[0.]]),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_relu_positive_input() {
        init_logger();

        let mut net = Network::new(1);
        net.relu();

        assert_relative_eq!(
            solve_fixed(&net, &arr2(&[[3.]])),
            arr2(&[[3.]]),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_relu_output_never_negative() {
        init_logger();

        let mut net = Network::new(1);
        net.relu();

        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 1, -10., 10.);
        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

        // minimizing the output over all feasible points probes the
        // smallest value any solution can assign to it
        let status = model.minimize(&[(embedding.output.var(0, 0), 1.0)]);

        match status {
            MilpStatus::Optimal(sol) => {
                assert_ge!(sol[embedding.output.var(0, 0).index()], -1e-6);
            }
            other => panic!("expected optimal solution, got {:?}", other),
        }
    }

    #[test]
    fn test_identity_passthrough() {
        init_logger();

        let mut net = Network::new(2);
        net.identity();

        assert_relative_eq!(
            solve_fixed(&net, &arr2(&[[1.5, -2.5]])),
            arr2(&[[1.5, -2.5]]),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_two_layer_network_batch() {
        init_logger();

        let mut net = Network::new(2);
        net.affine(AffFunc::from_mats(
            arr2(&[[1., -1.], [2., 1.]]),
            arr1(&[0., -1.]),
        ))
        .unwrap();
        net.relu();
        net.affine(AffFunc::from_mats(arr2(&[[1., 1.]]), arr1(&[0.5])))
            .unwrap();

        let x = arr2(&[[3., 1.], [-1., 0.], [0., 0.]]);

        assert_relative_eq!(solve_fixed(&net, &x), net.forward(&x), epsilon = 1e-5);
    }

    #[test]
    fn test_forward_agreement_random() {
        init_logger();

        let mut net = Network::new(3);
        net.affine(AffFunc::from_mats(
            Array::random((4, 3), Uniform::new(-1., 1.)),
            Array::random(4, Uniform::new(-1., 1.)),
        ))
        .unwrap();
        net.relu();
        net.affine(AffFunc::from_mats(
            Array::random((2, 4), Uniform::new(-1., 1.)),
            Array::random(2, Uniform::new(-1., 1.)),
        ))
        .unwrap();

        let x = Array::random((2, 3), Uniform::new(-2., 2.));

        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 2, 3, -5., 5.);
        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

        embedding.input.fix_values(&mut model, &x);
        assert!(matches!(model.solve(), MilpStatus::Optimal(_)));

        assert_le!(embedding.max_abs_error(&model).unwrap(), 1e-5);
    }

    #[test]
    fn test_maximize_over_input_region() {
        init_logger();

        // y = max(0, x0 - x1); over the box [-1, 1]^2 its maximum is 2
        let mut net = Network::new(2);
        net.affine(AffFunc::from_mats(arr2(&[[1., -1.]]), arr1(&[0.])))
            .unwrap();
        net.relu();

        let mut model = MilpModel::new();
        let input = VarArray::new(&mut model, 1, 2, -1., 1.);
        let embedding = embed(&mut model, &net, input, None, &EmbedConfig::default()).unwrap();

        let out = embedding.output.var(0, 0);
        let status = model.minimize(&[(out, -1.0)]);

        match status {
            MilpStatus::Optimal(sol) => {
                assert_relative_eq!(sol[out.index()], 2.0, epsilon = 1e-6);
            }
            other => panic!("expected optimal solution, got {:?}", other),
        }

        // the solved witness must itself be a valid forward pass
        assert_le!(embedding.max_abs_error(&model).unwrap(), 1e-6);
    }
}
