//! Numerical gradient checks: central finite difference vs reverse-mode
//! for every differentiable op, on small fixed tensors.

use graph_core::graph::check::{check_gradients, DEFAULT_EPS};
use graph_core::{Graph, GraphDef};
use serde_json::json;

const ATOL: f32 = 1e-3;

fn graph(def: serde_json::Value) -> Graph {
    let def: GraphDef = serde_json::from_value(def).unwrap();
    Graph::from_def(def, None).unwrap()
}

#[test]
fn grad_matmul_vector() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [0.4, -0.3, 0.8, 0.1]},
            {"id": 1, "kind": "param", "shape": [2], "data": [0.5, -0.2]},
            {"id": 2, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "matmul", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));
    check_gradients(&mut g, &[0, 1], 2, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_matmul_batched() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [0.2, -0.5, 0.1, 0.7, 0.3, -0.2]},
            {"id": 1, "kind": "param", "shape": [3, 2],
             "data": [0.1, 0.4, -0.6, 0.2, 0.5, -0.3]},
            {"id": 2, "kind": "intermediate", "shape": [2, 2]}
        ],
        "ops": [{"id": 0, "op": "matmul", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));
    check_gradients(&mut g, &[0, 1], 2, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_add_broadcast() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [0.2, -0.5, 0.1, 0.7, 0.3, -0.2]},
            {"id": 1, "kind": "param", "shape": [3], "data": [0.3, -0.1, 0.6]},
            {"id": 2, "kind": "intermediate", "shape": [2, 3]},
            {"id": 3, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [
            {"id": 0, "op": "add", "inputs": [0, 1], "output": 2},
            {"id": 1, "op": "MSE", "inputs": [2], "output": 3}
        ],
        "loss": 3,
        "output": 2,
        "trainable": [0, 1]
    }));
    check_gradients(&mut g, &[0, 1], 3, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_sub_and_dot() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": [0.9, -0.4, 0.2]},
            {"id": 1, "kind": "param", "shape": [3], "data": [0.1, 0.8, -0.5]},
            {"id": 2, "kind": "intermediate", "shape": [3]},
            {"id": 3, "kind": "intermediate", "shape": []}
        ],
        "ops": [
            {"id": 0, "op": "sub", "inputs": [0, 1], "output": 2},
            {"id": 1, "op": "dot", "inputs": [2, 2], "output": 3}
        ],
        "loss": 3,
        "output": 3,
        "trainable": [0, 1]
    }));
    check_gradients(&mut g, &[0, 1], 3, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_sig() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [4], "data": [-1.5, -0.2, 0.3, 1.8]},
            {"id": 1, "kind": "intermediate", "shape": [4]}
        ],
        "ops": [{"id": 0, "op": "sig", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_relu_away_from_boundary() {
    // Exact 0 is excluded: the subgradient there makes the central
    // difference report 0.5.
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [4], "data": [-1.0, 0.5, 0.01, 2.0]},
            {"id": 1, "kind": "intermediate", "shape": [4]}
        ],
        "ops": [{"id": 0, "op": "relu", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_lrelu() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [4], "data": [-2.0, -0.5, 0.4, 1.1]},
            {"id": 1, "kind": "intermediate", "shape": [4]}
        ],
        "ops": [{"id": 0, "op": "LReLU", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_mse_mae_batched() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [0.6, -0.9, 0.2, 1.4]},
            {"id": 1, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "MSE", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, None).unwrap();

    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [0.6, -0.9, 0.2, 1.4]},
            {"id": 1, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "MAE", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_mean() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [0.2, -0.5, 0.1, 0.7, 0.3, -0.2]},
            {"id": 1, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "mean", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_softmax_full_jacobian() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [0.5, -0.3, 0.9, -1.2, 0.4, 0.0]},
            {"id": 1, "kind": "intermediate", "shape": [2, 3]},
            {"id": 2, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [
            {"id": 0, "op": "softmax", "inputs": [0], "output": 1},
            {"id": 1, "op": "MSE", "inputs": [1], "output": 2}
        ],
        "loss": 2,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 2, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_ce_dense() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": [0.5, 0.3, 0.2]},
            {"id": 1, "kind": "const", "shape": [3], "data": [0.2, 0.5, 0.3]},
            {"id": 2, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "CE", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 2, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_softmax_ce_logits() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [0.5, -0.3, 0.9, -1.2, 0.4, 0.0]},
            {"id": 1, "kind": "const", "shape": [2, 3],
             "data": [1.0, 0.0, 0.0, 0.0, 0.0, 1.0]},
            {"id": 2, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "softmax_ce_logits", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 2, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_softmax_ce_logits_label_int() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [0.5, -0.3, 0.9, -1.2, 0.4, 0.0]},
            {"id": 1, "kind": "const", "shape": [2], "data": [2.0, 0.0]},
            {"id": 2, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [
            {"id": 0, "op": "softmax_ce_logits_label_int", "inputs": [0, 1], "output": 2}
        ],
        "loss": 2,
        "output": 2,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 2, DEFAULT_EPS, ATOL, None).unwrap();
}

#[test]
fn grad_dropout_with_fixed_seed() {
    // Reseeding before every forward replays the same mask, so the
    // stochastic op becomes a fixed linear map for the check.
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [4], "data": [0.7, -0.4, 1.2, 0.3]},
            {"id": 1, "kind": "intermediate", "shape": [4]}
        ],
        "ops": [{"id": 0, "op": "dropout", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));
    check_gradients(&mut g, &[0], 1, DEFAULT_EPS, ATOL, Some(7)).unwrap();
}

#[test]
fn grad_two_layer_network() {
    // matmul -> add bias -> sig -> sub target -> MSE, the whole chain.
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "input", "shape": [1, 2], "data": [0.6, -0.2]},
            {"id": 1, "kind": "param", "shape": [2, 3],
             "data": [0.3, -0.4, 0.8, 0.2, 0.5, -0.7]},
            {"id": 2, "kind": "param", "shape": [3], "data": [0.1, -0.1, 0.2]},
            {"id": 3, "kind": "intermediate", "shape": [1, 3]},
            {"id": 4, "kind": "intermediate", "shape": [1, 3]},
            {"id": 5, "kind": "intermediate", "shape": [1, 3]},
            {"id": 6, "kind": "target", "shape": [1, 3], "data": [1.0, 0.0, 0.5]},
            {"id": 7, "kind": "intermediate", "shape": [1, 3]},
            {"id": 8, "kind": "intermediate", "shape": [1]}
        ],
        "ops": [
            {"id": 0, "op": "matmul", "inputs": [0, 1], "output": 3},
            {"id": 1, "op": "add", "inputs": [3, 2], "output": 4},
            {"id": 2, "op": "sig", "inputs": [4], "output": 5},
            {"id": 3, "op": "sub", "inputs": [5, 6], "output": 7},
            {"id": 4, "op": "MSE", "inputs": [7], "output": 8}
        ],
        "loss": 8,
        "output": 5,
        "trainable": [1, 2]
    }));
    check_gradients(&mut g, &[1, 2], 8, DEFAULT_EPS, ATOL, None).unwrap();
}
