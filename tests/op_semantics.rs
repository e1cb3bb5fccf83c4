//! Forward/backward semantics of individual operators on small literal
//! graphs, including the accumulation law for shared parameters.

use approx::assert_abs_diff_eq;
use graph_core::{Graph, GraphDef};
use serde_json::json;

fn graph(def: serde_json::Value) -> Graph {
    let def: GraphDef = serde_json::from_value(def).unwrap();
    Graph::from_def(def, None).unwrap()
}

#[test]
fn matmul_vector_forward_backward() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [1.0, 2.0, 3.0, 4.0]},
            {"id": 1, "kind": "param", "shape": [2], "data": [5.0, 6.0]},
            {"id": 2, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "matmul", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));

    g.forward().unwrap();
    assert_eq!(g.tensor(2).unwrap().data, vec![17.0, 39.0]);

    // Loss grad seeds to [1, 1].
    g.backward().unwrap();
    assert_eq!(g.tensor(0).unwrap().grad, vec![5.0, 6.0, 5.0, 6.0]);
    assert_eq!(g.tensor(1).unwrap().grad, vec![4.0, 6.0]);
}

#[test]
fn matmul_batched_forward() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3], "data": [1.0, 0.0, 2.0, 0.0, 1.0, -1.0]},
            {"id": 1, "kind": "param", "shape": [3, 2], "data": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]},
            {"id": 2, "kind": "intermediate", "shape": [2, 2]}
        ],
        "ops": [{"id": 0, "op": "matmul", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));

    g.forward().unwrap();
    assert_eq!(g.tensor(2).unwrap().data, vec![11.0, 14.0, -2.0, -2.0]);
    assert_eq!(g.tensor(2).unwrap().shape.dims(), &[2, 2]);
}

#[test]
fn matmul_shape_mismatch_names_op() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [1.0, 2.0, 3.0, 4.0]},
            {"id": 1, "kind": "param", "shape": [3], "data": [1.0, 1.0, 1.0]},
            {"id": 2, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "matmul", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": []
    }));

    let err = g.forward().unwrap_err().to_string();
    assert!(err.contains("matmul"), "unexpected error: {err}");
}

#[test]
fn add_broadcast_backward_sums_rows() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3], "data": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]},
            {"id": 1, "kind": "param", "shape": [3], "data": [10.0, 20.0, 30.0]},
            {"id": 2, "kind": "intermediate", "shape": [2, 3]}
        ],
        "ops": [{"id": 0, "op": "add", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));

    g.forward().unwrap();
    assert_eq!(
        g.tensor(2).unwrap().data,
        vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]
    );

    g.backward().unwrap();
    assert_eq!(g.tensor(0).unwrap().grad, vec![1.0; 6]);
    // Vector grad sums over the broadcast (row) axis.
    assert_eq!(g.tensor(1).unwrap().grad, vec![2.0, 2.0, 2.0]);
}

#[test]
fn sub_broadcast_backward_negates_vector() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [1.0, 2.0, 3.0, 4.0]},
            {"id": 1, "kind": "param", "shape": [2], "data": [1.0, 1.0]},
            {"id": 2, "kind": "intermediate", "shape": [2, 2]}
        ],
        "ops": [{"id": 0, "op": "sub", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));

    g.forward().unwrap();
    assert_eq!(g.tensor(2).unwrap().data, vec![0.0, 1.0, 2.0, 3.0]);
    g.backward().unwrap();
    assert_eq!(g.tensor(1).unwrap().grad, vec![-2.0, -2.0]);
}

#[test]
fn dot_forward_backward() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": [1.0, 2.0, 3.0]},
            {"id": 1, "kind": "param", "shape": [3], "data": [4.0, 5.0, 6.0]},
            {"id": 2, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "dot", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0, 1]
    }));

    g.forward().unwrap();
    assert_eq!(g.tensor(2).unwrap().data, vec![32.0]);
    g.backward().unwrap();
    assert_eq!(g.tensor(0).unwrap().grad, vec![4.0, 5.0, 6.0]);
    assert_eq!(g.tensor(1).unwrap().grad, vec![1.0, 2.0, 3.0]);
}

#[test]
fn relu_backward_zero_boundary() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": [-1.0, 0.0, 2.0]},
            {"id": 1, "kind": "intermediate", "shape": [3]}
        ],
        "ops": [{"id": 0, "op": "ReLU", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));

    g.forward().unwrap();
    assert_eq!(g.tensor(1).unwrap().data, vec![0.0, 0.0, 2.0]);
    g.backward().unwrap();
    // Derivative at the boundary is 0.
    assert_eq!(g.tensor(0).unwrap().grad, vec![0.0, 0.0, 1.0]);
}

#[test]
fn lrelu_leaks_negative_slope() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2], "data": [-2.0, 3.0]},
            {"id": 1, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "LReLU", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));

    g.forward().unwrap();
    assert_abs_diff_eq!(g.tensor(1).unwrap().data[0], -0.02, epsilon = 1e-6);
    assert_abs_diff_eq!(g.tensor(1).unwrap().data[1], 3.0, epsilon = 1e-6);
    g.backward().unwrap();
    assert_abs_diff_eq!(g.tensor(0).unwrap().grad[0], 0.01, epsilon = 1e-6);
    assert_abs_diff_eq!(g.tensor(0).unwrap().grad[1], 1.0, epsilon = 1e-6);
}

#[test]
fn softmax_rows_sum_to_one() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 3],
             "data": [2.0, 1.0, 0.1, -5.0, 100.0, 3.0]},
            {"id": 1, "kind": "intermediate", "shape": [2, 3]}
        ],
        "ops": [{"id": 0, "op": "softmax", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));

    g.forward().unwrap();
    let y = &g.tensor(1).unwrap().data;
    for row in y.chunks(3) {
        assert_abs_diff_eq!(row.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
    }
    // Large logits stay finite thanks to the max subtraction.
    assert!(y.iter().all(|v| v.is_finite()));
}

#[test]
fn mse_per_row_and_backward_scale() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2, 2], "data": [1.0, 2.0, 3.0, 4.0]},
            {"id": 1, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "MSE", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));

    g.forward().unwrap();
    assert_eq!(g.tensor(1).unwrap().data, vec![2.5, 12.5]);
    // Batched loss: graph loss is the mean over rows.
    assert_abs_diff_eq!(g.loss(), 7.5, epsilon = 1e-6);

    g.backward().unwrap();
    // dX = (2/n)·x per row with the loss grad seeded to 1 everywhere.
    assert_eq!(g.tensor(0).unwrap().grad, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn mae_backward_uses_sign() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [4], "data": [-2.0, 0.0, 1.0, -0.5]},
            {"id": 1, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "MAE", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));

    g.forward().unwrap();
    assert_abs_diff_eq!(g.tensor(1).unwrap().data[0], 0.875, epsilon = 1e-6);
    g.backward().unwrap();
    assert_eq!(g.tensor(0).unwrap().grad, vec![-0.25, 0.0, 0.25, -0.25]);
}

#[test]
fn ce_one_hot_and_dense_targets() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": [0.7, 0.2, 0.1]},
            {"id": 1, "kind": "target", "shape": [3], "data": [1.0, 0.0, 0.0]},
            {"id": 2, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "CE", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0]
    }));

    g.forward().unwrap();
    assert_abs_diff_eq!(g.loss(), -(0.7f32.ln()), epsilon = 1e-5);

    // Dense target takes the full cross-entropy sum.
    g.set_target(&[0.5, 0.25, 0.25]).unwrap();
    g.forward().unwrap();
    let expected = -(0.5 * 0.7f32.ln() + 0.25 * 0.2f32.ln() + 0.25 * 0.1f32.ln());
    assert_abs_diff_eq!(g.loss(), expected, epsilon = 1e-5);

    // Backward touches only the predictions, never the target.
    g.backward().unwrap();
    assert_eq!(g.tensor(1).unwrap().grad, vec![0.0, 0.0, 0.0]);
    assert_abs_diff_eq!(g.tensor(0).unwrap().grad[0], -0.5 / 0.7, epsilon = 1e-4);
}

#[test]
fn softmax_ce_logits_label_scenario() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [1, 3], "data": [2.0, 1.0, 0.1]},
            {"id": 1, "kind": "target", "shape": [1], "data": [0.0]},
            {"id": 2, "kind": "intermediate", "shape": [1]}
        ],
        "ops": [{"id": 0, "op": "softmax_ce_logits_label_int", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0]
    }));

    g.forward().unwrap();
    assert_abs_diff_eq!(g.loss(), 0.4170, epsilon = 1e-3);

    g.backward().unwrap();
    // dLogits = P - onehot(0) where P = softmax([2, 1, 0.1]).
    let p = [0.659001f32, 0.242433, 0.098566];
    let grad = &g.tensor(0).unwrap().grad;
    assert_abs_diff_eq!(grad[0], p[0] - 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(grad[1], p[1], epsilon = 1e-4);
    assert_abs_diff_eq!(grad[2], p[2], epsilon = 1e-4);
}

#[test]
fn softmax_ce_logits_matches_softmax_then_ce() {
    let logits = [0.3f32, -1.2, 0.8];
    let target = [0.0f32, 1.0, 0.0];

    let mut fused = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": logits.to_vec()},
            {"id": 1, "kind": "target", "shape": [3], "data": target.to_vec()},
            {"id": 2, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "softmax_ce_logits", "inputs": [0, 1], "output": 2}],
        "loss": 2,
        "output": 2,
        "trainable": [0]
    }));
    let mut staged = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [3], "data": logits.to_vec()},
            {"id": 1, "kind": "target", "shape": [3], "data": target.to_vec()},
            {"id": 2, "kind": "intermediate", "shape": [3]},
            {"id": 3, "kind": "intermediate", "shape": []}
        ],
        "ops": [
            {"id": 0, "op": "softmax", "inputs": [0], "output": 2},
            {"id": 1, "op": "CE", "inputs": [2, 1], "output": 3}
        ],
        "loss": 3,
        "output": 2,
        "trainable": [0]
    }));

    fused.forward().unwrap();
    staged.forward().unwrap();
    assert_abs_diff_eq!(fused.loss(), staged.loss(), epsilon = 1e-5);

    fused.backward().unwrap();
    staged.backward().unwrap();
    for (a, b) in fused
        .tensor(0)
        .unwrap()
        .grad
        .iter()
        .zip(staged.tensor(0).unwrap().grad.iter())
    {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-4);
    }
}

#[test]
fn backward_twice_doubles_param_grads() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2], "data": [1.0, -2.0]},
            {"id": 1, "kind": "intermediate", "shape": []}
        ],
        "ops": [{"id": 0, "op": "MSE", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": [0]
    }));

    g.forward().unwrap();
    g.backward().unwrap();
    let once = g.tensor(0).unwrap().grad.clone();
    g.backward().unwrap();
    let twice = g.tensor(0).unwrap().grad.clone();
    assert_eq!(g.acc_steps(), 2);
    for (a, b) in once.iter().zip(twice.iter()) {
        assert_abs_diff_eq!(2.0 * a, b, epsilon = 1e-6);
    }

    g.reset_grad();
    assert_eq!(g.acc_steps(), 0);
    assert!(g.tensor(0).unwrap().grad.iter().all(|&v| v == 0.0));
}

#[test]
fn shared_tensor_accumulates_from_both_consumers() {
    // x feeds two MSE branches summed via add; dX must collect both paths.
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "param", "shape": [2], "data": [1.0, 2.0]},
            {"id": 1, "kind": "intermediate", "shape": []},
            {"id": 2, "kind": "intermediate", "shape": []},
            {"id": 3, "kind": "intermediate", "shape": []}
        ],
        "ops": [
            {"id": 0, "op": "MSE", "inputs": [0], "output": 1},
            {"id": 1, "op": "MAE", "inputs": [0], "output": 2},
            {"id": 2, "op": "add", "inputs": [1, 2], "output": 3}
        ],
        "loss": 3,
        "output": 3,
        "trainable": [0]
    }));

    g.forward().unwrap();
    g.backward().unwrap();
    // MSE path: (2/2)·x = [1, 2]; MAE path: (1/2)·sign(x) = [0.5, 0.5].
    assert_eq!(g.tensor(0).unwrap().grad, vec![1.5, 2.5]);
}

#[test]
fn unknown_op_rejected_at_load() {
    let def: GraphDef = serde_json::from_value(json!({
        "tensors": [
            {"id": 0, "kind": "input", "shape": [1]},
            {"id": 1, "kind": "intermediate", "shape": [1]}
        ],
        "ops": [{"id": 0, "op": "conv2d", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": []
    }))
    .unwrap();
    let err = Graph::from_def(def, None).unwrap_err().to_string();
    assert!(err.contains("conv2d"), "unexpected error: {err}");
}

#[test]
fn set_input_length_checked() {
    let mut g = graph(json!({
        "tensors": [
            {"id": 0, "kind": "input", "shape": [2]},
            {"id": 1, "kind": "intermediate", "shape": [2]}
        ],
        "ops": [{"id": 0, "op": "sig", "inputs": [0], "output": 1}],
        "loss": 1,
        "output": 1,
        "trainable": []
    }));

    g.set_input(&[0.5, -0.5]).unwrap();
    assert!(g.set_input(&[1.0]).is_err());
}
