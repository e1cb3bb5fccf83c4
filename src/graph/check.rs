//! Numerical gradient check: central finite difference vs reverse-mode,
//! for verifying op backward rules. The scalar function differentiated is
//! the sum of the loss tensor entries, matching the all-ones seed used by
//! [crate::graph::Graph::backward].

use crate::graph::runtime::{Graph, GraphResult};
use crate::rng::set_seed;
use crate::tensor::Scalar;

/// Epsilon for the central difference: (f(x+eps) - f(x-eps)) / (2*eps).
pub const DEFAULT_EPS: Scalar = 1e-3;

fn loss_sum(graph: &mut Graph, loss_id: usize, seed: Option<u64>) -> GraphResult<Scalar> {
    if let Some(s) = seed {
        set_seed(s);
    }
    graph.forward()?;
    Ok(graph.tensor(loss_id)?.data.iter().sum())
}

/// Numerical gradient of the summed loss w.r.t. one tensor's data.
/// `seed`, when set, reseeds the process RNG before every forward so
/// stochastic ops (dropout) replay the same masks.
pub fn numerical_grad(
    graph: &mut Graph,
    tensor_id: usize,
    loss_id: usize,
    eps: Scalar,
    seed: Option<u64>,
) -> GraphResult<Vec<Scalar>> {
    let n = graph.tensor(tensor_id)?.data.len();
    let mut grad = vec![0.0; n];
    for (i, slot) in grad.iter_mut().enumerate() {
        let orig = graph.tensor(tensor_id)?.data[i];
        graph.tensor_mut(tensor_id)?.data[i] = orig + eps;
        let plus = loss_sum(graph, loss_id, seed)?;
        graph.tensor_mut(tensor_id)?.data[i] = orig - eps;
        let minus = loss_sum(graph, loss_id, seed)?;
        graph.tensor_mut(tensor_id)?.data[i] = orig;
        *slot = (plus - minus) / (2.0 * eps);
    }
    Ok(grad)
}

/// Compare reverse-mode gradients at `tensor_ids` against the central
/// difference, element by element, within `atol`.
pub fn check_gradients(
    graph: &mut Graph,
    tensor_ids: &[usize],
    loss_id: usize,
    eps: Scalar,
    atol: Scalar,
    seed: Option<u64>,
) -> Result<(), String> {
    if let Some(s) = seed {
        set_seed(s);
    }
    graph.forward().map_err(|e| e.to_string())?;
    graph.reset_grad();
    graph.backward().map_err(|e| e.to_string())?;

    let reverse: Vec<Vec<Scalar>> = tensor_ids
        .iter()
        .map(|&id| graph.tensor(id).map(|t| t.grad.clone()))
        .collect::<GraphResult<_>>()
        .map_err(|e| e.to_string())?;

    for (&id, autograd) in tensor_ids.iter().zip(reverse.iter()) {
        let numeric =
            numerical_grad(graph, id, loss_id, eps, seed).map_err(|e| e.to_string())?;
        if autograd.len() != numeric.len() {
            return Err(format!(
                "tensor {}: grad len mismatch {} vs {}",
                id,
                autograd.len(),
                numeric.len()
            ));
        }
        for (j, (&a, &n)) in autograd.iter().zip(numeric.iter()).enumerate() {
            if (a - n).abs() > atol {
                return Err(format!(
                    "tensor {} elem {}: reverse {} vs numerical {}",
                    id, j, a, n
                ));
            }
        }
    }
    Ok(())
}
