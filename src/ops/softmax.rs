//! Softmax: stable per-row softmax (rank 2) or over the whole buffer.
//! Subtracts the row max before exponentiation; a zero denominator yields
//! an all-zero row. Backward applies the full Jacobian:
//! dX_i += sum_j dY_j · Y_j(delta_ij - Y_i).

use super::{accumulate, OpResult};
use crate::tensor::{Scalar, Tensor};

/// Stable softmax of one row into `out`. Shared with the fused CE ops.
pub(crate) fn stable_softmax(row: &[Scalar], out: &mut [Scalar]) {
    if row.is_empty() {
        return;
    }
    let max = row.iter().copied().fold(row[0], Scalar::max);
    let mut sum = 0.0;
    for (o, &v) in out.iter_mut().zip(row.iter()) {
        *o = (v - max).exp();
        sum += *o;
    }
    let inv = if sum == 0.0 { 0.0 } else { 1.0 / sum };
    for o in out.iter_mut() {
        *o *= inv;
    }
}

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let shape = tensors[x].shape.clone();
    let (rows, cols) = shape.rows();
    let mut data = vec![0.0; tensors[x].data.len()];
    {
        let xd = &tensors[x].data;
        for b in 0..rows {
            stable_softmax(&xd[b * cols..(b + 1) * cols], &mut data[b * cols..(b + 1) * cols]);
        }
    }
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let (rows, cols) = tensors[out].shape.rows();
    let mut gx = vec![0.0; rows * cols];
    {
        let yd = &tensors[out].data;
        let yg = &tensors[out].grad;
        for b in 0..rows {
            let y = &yd[b * cols..(b + 1) * cols];
            let g = &yg[b * cols..(b + 1) * cols];
            for i in 0..cols {
                let mut grad = 0.0;
                for j in 0..cols {
                    let delta = if i == j { 1.0 } else { 0.0 };
                    grad += g[j] * y[j] * (delta - y[i]);
                }
                gx[b * cols + i] += grad;
            }
        }
    }
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
