//! Leaky ReLU: Y = X when X > 0, else alpha·X (alpha = 0.01).
//! Backward: dX += dY · (1 or alpha).

use super::{accumulate, OpResult};
use crate::tensor::{Scalar, Tensor};

const ALPHA: Scalar = 0.01;

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let shape = tensors[x].shape.clone();
    let data: Vec<Scalar> = tensors[x]
        .data
        .iter()
        .map(|&v| if v > 0.0 { v } else { ALPHA * v })
        .collect();
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let size = tensors[x].data.len();
    let mut gx = vec![0.0; size];
    {
        let xd = &tensors[x].data;
        let yg = &tensors[out].grad;
        for i in 0..size {
            let local = if xd[i] > 0.0 { 1.0 } else { ALPHA };
            gx[i] += yg[i] * local;
        }
    }
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
