//! ReLU: Y = max(0, X). Backward: dX += dY where X > 0; the derivative at
//! the zero boundary is 0.

use super::{accumulate, OpResult};
use crate::tensor::Tensor;

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let shape = tensors[x].shape.clone();
    let data: Vec<f32> = tensors[x]
        .data
        .iter()
        .map(|&v| if v > 0.0 { v } else { 0.0 })
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
            if xd[i] > 0.0 {
                gx[i] += yg[i];
            }
        }
    }
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
