//! Sigmoid: Y = 1/(1+exp(-X)). Backward: dX += dY · Y(1-Y), using the
//! saved forward output.

use super::{accumulate, OpResult};
use crate::tensor::Tensor;

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let shape = tensors[x].shape.clone();
    let data: Vec<f32> = tensors[x]
        .data
        .iter()
        .map(|&v| 1.0 / (1.0 + (-v).exp()))
        .collect();
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let size = tensors[x].data.len();
    let mut gx = vec![0.0; size];
    {
        let yd = &tensors[out].data;
        let yg = &tensors[out].grad;
        for i in 0..size {
            gx[i] += yg[i] * yd[i] * (1.0 - yd[i]);
        }
    }
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
