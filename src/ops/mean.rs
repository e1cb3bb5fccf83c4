//! Mean: whole-tensor mean to a scalar. Backward spreads dY/n uniformly.

use super::{accumulate, OpResult};
use crate::shape::Shape;
use crate::tensor::{Scalar, Tensor};

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let xd = &tensors[x].data;
    let value = if xd.is_empty() {
        0.0
    } else {
        xd.iter().sum::<Scalar>() / xd.len() as Scalar
    };
    tensors[out].set_output(Shape::scalar(), vec![value]);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let size = tensors[x].data.len();
    if size == 0 {
        return Ok(());
    }
    let g = tensors[out].grad.first().copied().unwrap_or(0.0) / size as Scalar;
    let gx = vec![g; size];
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
