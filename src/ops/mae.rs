//! MAE: per-row mean of absolute values. (b,n) -> (b); rank <= 1 -> scalar.
//! Backward: dX += dY_row · (1/n)·sign(X), with sign(0) = 0.

use super::{accumulate, OpResult};
use crate::shape::Shape;
use crate::tensor::{Scalar, Tensor};

fn sign(v: Scalar) -> Scalar {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    if tensors[x].data.is_empty() {
        tensors[out].set_output(Shape::scalar(), vec![0.0]);
        return Ok(());
    }
    let (rows, cols) = tensors[x].shape.rows();
    let shape = if tensors[x].shape.rank() == 2 {
        Shape::new(vec![rows])
    } else {
        Shape::scalar()
    };
    let mut data = vec![0.0; rows];
    {
        let xd = &tensors[x].data;
        for (b, slot) in data.iter_mut().enumerate() {
            let row = &xd[b * cols..(b + 1) * cols];
            let sum: Scalar = row.iter().map(|v| v.abs()).sum();
            *slot = sum / cols as Scalar;
        }
    }
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    if tensors[x].data.is_empty() {
        return Ok(());
    }
    let (rows, cols) = tensors[x].shape.rows();
    let mut gx = vec![0.0; rows * cols];
    {
        let xd = &tensors[x].data;
        let yg = &tensors[out].grad;
        for b in 0..rows {
            let scale = yg[b] / cols as Scalar;
            for i in 0..cols {
                gx[b * cols + i] += scale * sign(xd[b * cols + i]);
            }
        }
    }
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
