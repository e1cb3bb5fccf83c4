//! Dot: C = sum(A_i * B_i), scalar output.
//! Backward: dA += dC·B; dB += dC·A.

use super::{accumulate, shape_err, OpResult};
use crate::shape::Shape;
use crate::tensor::{Scalar, Tensor};

pub(crate) fn forward(tensors: &mut [Tensor], a: usize, b: usize, out: usize) -> OpResult<()> {
    if tensors[a].data.len() != tensors[b].data.len() {
        return Err(shape_err(
            "dot",
            format!(
                "dimension mismatch: {} vs {}",
                tensors[a].shape, tensors[b].shape
            ),
        ));
    }
    let sum: Scalar = tensors[a]
        .data
        .iter()
        .zip(tensors[b].data.iter())
        .map(|(x, y)| x * y)
        .sum();
    tensors[out].set_output(Shape::scalar(), vec![sum]);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], a: usize, b: usize, out: usize) -> OpResult<()> {
    let g = tensors[out].grad.first().copied().unwrap_or(0.0);
    let size = tensors[a].data.len();
    let mut ga = vec![0.0; size];
    let mut gb = vec![0.0; size];
    {
        let ad = &tensors[a].data;
        let bd = &tensors[b].data;
        for i in 0..size {
            ga[i] += g * bd[i];
            gb[i] += g * ad[i];
        }
    }
    accumulate(&mut tensors[a].grad, &ga);
    accumulate(&mut tensors[b].grad, &gb);
    Ok(())
}
