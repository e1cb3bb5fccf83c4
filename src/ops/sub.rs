//! Sub: element-wise C = A - B, or row broadcast (b,n) - (n).
//! Backward: dA += dC; dB -= dC (summed over rows in the broadcast case).

use super::add::is_row_broadcast;
use super::{accumulate, shape_err, OpResult};
use crate::tensor::Tensor;

pub(crate) fn forward(tensors: &mut [Tensor], a: usize, b: usize, out: usize) -> OpResult<()> {
    let broadcast = is_row_broadcast(&tensors[a], &tensors[b]);
    if !broadcast && tensors[a].data.len() != tensors[b].data.len() {
        return Err(shape_err(
            "sub",
            format!(
                "dimension mismatch: {} vs {}",
                tensors[a].shape, tensors[b].shape
            ),
        ));
    }

    let shape = tensors[a].shape.clone();
    let mut data = vec![0.0; tensors[a].data.len()];
    {
        let ad = &tensors[a].data;
        let bd = &tensors[b].data;
        if broadcast {
            let n = bd.len();
            for (i, slot) in data.iter_mut().enumerate() {
                *slot = ad[i] - bd[i % n];
            }
        } else {
            for (i, slot) in data.iter_mut().enumerate() {
                *slot = ad[i] - bd[i];
            }
        }
    }
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], a: usize, b: usize, out: usize) -> OpResult<()> {
    let broadcast = is_row_broadcast(&tensors[a], &tensors[b]);
    let size = tensors[out].data.len();
    let mut ga = vec![0.0; size];
    let mut gb = vec![0.0; tensors[b].data.len()];
    {
        let cg = &tensors[out].grad;
        let n = gb.len();
        for i in 0..size {
            ga[i] += cg[i];
            if broadcast {
                gb[i % n] -= cg[i];
            } else {
                gb[i] -= cg[i];
            }
        }
    }
    accumulate(&mut tensors[a].grad, &ga);
    accumulate(&mut tensors[b].grad, &gb);
    Ok(())
}
