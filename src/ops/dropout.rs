//! Dropout: Y = X * mask, mask in {0, scale} drawn per element from the
//! process-level RNG. Keep probability is fixed at 0.5 (scale 2.0); seed
//! via [crate::rng::set_seed] for reproducible masks.
//! Backward recovers the mask from the saved output: y/x when x != 0.

use super::{accumulate, OpResult};
use crate::rng::with_rng;
use crate::tensor::{Scalar, Tensor};
use rand::Rng;

pub(crate) const KEEP_PROB: Scalar = 0.5;
pub(crate) const SCALE: Scalar = 2.0;

pub(crate) fn forward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let shape = tensors[x].shape.clone();
    let mut data = vec![0.0; tensors[x].data.len()];
    {
        let xd = &tensors[x].data;
        with_rng(|rng| {
            for (i, slot) in data.iter_mut().enumerate() {
                let mask = if rng.gen::<Scalar>() < KEEP_PROB {
                    SCALE
                } else {
                    0.0
                };
                *slot = xd[i] * mask;
            }
        });
    }
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], x: usize, out: usize) -> OpResult<()> {
    let size = tensors[x].data.len();
    let mut gx = vec![0.0; size];
    {
        let xd = &tensors[x].data;
        let yd = &tensors[out].data;
        let yg = &tensors[out].grad;
        for i in 0..size {
            // x == 0 loses the mask; fall back to 0 for dropped elements
            // and identity otherwise.
            let mask = if xd[i] != 0.0 {
                yd[i] / xd[i]
            } else if yd[i] == 0.0 {
                0.0
            } else {
                1.0
            };
            gx[i] += yg[i] * mask;
        }
    }
    accumulate(&mut tensors[x].grad, &gx);
    Ok(())
}
