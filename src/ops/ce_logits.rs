//! Fused softmax + cross-entropy on logits: logits (b,n) with dense
//! targets of the same shape -> loss (b). The softmax is computed
//! internally with the usual max subtraction, so the backward rule
//! collapses to the numerically friendly dL·(P - t).

use super::softmax::stable_softmax;
use super::{accumulate, shape_err, OpResult, EPS};
use crate::shape::Shape;
use crate::tensor::{Scalar, Tensor};

pub(crate) fn forward(
    tensors: &mut [Tensor],
    logits: usize,
    target: usize,
    out: usize,
) -> OpResult<()> {
    if tensors[logits].data.is_empty() {
        tensors[out].set_output(Shape::scalar(), vec![0.0]);
        return Ok(());
    }
    if tensors[logits].data.len() != tensors[target].data.len() {
        return Err(shape_err(
            "softmax_ce_logits",
            format!(
                "logits/target mismatch: {} vs {}",
                tensors[logits].shape, tensors[target].shape
            ),
        ));
    }
    let (rows, cols) = tensors[logits].shape.rows();
    let shape = if tensors[logits].shape.rank() == 2 {
        Shape::new(vec![rows])
    } else {
        Shape::scalar()
    };
    let mut data = vec![0.0; rows];
    let mut probs = vec![0.0; cols];
    {
        let ld = &tensors[logits].data;
        let td = &tensors[target].data;
        for (b, slot) in data.iter_mut().enumerate() {
            stable_softmax(&ld[b * cols..(b + 1) * cols], &mut probs);
            let t = &td[b * cols..(b + 1) * cols];
            *slot = -t
                .iter()
                .zip(probs.iter())
                .map(|(&ti, &pi)| ti * (pi + EPS).ln())
                .sum::<Scalar>();
        }
    }
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(
    tensors: &mut [Tensor],
    logits: usize,
    target: usize,
    out: usize,
) -> OpResult<()> {
    if tensors[logits].data.is_empty() {
        return Ok(());
    }
    let (rows, cols) = tensors[logits].shape.rows();
    let mut gl = vec![0.0; rows * cols];
    let mut probs = vec![0.0; cols];
    {
        let ld = &tensors[logits].data;
        let td = &tensors[target].data;
        let yg = &tensors[out].grad;
        for b in 0..rows {
            stable_softmax(&ld[b * cols..(b + 1) * cols], &mut probs);
            let g = yg[b];
            for i in 0..cols {
                gl[b * cols + i] += g * (probs[i] - td[b * cols + i]);
            }
        }
    }
    accumulate(&mut tensors[logits].grad, &gl);
    Ok(())
}
