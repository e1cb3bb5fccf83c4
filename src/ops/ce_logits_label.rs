//! Fused softmax + cross-entropy with integer labels: logits (b,n) and one
//! label per row in target (b) -> loss (b). Row b reads target[b] as the
//! active class index; loss is -ln(P_label + eps) and the backward rule is
//! dL·(P - onehot(label)). A label outside [0, n) matches no class.

use super::softmax::stable_softmax;
use super::{accumulate, shape_err, OpResult, EPS};
use crate::shape::Shape;
use crate::tensor::Tensor;

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
    let (rows, cols) = tensors[logits].shape.rows();
    if tensors[target].data.len() != rows {
        return Err(shape_err(
            "softmax_ce_logits_label_int",
            format!(
                "expected {rows} labels, target has shape {}",
                tensors[target].shape
            ),
        ));
    }
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
            let label = td[b] as usize;
            if label < cols {
                *slot = -(probs[label] + EPS).ln();
            }
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
            let label = td[b] as usize;
            let g = yg[b];
            for i in 0..cols {
                let hot = if i == label { 1.0 } else { 0.0 };
                gl[b * cols + i] += g * (probs[i] - hot);
            }
        }
    }
    accumulate(&mut tensors[logits].grad, &gl);
    Ok(())
}
