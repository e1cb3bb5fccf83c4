//! Cross-entropy on probabilities: pred (b,n) with dense or one-hot
//! targets of the same shape -> loss (b). A one-hot row (exactly one entry
//! above 0.5, the rest at zero) takes the -ln(p_k) path; any other row
//! takes -sum(t·ln(p)). Backward adds -dL · t/(p + eps) into pred grads
//! only; targets receive no gradient.

use super::{accumulate, shape_err, OpResult, EPS};
use crate::shape::Shape;
use crate::tensor::{Scalar, Tensor};

/// Index of the single active entry when the row is one-hot.
pub(crate) fn one_hot_index(row: &[Scalar]) -> Option<usize> {
    let mut active = None;
    for (i, &v) in row.iter().enumerate() {
        if v > 0.5 {
            if active.is_some() {
                return None;
            }
            active = Some(i);
        } else if v.abs() > 1.0e-9 {
            return None;
        }
    }
    active
}

pub(crate) fn forward(tensors: &mut [Tensor], pred: usize, target: usize, out: usize) -> OpResult<()> {
    if tensors[pred].data.is_empty() {
        tensors[out].set_output(Shape::scalar(), vec![0.0]);
        return Ok(());
    }
    if tensors[pred].data.len() != tensors[target].data.len() {
        return Err(shape_err(
            "CE",
            format!(
                "pred/target mismatch: {} vs {}",
                tensors[pred].shape, tensors[target].shape
            ),
        ));
    }
    let (rows, cols) = tensors[pred].shape.rows();
    let shape = if tensors[pred].shape.rank() == 2 {
        Shape::new(vec![rows])
    } else {
        Shape::scalar()
    };
    let mut data = vec![0.0; rows];
    {
        let pd = &tensors[pred].data;
        let td = &tensors[target].data;
        for (b, slot) in data.iter_mut().enumerate() {
            let p = &pd[b * cols..(b + 1) * cols];
            let t = &td[b * cols..(b + 1) * cols];
            *slot = match one_hot_index(t) {
                Some(k) => -(p[k] + EPS).ln(),
                None => -t
                    .iter()
                    .zip(p.iter())
                    .map(|(&ti, &pi)| ti * (pi + EPS).ln())
                    .sum::<Scalar>(),
            };
        }
    }
    tensors[out].set_output(shape, data);
    Ok(())
}

pub(crate) fn backward(tensors: &mut [Tensor], pred: usize, target: usize, out: usize) -> OpResult<()> {
    if tensors[pred].data.is_empty() {
        return Ok(());
    }
    let (rows, cols) = tensors[pred].shape.rows();
    let mut gp = vec![0.0; rows * cols];
    {
        let pd = &tensors[pred].data;
        let td = &tensors[target].data;
        let yg = &tensors[out].grad;
        for b in 0..rows {
            let g = yg[b];
            for i in 0..cols {
                let p = pd[b * cols + i];
                let t = td[b * cols + i];
                gp[b * cols + i] += -g * t / (p + EPS);
            }
        }
    }
    accumulate(&mut tensors[pred].grad, &gp);
    Ok(())
}
