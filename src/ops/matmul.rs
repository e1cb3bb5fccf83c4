//! MatMul: A(m,n)·B(n) -> C(m), or batched A(b,n)·B(n,k) -> C(b,k).
//! Backward: dA += dC·B^T, dB += A^T·dC.

use super::{accumulate, shape_err, OpResult};
use crate::shape::Shape;
use crate::tensor::Tensor;

pub(crate) fn forward(tensors: &mut [Tensor], a: usize, b: usize, out: usize) -> OpResult<()> {
    if tensors[a].shape.rank() != 2 {
        return Err(shape_err("matmul", "left operand must be a matrix"));
    }
    let m = tensors[a].shape.dims()[0];
    let n = tensors[a].shape.dims()[1];

    match tensors[b].shape.rank() {
        1 => {
            if tensors[b].shape.dims()[0] != n {
                return Err(shape_err(
                    "matmul",
                    format!("dimension mismatch: ({m},{n}) x {}", tensors[b].shape),
                ));
            }
            let mut data = vec![0.0; m];
            {
                let ad = &tensors[a].data;
                let bd = &tensors[b].data;
                for (i, slot) in data.iter_mut().enumerate() {
                    let mut sum = 0.0;
                    for k in 0..n {
                        sum += ad[i * n + k] * bd[k];
                    }
                    *slot = sum;
                }
            }
            tensors[out].set_output(Shape::new(vec![m]), data);
            Ok(())
        }
        2 => {
            let kn = tensors[b].shape.dims()[0];
            let k = tensors[b].shape.dims()[1];
            if kn != n {
                return Err(shape_err(
                    "matmul",
                    format!("dimension mismatch: ({m},{n}) x {}", tensors[b].shape),
                ));
            }
            let mut data = vec![0.0; m * k];
            {
                let ad = &tensors[a].data;
                let bd = &tensors[b].data;
                for i in 0..m {
                    for j in 0..k {
                        let mut sum = 0.0;
                        for p in 0..n {
                            sum += ad[i * n + p] * bd[p * k + j];
                        }
                        data[i * k + j] = sum;
                    }
                }
            }
            tensors[out].set_output(Shape::new(vec![m, k]), data);
            Ok(())
        }
        _ => Err(shape_err(
            "matmul",
            "right operand must be a vector or a matrix",
        )),
    }
}

pub(crate) fn backward(tensors: &mut [Tensor], a: usize, b: usize, out: usize) -> OpResult<()> {
    let m = tensors[a].shape.dims()[0];
    let n = tensors[a].shape.dims()[1];

    if tensors[b].shape.rank() == 1 {
        let mut ga = vec![0.0; m * n];
        let mut gb = vec![0.0; n];
        {
            let ad = &tensors[a].data;
            let bd = &tensors[b].data;
            let cg = &tensors[out].grad;
            for i in 0..m {
                let g = cg[i];
                for k in 0..n {
                    ga[i * n + k] += g * bd[k];
                    gb[k] += g * ad[i * n + k];
                }
            }
        }
        accumulate(&mut tensors[a].grad, &ga);
        accumulate(&mut tensors[b].grad, &gb);
    } else {
        let k = tensors[b].shape.dims()[1];
        let mut ga = vec![0.0; m * n];
        let mut gb = vec![0.0; n * k];
        {
            let ad = &tensors[a].data;
            let bd = &tensors[b].data;
            let cg = &tensors[out].grad;
            for i in 0..m {
                for j in 0..k {
                    let g = cg[i * k + j];
                    for p in 0..n {
                        ga[i * n + p] += g * bd[p * k + j];
                        gb[p * k + j] += g * ad[i * n + p];
                    }
                }
            }
        }
        accumulate(&mut tensors[a].grad, &ga);
        accumulate(&mut tensors[b].grad, &gb);
    }
    Ok(())
}
