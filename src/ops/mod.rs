//! Operators as first-class modules: each op (matmul, add, softmax, ...)
//! owns its forward and backward rule. The JSON selector is translated into
//! the closed [OpKind] tag once at graph load, so forward/backward dispatch
//! is an exhaustive match with no string comparisons.

use crate::tensor::{Scalar, Tensor};
use thiserror::Error;

pub mod add;
pub mod ce;
pub mod ce_logits;
pub mod ce_logits_label;
pub mod dot;
pub mod dropout;
pub mod lrelu;
pub mod mae;
pub mod matmul;
pub mod mean;
pub mod mse;
pub mod relu;
pub mod sig;
pub mod softmax;
pub mod sub;

/// Epsilon guarding every `log(p + EPS)` and probability division.
pub const EPS: Scalar = 1e-12;

#[derive(Error, Debug)]
pub enum OpError {
    #[error("{op}: {detail}")]
    Shape { op: &'static str, detail: String },
}

pub type OpResult<T> = Result<T, OpError>;

pub(crate) fn shape_err(op: &'static str, detail: impl Into<String>) -> OpError {
    OpError::Shape {
        op,
        detail: detail.into(),
    }
}

/// Accumulate a locally computed gradient into a tensor grad buffer.
/// Backward rules always add, never assign, so shared subgraphs sum their
/// contributions.
pub(crate) fn accumulate(grad: &mut [Scalar], delta: &[Scalar]) {
    for (g, d) in grad.iter_mut().zip(delta.iter()) {
        *g += d;
    }
}

/// Closed set of operator tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    MatMul,
    Add,
    Sub,
    Dot,
    Dropout,
    Sig,
    Relu,
    LRelu,
    Mse,
    Mae,
    Mean,
    Softmax,
    Ce,
    SoftmaxCeLogits,
    SoftmaxCeLogitsLabelInt,
}

impl OpKind {
    /// Translate a JSON selector into the closed tag. `relu` and `ReLU`
    /// are the same operator.
    pub fn parse(selector: &str) -> Option<OpKind> {
        Some(match selector {
            "matmul" => OpKind::MatMul,
            "add" => OpKind::Add,
            "sub" => OpKind::Sub,
            "dot" => OpKind::Dot,
            "dropout" => OpKind::Dropout,
            "sig" => OpKind::Sig,
            "relu" | "ReLU" => OpKind::Relu,
            "LReLU" => OpKind::LRelu,
            "MSE" => OpKind::Mse,
            "MAE" => OpKind::Mae,
            "mean" => OpKind::Mean,
            "softmax" => OpKind::Softmax,
            "CE" => OpKind::Ce,
            "softmax_ce_logits" => OpKind::SoftmaxCeLogits,
            "softmax_ce_logits_label_int" => OpKind::SoftmaxCeLogitsLabelInt,
            _ => return None,
        })
    }

    /// Canonical selector string (for error messages and persistence).
    pub fn selector(&self) -> &'static str {
        match self {
            OpKind::MatMul => "matmul",
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Dot => "dot",
            OpKind::Dropout => "dropout",
            OpKind::Sig => "sig",
            OpKind::Relu => "relu",
            OpKind::LRelu => "LReLU",
            OpKind::Mse => "MSE",
            OpKind::Mae => "MAE",
            OpKind::Mean => "mean",
            OpKind::Softmax => "softmax",
            OpKind::Ce => "CE",
            OpKind::SoftmaxCeLogits => "softmax_ce_logits",
            OpKind::SoftmaxCeLogitsLabelInt => "softmax_ce_logits_label_int",
        }
    }

    /// Number of input tensor ids the op consumes.
    pub fn arity(&self) -> usize {
        match self {
            OpKind::MatMul
            | OpKind::Add
            | OpKind::Sub
            | OpKind::Dot
            | OpKind::Ce
            | OpKind::SoftmaxCeLogits
            | OpKind::SoftmaxCeLogitsLabelInt => 2,
            OpKind::Dropout
            | OpKind::Sig
            | OpKind::Relu
            | OpKind::LRelu
            | OpKind::Mse
            | OpKind::Mae
            | OpKind::Mean
            | OpKind::Softmax => 1,
        }
    }
}

/// Forward dispatch: compute the output tensor of one op.
pub(crate) fn forward(
    kind: OpKind,
    tensors: &mut [Tensor],
    inputs: &[usize],
    out: usize,
) -> OpResult<()> {
    match kind {
        OpKind::MatMul => matmul::forward(tensors, inputs[0], inputs[1], out),
        OpKind::Add => add::forward(tensors, inputs[0], inputs[1], out),
        OpKind::Sub => sub::forward(tensors, inputs[0], inputs[1], out),
        OpKind::Dot => dot::forward(tensors, inputs[0], inputs[1], out),
        OpKind::Dropout => dropout::forward(tensors, inputs[0], out),
        OpKind::Sig => sig::forward(tensors, inputs[0], out),
        OpKind::Relu => relu::forward(tensors, inputs[0], out),
        OpKind::LRelu => lrelu::forward(tensors, inputs[0], out),
        OpKind::Mse => mse::forward(tensors, inputs[0], out),
        OpKind::Mae => mae::forward(tensors, inputs[0], out),
        OpKind::Mean => mean::forward(tensors, inputs[0], out),
        OpKind::Softmax => softmax::forward(tensors, inputs[0], out),
        OpKind::Ce => ce::forward(tensors, inputs[0], inputs[1], out),
        OpKind::SoftmaxCeLogits => ce_logits::forward(tensors, inputs[0], inputs[1], out),
        OpKind::SoftmaxCeLogitsLabelInt => {
            ce_logits_label::forward(tensors, inputs[0], inputs[1], out)
        }
    }
}

/// Backward dispatch: accumulate gradients into the op's input tensors.
pub(crate) fn backward(
    kind: OpKind,
    tensors: &mut [Tensor],
    inputs: &[usize],
    out: usize,
) -> OpResult<()> {
    match kind {
        OpKind::MatMul => matmul::backward(tensors, inputs[0], inputs[1], out),
        OpKind::Add => add::backward(tensors, inputs[0], inputs[1], out),
        OpKind::Sub => sub::backward(tensors, inputs[0], inputs[1], out),
        OpKind::Dot => dot::backward(tensors, inputs[0], inputs[1], out),
        OpKind::Dropout => dropout::backward(tensors, inputs[0], out),
        OpKind::Sig => sig::backward(tensors, inputs[0], out),
        OpKind::Relu => relu::backward(tensors, inputs[0], out),
        OpKind::LRelu => lrelu::backward(tensors, inputs[0], out),
        OpKind::Mse => mse::backward(tensors, inputs[0], out),
        OpKind::Mae => mae::backward(tensors, inputs[0], out),
        OpKind::Mean => mean::backward(tensors, inputs[0], out),
        OpKind::Softmax => softmax::backward(tensors, inputs[0], out),
        OpKind::Ce => ce::backward(tensors, inputs[0], inputs[1], out),
        OpKind::SoftmaxCeLogits => ce_logits::backward(tensors, inputs[0], inputs[1], out),
        OpKind::SoftmaxCeLogitsLabelInt => {
            ce_logits_label::backward(tensors, inputs[0], inputs[1], out)
        }
    }
}
