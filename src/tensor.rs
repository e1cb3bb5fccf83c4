//! Tensor: numeric storage plus gradient buffer, addressed by dense id.
//! No graph logic here; forward/backward live in [crate::graph] and
//! [crate::ops].

use crate::shape::Shape;
use serde::{Deserialize, Serialize};

/// Numeric primitive for all tensor data and gradients.
pub type Scalar = f32;

/// Role of a tensor in the graph. Only `param` gradients survive a
/// backward pass; only `param` data survives a checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorKind {
    Param,
    Input,
    Target,
    Intermediate,
    Const,
}

/// A tensor in the arena: id, shape, data, grad, kind, optional name.
/// `data.len() == grad.len() == shape.numel()` holds after load and after
/// every backward.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub id: usize,
    pub shape: Shape,
    pub data: Vec<Scalar>,
    pub grad: Vec<Scalar>,
    pub kind: TensorKind,
    pub name: Option<String>,
}

impl Tensor {
    /// Number of elements according to the declared shape.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Zero the gradient, resizing it to match the data buffer. Used by
    /// backward for non-param tensors whose data length changed on forward.
    pub fn zero_grad(&mut self) {
        self.grad.clear();
        self.grad.resize(self.data.len(), 0.0);
    }

    /// Assign output shape and data in one step (forward writes outputs
    /// this way so stale data from the previous pass never leaks through).
    pub fn set_output(&mut self, shape: Shape, data: Vec<Scalar>) {
        self.shape = shape;
        self.data = data;
    }
}
