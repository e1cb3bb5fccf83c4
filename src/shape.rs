//! Shape management for tensors: dimensions and layout.
//! Empty shape = scalar; rank 1 = vector; rank 2 = (rows, cols), row-major.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a tensor: ordered list of dimension sizes.
/// Serialized as a plain JSON array of dims.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a shape from dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Scalar shape (no dimensions, one element).
    pub fn scalar() -> Self {
        Shape { dims: Vec::new() }
    }

    /// Number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Dimension sizes as slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements. Product of dims; 1 for the empty shape.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Check if this shape matches another exactly.
    pub fn same_as(&self, other: &Shape) -> bool {
        self.dims == other.dims
    }

    /// View as rows: a rank-2 shape is (rows, cols); anything of lower
    /// rank is a single row whose width is the element count.
    pub fn rows(&self) -> (usize, usize) {
        if self.dims.len() == 2 {
            (self.dims[0], self.dims[1])
        } else {
            (1, self.numel())
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape{:?}", self.dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}
