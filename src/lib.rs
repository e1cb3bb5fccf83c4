//! graph_core: a JSON-defined computation graph runtime for small
//! feed-forward networks, with reverse-mode autodiff and an Adam training
//! loop over streaming datasets.
//!
//! Layers: storage (Tensor, Shape) -> ops (forward/backward rules) ->
//! graph (interpreter, persistence) -> optimizer + train (driver) ->
//! ffi (C-ABI embedding).
//!
//! Determinism: seed the process RNG with [set_seed] before forward passes
//! that contain dropout; dataset shuffles are seeded per dataset.

pub mod config;
pub mod data;
pub mod ffi;
pub mod graph;
pub mod ops;
pub mod optimizer;
pub mod rng;
pub mod shape;
pub mod tensor;
pub mod train;

pub use config::{Config, LoadError};
pub use data::{DataError, StreamDataset};
pub use graph::{Graph, GraphDef, GraphError, GraphResult, WeightsFile};
pub use ops::{OpError, OpKind};
pub use optimizer::{Adam, Fixed, Optimizer, OptimizerError};
pub use rng::{set_seed, with_rng};
pub use shape::Shape;
pub use tensor::{Scalar, Tensor, TensorKind};
pub use train::{argmax, TrainError, TrainResult, Trainer};
