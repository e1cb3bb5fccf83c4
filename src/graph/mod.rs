//! Graph runtime: JSON-defined tensor arena plus op list, forward
//! interpreter, reverse-mode backward, weight persistence.
//! Verifiable via the numerical gradient check in [check].

pub mod check;
pub mod def;
pub mod runtime;

pub use def::{GraphDef, GraphSnapshot, OpDef, TensorDef, WeightEntry, WeightsFile};
pub use runtime::{Graph, GraphError, GraphResult};
