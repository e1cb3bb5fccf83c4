//! Serde surface for the JSON graph, weights checkpoint, and full
//! snapshot. Field names match the exporter format exactly.

use crate::shape::Shape;
use crate::tensor::{Scalar, TensorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tensor declaration. `data` is optional; absent means a zero buffer
/// of `shape.numel()` elements.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TensorDef {
    pub id: usize,
    pub kind: TensorKind,
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Scalar>>,
}

/// One op application: selector string, input tensor ids, output tensor id.
/// The selector is translated to [crate::ops::OpKind] at load.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpDef {
    pub id: usize,
    pub op: String,
    pub inputs: Vec<usize>,
    pub output: usize,
}

/// The whole graph definition. Ops are listed in topological order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphDef {
    pub tensors: Vec<TensorDef>,
    pub ops: Vec<OpDef>,
    #[serde(default)]
    pub loss: usize,
    #[serde(default)]
    pub output: usize,
    pub trainable: Vec<usize>,
}

/// Weights checkpoint: `{"tensors": {"<id>": {"data": [...], "shape":
/// [...]}}}`, trainable ids only. BTreeMap keeps key order stable so
/// save -> load -> save is byte-identical.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WeightsFile {
    #[serde(default)]
    pub tensors: BTreeMap<String, WeightEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightEntry {
    pub data: Vec<Scalar>,
    pub shape: Shape,
}

/// Full snapshot: the definition as loaded plus every tensor's current data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub graph: GraphDef,
    pub tensors: BTreeMap<String, Vec<Scalar>>,
}
