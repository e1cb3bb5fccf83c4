//! Graph: owns the tensor arena and the op list, drives forward and
//! backward, and persists weights. Tensor ids are dense indices into the
//! arena; ops borrow buffers in short, non-overlapping windows.

use crate::graph::def::{GraphDef, GraphSnapshot, WeightEntry, WeightsFile};
use crate::ops::{self, OpError, OpKind};
use crate::tensor::{Scalar, Tensor, TensorKind};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("op error: {0}")]
    Op(#[from] OpError),
    #[error("unknown op selector: {0}")]
    UnknownOp(String),
    #[error("tensor id {0} out of range")]
    TensorId(usize),
    #[error("tensor {id} declared out of order (expected id {expected})")]
    DenseIds { id: usize, expected: usize },
    #[error("tensor {id}: data has {got} values, shape wants {expected}")]
    DataLen {
        id: usize,
        expected: usize,
        got: usize,
    },
    #[error("op {op}: expected {expected} inputs, got {got}")]
    Arity {
        op: String,
        expected: usize,
        got: usize,
    },
    #[error("graph has no {0} tensor")]
    Missing(&'static str),
    #[error("{role}: expected {expected} values, got {got}")]
    Size {
        role: &'static str,
        expected: usize,
        got: usize,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// An op resolved at load time: closed tag plus validated tensor ids.
#[derive(Debug)]
struct GraphOp {
    kind: OpKind,
    inputs: Vec<usize>,
    output: usize,
}

/// The graph runtime. Single-threaded and stateful: forward overwrites
/// intermediate data in place, backward accumulates into grad buffers.
#[derive(Debug)]
pub struct Graph {
    def: GraphDef,
    tensors: Vec<Tensor>,
    ops: Vec<GraphOp>,
    input_id: Option<usize>,
    target_id: Option<usize>,
    loss_id: usize,
    output_id: usize,
    trainable: Vec<usize>,
    acc_steps: usize,
}

impl Graph {
    /// Build a graph from its definition, overlaying checkpointed weights
    /// onto `param` tensors whose stored shape matches the declared one.
    pub fn from_def(def: GraphDef, weights: Option<&WeightsFile>) -> GraphResult<Self> {
        let mut tensors = Vec::with_capacity(def.tensors.len());
        let mut input_id = None;
        let mut target_id = None;

        for (index, td) in def.tensors.iter().enumerate() {
            if td.id != index {
                return Err(GraphError::DenseIds {
                    id: td.id,
                    expected: index,
                });
            }
            let numel = td.shape.numel();
            let mut data = match &td.data {
                Some(d) => {
                    if d.len() != numel {
                        return Err(GraphError::DataLen {
                            id: td.id,
                            expected: numel,
                            got: d.len(),
                        });
                    }
                    d.clone()
                }
                None => vec![0.0; numel],
            };

            if td.kind == TensorKind::Param {
                if let Some(entry) = weights.and_then(|w| w.tensors.get(&td.id.to_string())) {
                    if entry.shape.same_as(&td.shape) {
                        if entry.data.len() != numel {
                            return Err(GraphError::DataLen {
                                id: td.id,
                                expected: numel,
                                got: entry.data.len(),
                            });
                        }
                        data = entry.data.clone();
                    }
                }
            }

            match td.kind {
                TensorKind::Input => input_id = Some(td.id),
                TensorKind::Target => target_id = Some(td.id),
                _ => {}
            }

            let grad = vec![0.0; data.len()];
            tensors.push(Tensor {
                id: td.id,
                shape: td.shape.clone(),
                data,
                grad,
                kind: td.kind,
                name: td.name.clone(),
            });
        }

        let check_id = |id: usize| -> GraphResult<usize> {
            if id < tensors.len() {
                Ok(id)
            } else {
                Err(GraphError::TensorId(id))
            }
        };

        let mut graph_ops = Vec::with_capacity(def.ops.len());
        for od in &def.ops {
            let kind =
                OpKind::parse(&od.op).ok_or_else(|| GraphError::UnknownOp(od.op.clone()))?;
            if od.inputs.len() != kind.arity() {
                return Err(GraphError::Arity {
                    op: od.op.clone(),
                    expected: kind.arity(),
                    got: od.inputs.len(),
                });
            }
            for &id in &od.inputs {
                check_id(id)?;
            }
            graph_ops.push(GraphOp {
                kind,
                inputs: od.inputs.clone(),
                output: check_id(od.output)?,
            });
        }

        let loss_id = check_id(def.loss)?;
        let output_id = check_id(def.output)?;
        let trainable = def.trainable.clone();
        for &id in &trainable {
            check_id(id)?;
        }

        Ok(Graph {
            def,
            tensors,
            ops: graph_ops,
            input_id,
            target_id,
            loss_id,
            output_id,
            trainable,
            acc_steps: 0,
        })
    }

    /// Copy a sample into the input tensor.
    pub fn set_input(&mut self, x: &[Scalar]) -> GraphResult<()> {
        let id = self.input_id.ok_or(GraphError::Missing("input"))?;
        let tensor = &mut self.tensors[id];
        if tensor.data.len() != x.len() {
            return Err(GraphError::Size {
                role: "input",
                expected: tensor.data.len(),
                got: x.len(),
            });
        }
        tensor.data.copy_from_slice(x);
        Ok(())
    }

    /// Copy a supervision signal into the target tensor.
    pub fn set_target(&mut self, y: &[Scalar]) -> GraphResult<()> {
        let id = self.target_id.ok_or(GraphError::Missing("target"))?;
        let tensor = &mut self.tensors[id];
        if tensor.data.len() != y.len() {
            return Err(GraphError::Size {
                role: "target",
                expected: tensor.data.len(),
                got: y.len(),
            });
        }
        tensor.data.copy_from_slice(y);
        Ok(())
    }

    /// Run every op in listed (topological) order.
    pub fn forward(&mut self) -> GraphResult<()> {
        for op in &self.ops {
            ops::forward(op.kind, &mut self.tensors, &op.inputs, op.output)?;
        }
        Ok(())
    }

    /// Reverse-mode pass: zero (and resize) non-param grads, seed every
    /// element of the loss grad with 1.0, then run the ops backward in
    /// reverse order. Param grads accumulate across calls until
    /// [Graph::reset_grad].
    pub fn backward(&mut self) -> GraphResult<()> {
        for tensor in &mut self.tensors {
            if tensor.kind != TensorKind::Param {
                tensor.zero_grad();
            }
        }
        self.tensors[self.loss_id].grad.fill(1.0);

        for op in self.ops.iter().rev() {
            ops::backward(op.kind, &mut self.tensors, &op.inputs, op.output)?;
        }
        self.acc_steps += 1;
        Ok(())
    }

    /// Zero all grads (params included) and the accumulation counter.
    /// The optimizer calls this after each step.
    pub fn reset_grad(&mut self) {
        self.acc_steps = 0;
        for tensor in &mut self.tensors {
            tensor.zero_grad();
        }
    }

    /// Loss value: mean of the loss tensor entries when batched, the
    /// single entry otherwise, 0 when empty.
    pub fn loss(&self) -> Scalar {
        let data = &self.tensors[self.loss_id].data;
        match data.len() {
            0 => 0.0,
            1 => data[0],
            n => data.iter().sum::<Scalar>() / n as Scalar,
        }
    }

    /// Output tensor data, or zeros of the declared size if forward has
    /// never produced it.
    pub fn output(&self) -> Vec<Scalar> {
        let tensor = &self.tensors[self.output_id];
        if tensor.data.is_empty() {
            vec![0.0; tensor.numel()]
        } else {
            tensor.data.clone()
        }
    }

    /// Declared element count of the input tensor.
    pub fn input_size(&self) -> GraphResult<usize> {
        let id = self.input_id.ok_or(GraphError::Missing("input"))?;
        Ok(self.tensors[id].numel())
    }

    /// Declared element count of the output tensor.
    pub fn output_size(&self) -> usize {
        self.tensors[self.output_id].numel()
    }

    /// Tensor accessor with range check.
    pub fn tensor(&self, id: usize) -> GraphResult<&Tensor> {
        self.tensors.get(id).ok_or(GraphError::TensorId(id))
    }

    /// Mutable tensor accessor (optimizer updates, test harnesses).
    pub fn tensor_mut(&mut self, id: usize) -> GraphResult<&mut Tensor> {
        self.tensors.get_mut(id).ok_or(GraphError::TensorId(id))
    }

    /// Ids the optimizer may update (and that checkpoints carry).
    pub fn trainable(&self) -> &[usize] {
        &self.trainable
    }

    /// Backward calls since the last [Graph::reset_grad].
    pub fn acc_steps(&self) -> usize {
        self.acc_steps
    }

    /// Write the trainable tensors (data + shape) as a JSON checkpoint.
    pub fn save_weights(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut weights = WeightsFile::default();
        for &id in &self.trainable {
            let tensor = &self.tensors[id];
            weights.tensors.insert(
                id.to_string(),
                WeightEntry {
                    data: tensor.data.clone(),
                    shape: tensor.shape.clone(),
                },
            );
        }
        write_json(path, &weights)
    }

    /// Write the graph definition together with every tensor's current data.
    pub fn save_all(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut tensors = BTreeMap::new();
        for tensor in &self.tensors {
            tensors.insert(tensor.id.to_string(), tensor.data.clone());
        }
        let snapshot = GraphSnapshot {
            graph: self.def.clone(),
            tensors,
        };
        write_json(path, &snapshot)
    }
}

fn write_json<T: serde::Serialize>(path: impl AsRef<Path>, value: &T) -> std::io::Result<()> {
    let f = File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    w.flush()
}
