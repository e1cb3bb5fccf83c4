//! Training driver: epochs over shuffled batches, per-sample forward /
//! error accumulation / backward, optimizer step at batch boundaries,
//! then a validation pass with best-checkpoint selection.

use crate::config::{self, Config, LoadError, OptimizerDef};
use crate::data::{DataError, StreamDataset};
use crate::graph::{Graph, GraphError, WeightsFile};
use crate::optimizer::{Adam, Fixed, Optimizer, OptimizerError};
use crate::tensor::Scalar;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("not initialized: {0}")]
    NotInitialized(&'static str),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TrainResult<T> = Result<T, TrainError>;

/// Index of the largest value; 0 for an empty slice.
pub fn argmax(values: &[Scalar]) -> usize {
    let mut max_index = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[max_index] {
            max_index = i;
        }
    }
    max_index
}

/// Build the configured optimizer; unknown names are load errors.
fn build_optimizer(def: &OptimizerDef) -> Result<Box<dyn Optimizer>, LoadError> {
    match def.name.as_str() {
        "Adam" => {
            let p = &def.params;
            Ok(Box::new(
                Adam::new(p.learning_rate)
                    .with_betas(p.beta1, p.beta2)
                    .with_eps(p.eps),
            ))
        }
        "Fixed" => Ok(Box::new(Fixed::new())),
        other => Err(LoadError::UnknownOptimizer(other.to_string())),
    }
}

/// Trainer: the graph plus its optional collaborators (optimizer, train
/// and validation datasets, checkpoint path). Prediction works with the
/// graph alone; [Trainer::train] needs all of them.
pub struct Trainer {
    graph: Graph,
    optimizer: Option<Box<dyn Optimizer>>,
    train_data: Option<StreamDataset>,
    val_data: Option<StreamDataset>,
    save_path: Option<String>,
    epochs: u32,
    log_every: usize,
}

impl Trainer {
    /// Load config (and an optional weights checkpoint) from disk.
    pub fn from_config_path(
        config_path: impl AsRef<Path>,
        weights_path: Option<&Path>,
    ) -> TrainResult<Self> {
        let cfg = config::load_config(config_path)?;
        let weights = weights_path.map(config::load_weights).transpose()?;
        Self::from_config(cfg, weights.as_ref())
    }

    pub fn from_config(cfg: Config, weights: Option<&WeightsFile>) -> TrainResult<Self> {
        let graph = Graph::from_def(cfg.graph, weights)?;
        let optimizer = cfg
            .optimizer
            .as_ref()
            .map(build_optimizer)
            .transpose()?;

        // Datasets are configured all-or-nothing.
        let (train_data, val_data) = match (&cfg.train_data_file, &cfg.val_data_file, cfg.batch_size)
        {
            (Some(train), Some(val), Some(batch)) => (
                Some(StreamDataset::open(train, batch)?),
                Some(StreamDataset::open(val, batch)?),
            ),
            _ => (None, None),
        };

        Ok(Trainer {
            graph,
            optimizer,
            train_data,
            val_data,
            save_path: cfg.save_path,
            epochs: cfg.epochs_number,
            log_every: cfg.log_on_each_x_batch,
        })
    }

    /// Run the configured number of epochs, checkpointing the best
    /// validation loss when a save path is set.
    pub fn train(&mut self) -> TrainResult<()> {
        let graph = &mut self.graph;
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or(TrainError::NotInitialized("optimizer"))?;
        let train = self
            .train_data
            .as_mut()
            .ok_or(TrainError::NotInitialized("training dataset"))?;
        let val = self
            .val_data
            .as_mut()
            .ok_or(TrainError::NotInitialized("validation dataset"))?;

        let mut best_val_loss = Scalar::MAX;
        let mut x = Vec::new();
        let mut y = Vec::new();

        for epoch in 1..=self.epochs {
            tracing::info!(epoch = epoch as u64, "epoch start");
            train.shuffle_epoch()?;
            let mut batch_index = 0usize;

            while train.next_batch()? {
                while train.next_sample(&mut x, &mut y)? {
                    graph.set_input(&x)?;
                    graph.set_target(&y)?;
                    graph.forward()?;
                    optimizer.add_error(graph.loss());
                    graph.backward()?;
                }

                let batch_error = optimizer.error();
                optimizer.step(graph)?;
                optimizer.zero_grads(graph);
                batch_index += 1;

                if self.log_every > 0 && batch_index % self.log_every == 0 {
                    tracing::info!(
                        batch = batch_index as u64,
                        error = batch_error as f64,
                        "train error"
                    );
                }
            }

            let val_loss = validation_pass(graph, val)?;
            tracing::info!(epoch = epoch as u64, val_loss = val_loss as f64, "validation");

            if val_loss < best_val_loss {
                best_val_loss = val_loss;
                if let Some(path) = &self.save_path {
                    graph.save_weights(path)?;
                    tracing::info!(path = %path, val_loss = val_loss as f64, "checkpoint saved");
                }
            } else {
                tracing::info!(
                    val_loss = val_loss as f64,
                    best = best_val_loss as f64,
                    "validation loss did not improve"
                );
            }
        }
        Ok(())
    }

    /// Mean loss over the validation dataset (no shuffle, no backward).
    pub fn validation_loss(&mut self) -> TrainResult<Scalar> {
        let graph = &mut self.graph;
        let val = self
            .val_data
            .as_mut()
            .ok_or(TrainError::NotInitialized("validation dataset"))?;
        validation_pass(graph, val)
    }

    /// Forward a single input and return the output tensor data.
    pub fn predict(&mut self, x: &[Scalar]) -> TrainResult<Vec<Scalar>> {
        self.graph.set_input(x)?;
        self.graph.forward()?;
        Ok(self.graph.output())
    }

    /// Forward a single input and return the argmax of the output.
    pub fn predict_label(&mut self, x: &[Scalar]) -> TrainResult<usize> {
        Ok(argmax(&self.predict(x)?))
    }

    /// Declared input element count.
    pub fn input_size(&self) -> TrainResult<usize> {
        Ok(self.graph.input_size()?)
    }

    /// Declared output element count.
    pub fn output_size(&self) -> usize {
        self.graph.output_size()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}

fn validation_pass(graph: &mut Graph, val: &mut StreamDataset) -> TrainResult<Scalar> {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut loss = 0.0;
    let mut count = 0usize;

    val.reset_epoch()?;
    while val.next_batch()? {
        while val.next_sample(&mut x, &mut y)? {
            graph.set_input(&x)?;
            graph.set_target(&y)?;
            graph.forward()?;
            loss += graph.loss();
            count += 1;
        }
    }

    Ok(if count > 0 { loss / count as Scalar } else { 0.0 })
}
