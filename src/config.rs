//! Run configuration: the graph definition plus its collaborators
//! (optimizer choice, dataset paths, checkpoint path, epoch count).
//! Field names match the exporter's JSON exactly, `save_Path` included.

use crate::graph::{GraphDef, WeightsFile};
use crate::tensor::Scalar;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unable to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported optimizer: {0}")]
    UnknownOptimizer(String),
}

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub graph: GraphDef,
    #[serde(default)]
    pub optimizer: Option<OptimizerDef>,
    #[serde(default)]
    pub train_data_file: Option<String>,
    #[serde(default)]
    pub val_data_file: Option<String>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default, rename = "save_Path")]
    pub save_path: Option<String>,
    #[serde(default)]
    pub epochs_number: u32,
    #[serde(default = "default_log_every")]
    pub log_on_each_x_batch: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OptimizerDef {
    pub name: String,
    #[serde(default)]
    pub params: OptimizerParams,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OptimizerParams {
    #[serde(default = "default_learning_rate", rename = "learningRate")]
    pub learning_rate: Scalar,
    #[serde(default = "default_beta1")]
    pub beta1: Scalar,
    #[serde(default = "default_beta2")]
    pub beta2: Scalar,
    #[serde(default = "default_eps")]
    pub eps: Scalar,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        OptimizerParams {
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
        }
    }
}

fn default_log_every() -> usize {
    1
}

fn default_learning_rate() -> Scalar {
    0.1
}

fn default_beta1() -> Scalar {
    0.9
}

fn default_beta2() -> Scalar {
    0.999
}

fn default_eps() -> Scalar {
    1e-8
}

/// Load any of the JSON surfaces through a buffered reader.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> LoadResult<T> {
    let path_str = path.as_ref().display().to_string();
    let f = File::open(path.as_ref()).map_err(|source| LoadError::Io {
        path: path_str.clone(),
        source,
    })?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).map_err(|source| LoadError::Parse {
        path: path_str,
        source,
    })
}

/// Load a run configuration.
pub fn load_config(path: impl AsRef<Path>) -> LoadResult<Config> {
    load_json(path)
}

/// Load a weights checkpoint.
pub fn load_weights(path: impl AsRef<Path>) -> LoadResult<WeightsFile> {
    load_json(path)
}
