//! Optimizer: consumes the gradients a batch of backward calls accumulated
//! in the graph and updates the trainable tensors. Also owns the running
//! batch-error average the training loop reports.

use crate::graph::Graph;
use crate::tensor::Scalar;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("optimizer error: {0}")]
pub struct OptimizerError(pub String);

pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Running mean of per-sample losses between optimizer steps.
#[derive(Default)]
struct ErrorAccum {
    sum: Scalar,
    count: usize,
}

impl ErrorAccum {
    fn add(&mut self, error: Scalar) {
        self.sum += error;
        self.count += 1;
    }

    fn mean(&self) -> Scalar {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as Scalar
        }
    }

    fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

/// Optimizer contract: `step` reads accumulated grads and updates params;
/// `zero_grads` closes the batch (clears grads, acc_steps, and the error
/// accumulator).
pub trait Optimizer {
    /// One update over the graph's trainable set.
    fn step(&mut self, graph: &mut Graph) -> OptimizerResult<()>;

    /// Record one sample's loss for the running batch error.
    fn add_error(&mut self, error: Scalar);

    /// Mean of the recorded losses, 0 when none were recorded.
    fn error(&self) -> Scalar;

    /// Reset error accumulation and zero every grad in the graph.
    fn zero_grads(&mut self, graph: &mut Graph);

    /// Clamp per-coordinate gradients to +-clip before the update.
    fn set_grad_clip(&mut self, clip: Option<Scalar>);
}

/// Adam: first- and second-moment estimates with bias correction.
/// Moment buffers are keyed by tensor id and lazily grown zero-filled.
/// Gradients are averaged over the backward calls of the batch
/// (`acc_steps`) before the moment updates.
pub struct Adam {
    pub lr: Scalar,
    pub beta1: Scalar,
    pub beta2: Scalar,
    pub eps: Scalar,
    m: HashMap<usize, Vec<Scalar>>,
    v: HashMap<usize, Vec<Scalar>>,
    t: u32,
    grad_clip: Option<Scalar>,
    errors: ErrorAccum,
}

impl Adam {
    pub fn new(lr: Scalar) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            m: HashMap::new(),
            v: HashMap::new(),
            t: 1,
            grad_clip: None,
            errors: ErrorAccum::default(),
        }
    }

    pub fn with_betas(mut self, beta1: Scalar, beta2: Scalar) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_eps(mut self, eps: Scalar) -> Self {
        self.eps = eps;
        self
    }
}

impl Optimizer for Adam {
    fn step(&mut self, graph: &mut Graph) -> OptimizerResult<()> {
        let n = graph.acc_steps().max(1) as Scalar;
        let beta1_t = self.beta1.powi(self.t as i32);
        let beta2_t = self.beta2.powi(self.t as i32);

        let ids: Vec<usize> = graph.trainable().to_vec();
        for tid in ids {
            let tensor = graph
                .tensor_mut(tid)
                .map_err(|e| OptimizerError(e.to_string()))?;
            let size = tensor.data.len();
            let m = self.m.entry(tid).or_default();
            let v = self.v.entry(tid).or_default();
            if m.len() < size {
                m.resize(size, 0.0);
            }
            if v.len() < size {
                v.resize(size, 0.0);
            }

            for i in 0..size {
                let mut g = tensor.grad[i] / n;
                if let Some(clip) = self.grad_clip {
                    g = g.clamp(-clip, clip);
                }

                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;

                let m_hat = m[i] / (1.0 - beta1_t);
                let v_hat = v[i] / (1.0 - beta2_t);

                tensor.data[i] -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
            }
        }

        self.t += 1;
        Ok(())
    }

    fn add_error(&mut self, error: Scalar) {
        self.errors.add(error);
    }

    fn error(&self) -> Scalar {
        self.errors.mean()
    }

    fn zero_grads(&mut self, graph: &mut Graph) {
        self.errors.reset();
        graph.reset_grad();
    }

    fn set_grad_clip(&mut self, clip: Option<Scalar>) {
        self.grad_clip = clip;
    }
}

/// Fixed: placeholder optimizer whose step leaves parameters untouched.
/// Error accumulation and grad zeroing still work so the training loop
/// can run unchanged.
#[derive(Default)]
pub struct Fixed {
    errors: ErrorAccum,
}

impl Fixed {
    pub fn new() -> Self {
        Fixed::default()
    }
}

impl Optimizer for Fixed {
    fn step(&mut self, _graph: &mut Graph) -> OptimizerResult<()> {
        Ok(())
    }

    fn add_error(&mut self, error: Scalar) {
        self.errors.add(error);
    }

    fn error(&self) -> Scalar {
        self.errors.mean()
    }

    fn zero_grads(&mut self, graph: &mut Graph) {
        self.errors.reset();
        graph.reset_grad();
    }

    fn set_grad_clip(&mut self, _clip: Option<Scalar>) {}
}
