//! Adam with decoupled weight decay.

use crate::config::TrainerConfig;
use crate::model::Param;

use super::Optimizer;

const EPSILON: f64 = 1e-8;

/// AdamW: Adam moments with bias correction, plus `p -= lr * weight_decay * p` on parameters
/// flagged for decay.
///
/// Moment buffers are allocated on the first step and matched to parameters by position,
/// so every call must pass the same parameter list in the same order.
#[derive(Clone, Debug)]
pub struct AdamW {
    lr: f64,
    beta1: f64,
    beta2: f64,
    weight_decay: f64,
    step: i32,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl AdamW {
    #[must_use]
    pub fn new(lr: f64, betas: (f64, f64), weight_decay: f64) -> Self {
        AdamW {
            lr,
            beta1: betas.0,
            beta2: betas.1,
            weight_decay,
            step: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &TrainerConfig) -> Self {
        Self::new(config.learning_rate, config.betas, config.weight_decay)
    }

    /// Number of steps taken so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.step as usize
    }
}

impl Optimizer for AdamW {
    fn step(&mut self, params: &[Param]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|p| vec![0.0; p.tensor.len()]).collect();
            self.v = self.m.clone();
        }
        self.step += 1;
        let (lr, beta1, beta2) = (self.lr, self.beta1, self.beta2);
        let bias1 = 1.0 - beta1.powi(self.step);
        let bias2 = 1.0 - beta2.powi(self.step);

        for ((p, m), v) in params.iter().zip(&mut self.m).zip(&mut self.v) {
            let decay = if p.decay { lr * self.weight_decay } else { 0.0 };
            p.tensor.update(|data, grad| {
                for i in 0..data.len() {
                    let g = grad[i];
                    m[i] = beta1 * m[i] + (1.0 - beta1) * g;
                    v[i] = beta2 * v[i] + (1.0 - beta2) * g * g;
                    let m_hat = m[i] / bias1;
                    let v_hat = v[i] / bias2;
                    data[i] -= decay * data[i];
                    data[i] -= lr * m_hat / (v_hat.sqrt() + EPSILON);
                    grad[i] = 0.0;
                }
            });
        }
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }
}
