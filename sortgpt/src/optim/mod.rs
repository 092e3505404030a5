//! Gradient clipping and the optimizer.
//!
//! [`Optimizer`] is the seam the trainer steps through; [`AdamW`] is the one implementation.

mod adamw;

use crate::model::Param;

pub use adamw::AdamW;

/// Updates parameters from their accumulated gradients.
pub trait Optimizer {
    /// Applies one update and zeroes every gradient.
    fn step(&mut self, params: &[Param]);

    fn learning_rate(&self) -> f64;
}

/// Rescales all gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping. `max_norm <= 0` only measures.
pub fn clip_grad_norm(params: &[Param], max_norm: f64) -> f64 {
    let norm = params
        .iter()
        .flat_map(|p| p.tensor.grad())
        .map(|g| g * g)
        .sum::<f64>()
        .sqrt();
    if max_norm > 0.0 && norm > max_norm {
        let scale = max_norm / norm;
        for p in params {
            p.tensor.update(|_, grad| grad.iter_mut().for_each(|g| *g *= scale));
        }
    }
    norm
}
