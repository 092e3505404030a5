//! The GPT model.
//!
//! This module defines the **model** ([`Gpt`]), the **forward mode** ([`ForwardMode`]), the
//! **parameter view** handed to optimizers ([`Param`]), and the **error** ([`ModelError`]).
//! Layers live in the `impls` submodule.

mod error;
mod impls;

use rand::rngs::StdRng;

use crate::autograd::Tensor;

pub use error::ModelError;
pub use impls::Gpt;

/// Whether a forward pass trains (dropout active, drawing masks from the rng) or evaluates.
#[derive(Debug)]
pub enum ForwardMode<'a> {
    Train(&'a mut StdRng),
    Eval,
}

impl ForwardMode<'_> {
    pub(crate) fn dropout(&mut self, x: &Tensor, p: f64) -> Tensor {
        match self {
            ForwardMode::Train(rng) => x.dropout(p, &mut **rng),
            ForwardMode::Eval => x.clone(),
        }
    }
}

/// A named trainable tensor. `decay` marks matmul weights, the only tensors weight decay
/// applies to.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub tensor: Tensor,
    pub decay: bool,
}

impl Param {
    pub(crate) fn new(name: impl Into<String>, tensor: &Tensor, decay: bool) -> Self {
        Param {
            name: name.into(),
            tensor: tensor.clone(),
            decay,
        }
    }
}
