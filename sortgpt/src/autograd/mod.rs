//! Autograd: 2-D tensors with reverse-mode automatic differentiation.
//!
//! Every op on a [`Tensor`] records its inputs and a closure applying the chain rule.
//! [`Tensor::backward`] on a scalar loss sorts the graph topologically and propagates
//! gradients from the loss to all leaves (the model parameters).

pub mod impls;
#[cfg(test)]
mod tests;

pub use impls::tensor::Tensor;
