//! Autograd implementations.

pub mod tensor;
