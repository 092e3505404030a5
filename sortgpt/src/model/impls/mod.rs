//! Transformer building blocks and the assembled [`Gpt`].

mod gpt;
mod layers;

pub use gpt::Gpt;
