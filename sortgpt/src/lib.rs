//! # sortgpt
//!
//! Teach a small GPT to sort short digit sequences: a synthetic dataset with a hash-based
//! train/test split, a compact transformer on a tensor autograd engine, AdamW training, and
//! greedy-decoding evaluation. [`experiment::run`] wires it all together from a [`Config`].

pub mod autograd;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod experiment;
pub mod generate;
pub mod logger;
pub mod model;
pub mod optim;
pub mod train;

pub use config::Config;
pub use error::{Error, Result};
