//! Central place for all configuration constants.
//!
//! Default values and environment variable naming used by the config builder.
//! Defaults reproduce the reference sort experiment (minGPT "gpt-nano" sized model).

/// Environment variable prefix (e.g. `SORTGPT_SEED`, `SORTGPT_TRAINER__MAX_ITERS`).
pub(crate) const ENV_PREFIX: &str = "SORTGPT_";

/// Separates nested path segments inside an environment variable name.
pub(crate) const ENV_PATH_SEPARATOR: &str = "__";

// --- Default values ---

pub(crate) const DEFAULT_EXP_NAME: &str = "train_sort";
pub(crate) const DEFAULT_SEED: u64 = 1;

pub(crate) const DEFAULT_LENGTH: usize = 6;
pub(crate) const DEFAULT_NUM_DIGITS: usize = 3;
pub(crate) const DEFAULT_NUM_SAMPLES: usize = 10_000;

pub(crate) const DEFAULT_N_LAYER: usize = 3;
pub(crate) const DEFAULT_N_HEAD: usize = 3;
pub(crate) const DEFAULT_N_EMBD: usize = 48;
pub(crate) const DEFAULT_PDROP: f64 = 0.1;

pub(crate) const DEFAULT_MAX_ITERS: usize = 2000;
pub(crate) const DEFAULT_BATCH_SIZE: usize = 64;
pub(crate) const DEFAULT_LEARNING_RATE: f64 = 5e-4;
pub(crate) const DEFAULT_BETAS: (f64, f64) = (0.9, 0.95);
/// Only applied on matmul weights.
pub(crate) const DEFAULT_WEIGHT_DECAY: f64 = 0.1;
pub(crate) const DEFAULT_GRAD_NORM_CLIP: f64 = 1.0;
pub(crate) const DEFAULT_LOG_EVERY: usize = 100;

pub(crate) const DEFAULT_EVAL_BATCH_SIZE: usize = 100;
pub(crate) const DEFAULT_EVAL_MAX_BATCHES: usize = 50;
pub(crate) const DEFAULT_EVAL_MAX_MISTAKES: usize = 3;
