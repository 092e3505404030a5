//! Errors produced when building or running the model.
//!
//! All errors from the model module (and token generation, which drives it) use [`ModelError`].

use std::fmt;

/// Errors produced by the model module.
///
/// # Variants
///
/// - **InvalidConfig**: The architecture cannot be built (e.g. `n_embd` not divisible by `n_head`,
///   zero vocabulary or block size).
///   *When*: [`Gpt::new`](super::Gpt::new).
///   *Recovery*: Fix the `gpt` config section or the dataset sizes.
///
/// - **EmptyBatch** / **EmptySequence**: No rows, or rows with no tokens.
///   *When*: [`Gpt::forward`](super::Gpt::forward), generation.
///   *Recovery*: Pass at least one non-empty sequence.
///
/// - **RaggedBatch**: Rows of different lengths.
///   *When*: [`Gpt::forward`](super::Gpt::forward).
///   *Recovery*: Batch sequences of equal length.
///
/// - **SequenceTooLong**: More tokens than the model's context.
///   *When*: [`Gpt::forward`](super::Gpt::forward). Generation crops, so it never sees this.
///   *Recovery*: Crop input to `block_size`.
///
/// - **TokenOutOfVocab** / **TargetOutOfVocab**: An id `>= vocab_size`.
///   *When*: [`Gpt::forward`](super::Gpt::forward).
///   *Recovery*: Check the prompt or the dataset's alphabet.
///
/// - **TargetShape**: Targets are not `[B, T]` like the input.
///   *When*: [`Gpt::forward`](super::Gpt::forward) with targets.
///
/// - **InvalidSampling**: Non-positive temperature or `top_k == Some(0)`.
///   *When*: [`generate`](crate::generate::generate).
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The model cannot be built with these sizes.
    InvalidConfig(String),

    /// Batch has no rows.
    EmptyBatch,

    /// Rows have no tokens.
    EmptySequence,

    /// Row `row` has `got` tokens where `expected` were required.
    RaggedBatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Sequence exceeds the context window.
    SequenceTooLong { len: usize, block_size: usize },

    /// Input token id outside the vocabulary.
    TokenOutOfVocab { token: usize, vocab_size: usize },

    /// Targets do not match the input's `[B, T]`.
    TargetShape { expected: [usize; 2] },

    /// Target id outside the vocabulary.
    TargetOutOfVocab { target: usize, vocab_size: usize },

    /// Bad generation options.
    InvalidSampling(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidConfig(msg) => write!(f, "model: invalid config: {msg}"),
            ModelError::EmptyBatch => write!(f, "model: batch is empty"),
            ModelError::EmptySequence => write!(f, "model: sequences are empty"),
            ModelError::RaggedBatch { row, expected, got } => write!(
                f,
                "model: row {row} has {got} tokens, expected {expected}"
            ),
            ModelError::SequenceTooLong { len, block_size } => write!(
                f,
                "model: cannot forward sequence of length {len}, block size is only {block_size}"
            ),
            ModelError::TokenOutOfVocab { token, vocab_size } => {
                write!(f, "model: token {token} out of vocabulary of {vocab_size}")
            }
            ModelError::TargetShape { expected } => write!(
                f,
                "model: targets must be {}x{} like the input",
                expected[0], expected[1]
            ),
            ModelError::TargetOutOfVocab { target, vocab_size } => {
                write!(f, "model: target {target} out of vocabulary of {vocab_size}")
            }
            ModelError::InvalidSampling(msg) => write!(f, "model: invalid sampling: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {}
