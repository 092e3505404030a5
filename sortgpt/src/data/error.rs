//! Errors produced when building datasets or loaders.
//!
//! All errors from the data module use [`DataError`]. The crate-level [`Error`](crate::Error)
//! wraps this type.

use std::fmt;

use super::Split;

/// Errors produced by the data module.
///
/// # Variants
///
/// - **InvalidLength**: The problem length is 0.
///   *When*: [`SortDataset::new`](super::SortDataset::new).
///   *Recovery*: Use a length of at least 1.
///
/// - **InvalidNumDigits**: The alphabet size is 0 or larger than 256.
///   *When*: [`SortDataset::new`](super::SortDataset::new).
///   *Recovery*: Use `1..=256` digits.
///
/// - **EmptyDataset**: The nominal dataset length is 0.
///   *When*: [`SortDataset::with_num_samples`](super::SortDataset::with_num_samples), or
///   [`RandomLoader::new`](super::RandomLoader::new) over an empty dataset.
///   *Recovery*: Use at least one sample.
///
/// - **EmptySplit**: No input sequence hashes into the requested split, so rejection sampling
///   could never return.
///   *When*: [`SortDataset::new`](super::SortDataset::new) for tiny input spaces (e.g. one digit, length 1).
///   *Recovery*: Increase `length` or `num_digits`.
///
/// - **EmptyBatch**: A loader was asked for batches of size 0.
///   *When*: [`RandomLoader::new`](super::RandomLoader::new) or [`SequentialLoader::new`](super::SequentialLoader::new).
///   *Recovery*: Use a batch size of at least 1.
///
/// - **UnknownSplit**: A split name other than `train` or `test`.
///   *When*: Parsing a [`Split`] from a string.
///   *Recovery*: Use `train` or `test`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Problem length is 0.
    InvalidLength,

    /// Alphabet size outside `1..=256`.
    InvalidNumDigits(usize),

    /// Dataset length is 0.
    EmptyDataset,

    /// The split cannot be sampled.
    EmptySplit(Split),

    /// Batch size is 0.
    EmptyBatch,

    /// Unrecognised split name.
    UnknownSplit(String),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::InvalidLength => write!(f, "data: sequence length must be at least 1"),
            DataError::InvalidNumDigits(n) => {
                write!(f, "data: num_digits must be in 1..=256, got {n}")
            }
            DataError::EmptyDataset => write!(f, "data: dataset length must be at least 1"),
            DataError::EmptySplit(split) => {
                write!(f, "data: no input sequence falls into the {split} split")
            }
            DataError::EmptyBatch => write!(f, "data: batch size must be at least 1"),
            DataError::UnknownSplit(s) => {
                write!(f, "data: unknown split {s:?} (expected train or test)")
            }
        }
    }
}

impl std::error::Error for DataError {}
