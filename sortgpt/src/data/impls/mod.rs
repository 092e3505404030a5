//! Implementations of [`Dataset`](super::Dataset) and the loaders that batch them.
//!
//! One file per concern: [`sort`] for the digit-sorting task, [`loader`] for batching.

mod loader;
mod sort;

pub use loader::{RandomLoader, SequentialLoader};
pub use sort::{split_of, SortDataset};
