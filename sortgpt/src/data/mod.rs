//! Synthetic sorting data.
//!
//! This module defines the **trait** ([`Dataset`]), **models** ([`Split`], [`Example`], [`Batch`]),
//! and **error** ([`DataError`]). The sorting task ([`SortDataset`]) and the batch loaders
//! ([`RandomLoader`], [`SequentialLoader`]) live in the `impls` submodule.

mod error;
mod impls;
mod types;

use rand::Rng;

pub use error::DataError;
pub use impls::{split_of, RandomLoader, SequentialLoader, SortDataset};
pub use types::{Batch, Example, Split};

/// A source of examples with a nominal length.
///
/// Generated datasets may ignore the index and draw a fresh example per call; the default
/// [`Dataset::get`] does exactly that.
pub trait Dataset {
    /// Nominal number of examples (one epoch).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draws one example.
    fn sample<R: Rng>(&self, rng: &mut R) -> Example;

    /// Example at `idx`.
    fn get<R: Rng>(&self, _idx: usize, rng: &mut R) -> Example {
        self.sample(rng)
    }
}
