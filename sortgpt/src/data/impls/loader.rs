//! Batch loaders over a [`Dataset`].
//!
//! Both loaders own their random stream so they can be plain iterators. [`RandomLoader`]
//! never ends; [`SequentialLoader`] makes one pass over `0..len` and emits a short final batch.

use rand::rngs::StdRng;
use rand::Rng;

use crate::data::{Batch, DataError, Dataset};

/// Endless batches of indices drawn with replacement.
#[derive(Debug)]
pub struct RandomLoader<'a, D> {
    dataset: &'a D,
    batch_size: usize,
    rng: StdRng,
}

impl<'a, D: Dataset> RandomLoader<'a, D> {
    pub fn new(dataset: &'a D, batch_size: usize, rng: StdRng) -> Result<Self, DataError> {
        if batch_size == 0 {
            return Err(DataError::EmptyBatch);
        }
        if dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        Ok(RandomLoader {
            dataset,
            batch_size,
            rng,
        })
    }
}

impl<D: Dataset> Iterator for RandomLoader<'_, D> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let n = self.dataset.len();
        let rng = &mut self.rng;
        let dataset = self.dataset;
        Some(
            (0..self.batch_size)
                .map(|_| {
                    let idx = rng.random_range(0..n);
                    dataset.get(idx, rng)
                })
                .collect(),
        )
    }
}

/// One ordered pass over the dataset.
#[derive(Debug)]
pub struct SequentialLoader<'a, D> {
    dataset: &'a D,
    batch_size: usize,
    cursor: usize,
    rng: StdRng,
}

impl<'a, D: Dataset> SequentialLoader<'a, D> {
    pub fn new(dataset: &'a D, batch_size: usize, rng: StdRng) -> Result<Self, DataError> {
        if batch_size == 0 {
            return Err(DataError::EmptyBatch);
        }
        Ok(SequentialLoader {
            dataset,
            batch_size,
            cursor: 0,
            rng,
        })
    }

    /// Batches in one full pass, including a short final batch.
    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }
}

impl<D: Dataset> Iterator for SequentialLoader<'_, D> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let len = self.dataset.len();
        if self.cursor >= len {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(len);
        let rng = &mut self.rng;
        let dataset = self.dataset;
        let batch = (self.cursor..end).map(|idx| dataset.get(idx, rng)).collect();
        self.cursor = end;
        Some(batch)
    }
}
