//! The digit-sorting problem: random sequences over `num_digits` symbols, and their sorted form.

use rand::Rng;

use crate::config::DataConfig;
use crate::data::{DataError, Dataset, Example, Split};

/// Input spaces up to this size are enumerated once to confirm a split is reachable.
const MAX_ENUMERATED_INPUTS: usize = 1 << 20;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// murmur3 `fmix64`. FNV-1a's low bits depend only on the low bits of each byte.
fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// Deterministic split assignment: FNV-1a over the digits, finalised with `fmix64`; a quarter
/// of sequences go to test.
///
/// Every sequence belongs to exactly one split, so train and test never share a problem.
#[must_use]
pub fn split_of(input: &[usize]) -> Split {
    let hash = input.iter().fold(FNV_OFFSET, |h, &d| {
        // digits are < 256
        (h ^ (d as u8 as u64)).wrapping_mul(FNV_PRIME)
    });
    if fmix64(hash) % 4 == 0 {
        Split::Test
    } else {
        Split::Train
    }
}

fn distinct(input: &[usize], num_digits: usize) -> usize {
    let mut seen = vec![false; num_digits];
    input
        .iter()
        .filter(|&&d| !std::mem::replace(&mut seen[d], true))
        .count()
}

/// Whether any sequence of `length` digits lands in `split`, or `None` when the space is too large
/// to check exhaustively.
fn split_reachable(split: Split, length: usize, num_digits: usize) -> Option<bool> {
    let space = u32::try_from(length)
        .ok()
        .and_then(|l| num_digits.checked_pow(l))
        .filter(|&n| n <= MAX_ENUMERATED_INPUTS)?;

    let mut digits = vec![0usize; length];
    for _ in 0..space {
        if split_of(&digits) == split {
            return Some(true);
        }
        for d in digits.iter_mut().rev() {
            *d += 1;
            if *d < num_digits {
                break;
            }
            *d = 0;
        }
    }
    Some(false)
}

/// Sequences of `length` digits drawn uniformly from `0..num_digits`, paired with their sorted form.
///
/// Samples are generated on demand: the index passed to [`Dataset::get`] is ignored and
/// [`Dataset::len`] is only the nominal epoch size. Half of all draws with more than
/// `length / 2` distinct digits are rejected to bias toward sequences with repeats, and
/// draws that hash into the other split are rejected outright.
#[derive(Clone, Debug)]
pub struct SortDataset {
    split: Split,
    length: usize,
    num_digits: usize,
    num_samples: usize,
}

impl SortDataset {
    /// Creates a dataset with the default nominal length.
    ///
    /// # Errors
    ///
    /// [`DataError::InvalidLength`], [`DataError::InvalidNumDigits`], or
    /// [`DataError::EmptySplit`] when no sequence can be drawn for `split`.
    pub fn new(split: Split, length: usize, num_digits: usize) -> Result<Self, DataError> {
        if length == 0 {
            return Err(DataError::InvalidLength);
        }
        if num_digits == 0 || num_digits > 256 {
            return Err(DataError::InvalidNumDigits(num_digits));
        }
        if split_reachable(split, length, num_digits) == Some(false) {
            return Err(DataError::EmptySplit(split));
        }
        Ok(SortDataset {
            split,
            length,
            num_digits,
            num_samples: crate::config::constants::DEFAULT_NUM_SAMPLES,
        })
    }

    /// Builds the dataset for `split` from a [`DataConfig`].
    pub fn from_config(split: Split, config: &DataConfig) -> Result<Self, DataError> {
        Self::new(split, config.length, config.num_digits)?.with_num_samples(config.num_samples)
    }

    /// Sets the nominal dataset length.
    pub fn with_num_samples(mut self, num_samples: usize) -> Result<Self, DataError> {
        if num_samples == 0 {
            return Err(DataError::EmptyDataset);
        }
        self.num_samples = num_samples;
        Ok(self)
    }

    #[must_use]
    pub fn split(&self) -> Split {
        self.split
    }

    /// Problem length `L`.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.num_digits
    }

    /// Context the model needs: `2 * L - 1`.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.length * 2 - 1
    }

    fn draw_input<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        loop {
            let input: Vec<usize> = (0..self.length)
                .map(|_| rng.random_range(0..self.num_digits))
                .collect();
            let coin = rng.random::<f64>();
            if coin < 0.5 && distinct(&input, self.num_digits) > self.length / 2 {
                continue;
            }
            if split_of(&input) == self.split {
                return input;
            }
        }
    }
}

impl Dataset for SortDataset {
    fn len(&self) -> usize {
        self.num_samples
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Example {
        Example::from_input(&self.draw_input(rng))
    }
}
