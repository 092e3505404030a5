//! Types for sort-task data: [`Split`], one [`Example`], and a collated [`Batch`].

use std::fmt;
use std::str::FromStr;

use super::DataError;

/// Which side of the hash-based train/test partition a dataset draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(DataError::UnknownSplit(other.to_string())),
        }
    }
}

/// One training example: the shifted concatenation of a problem and its solution.
///
/// For length 6, input `0 0 2 1 0 1` has solution `0 0 0 1 1 2`, and
///
/// ```text
/// x: 0 0 2 1 0 1 0 0 0 1 1
/// y: - - - - - 0 0 0 1 1 2
/// ```
///
/// where `-` (`None`) marks positions the loss ignores while the model reads the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Example {
    pub x: Vec<usize>,
    pub y: Vec<Option<usize>>,
}

impl Example {
    /// Builds the example for `input` by sorting it and masking the input positions of `y`.
    #[must_use]
    pub fn from_input(input: &[usize]) -> Self {
        let length = input.len();
        let mut solution = input.to_vec();
        solution.sort_unstable();

        let cat: Vec<usize> = input.iter().chain(&solution).copied().collect();
        let x = cat[..cat.len().saturating_sub(1)].to_vec();
        let y = cat
            .iter()
            .skip(1)
            .enumerate()
            .map(|(i, &d)| (i + 1 >= length).then_some(d))
            .collect();
        Example { x, y }
    }

    /// Number of positions (`2 * length - 1`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// A batch of examples, row-aligned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    pub x: Vec<Vec<usize>>,
    pub y: Vec<Vec<Option<usize>>>,
}

impl Batch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

impl FromIterator<Example> for Batch {
    fn from_iter<I: IntoIterator<Item = Example>>(iter: I) -> Self {
        let (x, y) = iter.into_iter().map(|e| (e.x, e.y)).unzip();
        Batch { x, y }
    }
}
