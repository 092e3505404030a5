//! Autoregressive generation.

use rand::rngs::StdRng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;

use crate::model::{ForwardMode, Gpt, ModelError};

/// How [`generate`] picks each next token.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOptions {
    pub max_new_tokens: usize,
    /// Logits are divided by this before sampling. Must be positive.
    pub temperature: f64,
    /// Sample from the distribution instead of taking the most likely token.
    pub do_sample: bool,
    /// Keep only the `k` largest logits.
    pub top_k: Option<usize>,
}

impl GenerateOptions {
    /// Greedy decoding of `max_new_tokens` tokens at temperature 1.
    #[must_use]
    pub fn new(max_new_tokens: usize) -> Self {
        GenerateOptions {
            max_new_tokens,
            temperature: 1.0,
            do_sample: false,
            top_k: None,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.temperature.is_nan() || self.temperature <= 0.0 {
            return Err(ModelError::InvalidSampling(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if self.top_k == Some(0) {
            return Err(ModelError::InvalidSampling(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Extends every sequence in `idx` by `max_new_tokens` tokens, feeding predictions back in.
///
/// The context is cropped to the model's block size before each forward pass, so sequences
/// may grow past it. `rng` is only drawn from when `do_sample` is set.
pub fn generate(
    model: &Gpt,
    idx: &[Vec<usize>],
    options: &GenerateOptions,
    rng: &mut StdRng,
) -> Result<Vec<Vec<usize>>, ModelError> {
    options.validate()?;
    let mut seqs = idx.to_vec();
    let block_size = model.block_size();

    for _ in 0..options.max_new_tokens {
        let context: Vec<Vec<usize>> = seqs
            .iter()
            .map(|s| s[s.len().saturating_sub(block_size)..].to_vec())
            .collect();
        let t = context.first().map_or(0, Vec::len);
        let (logits, _) = model.forward(&context, None, ForwardMode::Eval)?;

        for (b, seq) in seqs.iter_mut().enumerate() {
            let mut last: Vec<f64> = logits
                .row(b * t + t - 1)
                .iter()
                .map(|l| l / options.temperature)
                .collect();
            if let Some(k) = options.top_k {
                keep_top_k(&mut last, k);
            }
            let next = if options.do_sample {
                sample(&last, rng)?
            } else {
                argmax(&last)
            };
            seq.push(next);
        }
    }
    Ok(seqs)
}

/// Sets every logit below the `k`-th largest to `-inf`. Ties with the `k`-th survive.
fn keep_top_k(logits: &mut [f64], k: usize) {
    if k >= logits.len() {
        return;
    }
    let mut sorted = logits.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let threshold = sorted[k - 1];
    for l in logits.iter_mut() {
        if *l < threshold {
            *l = f64::NEG_INFINITY;
        }
    }
}

/// Index of the largest logit; the lowest index wins ties.
fn argmax(logits: &[f64]) -> usize {
    let mut best = 0;
    for (i, &l) in logits.iter().enumerate() {
        if l > logits[best] {
            best = i;
        }
    }
    best
}

fn sample(logits: &[f64], rng: &mut StdRng) -> Result<usize, ModelError> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let dist = WeightedIndex::new(&weights)
        .map_err(|e| ModelError::InvalidSampling(e.to_string()))?;
    Ok(dist.sample(rng))
}
