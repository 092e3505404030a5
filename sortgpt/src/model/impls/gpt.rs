//! The assembled decoder-only transformer.

use rand::Rng;

use super::layers::{normal, Block, CausalSelfAttention, LayerNorm, Linear, Mlp};
use crate::autograd::Tensor;
use crate::config::GptConfig;
use crate::model::{ForwardMode, ModelError, Param};

/// Std of every weight matrix except the residual output projections.
pub(super) const INIT_STD: f64 = 0.02;

/// A minGPT-style language model over a small integer vocabulary.
///
/// Token and learned position embeddings, `n_layer` pre-norm [blocks](Block), a final
/// LayerNorm, and a bias-free `lm_head`. Residual output projections are initialised with
/// a smaller std, `0.02 / sqrt(2 * n_layer)`.
pub struct Gpt {
    config: GptConfig,
    vocab_size: usize,
    block_size: usize,
    wte: Tensor,
    wpe: Tensor,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    lm_head: Linear,
}

impl Gpt {
    /// Builds and initialises the model.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidConfig`] for zero sizes or `n_embd % n_head != 0`.
    pub fn new<R: Rng>(
        config: &GptConfig,
        vocab_size: usize,
        block_size: usize,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if vocab_size == 0 || block_size == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "vocab_size ({vocab_size}) and block_size ({block_size}) must be positive"
            )));
        }
        if config.n_layer == 0 || config.n_head == 0 || config.n_embd % config.n_head != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "n_layer ({}) and n_head ({}) must be positive and divide n_embd ({})",
                config.n_layer, config.n_head, config.n_embd
            )));
        }

        let e = config.n_embd;
        let proj_std = INIT_STD / ((2 * config.n_layer) as f64).sqrt();
        let wte = normal([vocab_size, e], INIT_STD, rng);
        let wpe = normal([block_size, e], INIT_STD, rng);
        let blocks = (0..config.n_layer)
            .map(|_| {
                Block::new(
                    LayerNorm::new(e),
                    CausalSelfAttention::new(
                        e,
                        config.n_head,
                        config.attn_pdrop,
                        config.resid_pdrop,
                        proj_std,
                        rng,
                    ),
                    LayerNorm::new(e),
                    Mlp::new(e, config.resid_pdrop, proj_std, rng),
                )
            })
            .collect();
        let lm_head = Linear::new(e, vocab_size, INIT_STD, false, rng);

        Ok(Gpt {
            config: config.clone(),
            vocab_size,
            block_size,
            wte,
            wpe,
            blocks,
            ln_f: LayerNorm::new(e),
            lm_head,
        })
    }

    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Longest sequence the model accepts.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// All trainable tensors, named `transformer.h.{i}.attn.c_attn.weight` and so on.
    #[must_use]
    pub fn params(&self) -> Vec<Param> {
        let mut out = vec![
            Param::new("transformer.wte.weight", &self.wte, false),
            Param::new("transformer.wpe.weight", &self.wpe, false),
        ];
        for (i, block) in self.blocks.iter().enumerate() {
            block.params(&format!("transformer.h.{i}"), &mut out);
        }
        self.ln_f.params("transformer.ln_f", &mut out);
        self.lm_head.params("lm_head", &mut out);
        out
    }

    #[must_use]
    pub fn num_params(&self) -> usize {
        self.params().iter().map(|p| p.tensor.len()).sum()
    }

    /// Zeroes the gradient of every parameter.
    pub fn zero_grad(&self) {
        for p in self.params() {
            p.tensor.zero_grad();
        }
    }

    /// Runs the model on a `[B, T]` batch of token ids.
    ///
    /// Returns logits of shape `[B * T, vocab_size]` (row `b * T + t` predicts the token after
    /// position `t` of sequence `b`) and, when `targets` are given, the mean cross entropy over
    /// the targets that are `Some`.
    ///
    /// # Errors
    ///
    /// See [`ModelError`]; all shape and id checks run before any computation.
    pub fn forward(
        &self,
        idx: &[Vec<usize>],
        targets: Option<&[Vec<Option<usize>>]>,
        mode: ForwardMode<'_>,
    ) -> Result<(Tensor, Option<Tensor>), ModelError> {
        let t = self.check_input(idx)?;
        if let Some(targets) = targets {
            self.check_targets(targets, idx.len(), t)?;
        }
        let logits = self.logits(idx, t, mode);
        let loss = targets.map(|targets| cross_entropy(&logits, targets));
        Ok((logits, loss))
    }

    /// Like [`Gpt::forward`] with targets, returning only the loss.
    pub fn loss(
        &self,
        idx: &[Vec<usize>],
        targets: &[Vec<Option<usize>>],
        mode: ForwardMode<'_>,
    ) -> Result<Tensor, ModelError> {
        let t = self.check_input(idx)?;
        self.check_targets(targets, idx.len(), t)?;
        Ok(cross_entropy(&self.logits(idx, t, mode), targets))
    }

    fn logits(&self, idx: &[Vec<usize>], t: usize, mut mode: ForwardMode<'_>) -> Tensor {
        let b = idx.len();
        let tokens: Vec<usize> = idx.iter().flatten().copied().collect();
        let positions: Vec<usize> = (0..b).flat_map(|_| 0..t).collect();
        let emb = self.wte.gather_rows(&tokens).add(&self.wpe.gather_rows(&positions));
        let mut x = mode.dropout(&emb, self.config.embd_pdrop);
        for block in &self.blocks {
            x = block.forward(&x, b, t, &mut mode);
        }
        self.lm_head.forward(&self.ln_f.forward(&x))
    }

    /// Checks `idx` and returns its sequence length.
    fn check_input(&self, idx: &[Vec<usize>]) -> Result<usize, ModelError> {
        let first = idx.first().ok_or(ModelError::EmptyBatch)?;
        let t = first.len();
        if t == 0 {
            return Err(ModelError::EmptySequence);
        }
        if t > self.block_size {
            return Err(ModelError::SequenceTooLong {
                len: t,
                block_size: self.block_size,
            });
        }
        for (row, seq) in idx.iter().enumerate() {
            if seq.len() != t {
                return Err(ModelError::RaggedBatch {
                    row,
                    expected: t,
                    got: seq.len(),
                });
            }
            if let Some(&token) = seq.iter().find(|&&tok| tok >= self.vocab_size) {
                return Err(ModelError::TokenOutOfVocab {
                    token,
                    vocab_size: self.vocab_size,
                });
            }
        }
        Ok(t)
    }

    fn check_targets(
        &self,
        targets: &[Vec<Option<usize>>],
        b: usize,
        t: usize,
    ) -> Result<(), ModelError> {
        if targets.len() != b || targets.iter().any(|row| row.len() != t) {
            return Err(ModelError::TargetShape { expected: [b, t] });
        }
        match targets.iter().flatten().flatten().find(|&&y| y >= self.vocab_size) {
            Some(&target) => Err(ModelError::TargetOutOfVocab {
                target,
                vocab_size: self.vocab_size,
            }),
            None => Ok(()),
        }
    }
}

fn cross_entropy(logits: &Tensor, targets: &[Vec<Option<usize>>]) -> Tensor {
    let flat: Vec<Option<usize>> = targets.iter().flatten().copied().collect();
    logits.cross_entropy(&flat)
}
