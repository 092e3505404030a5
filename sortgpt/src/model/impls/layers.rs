//! Layers of a pre-norm decoder block. Each layer owns its parameter tensors and lists them
//! with a dotted name prefix for the optimizer.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::autograd::Tensor;
use crate::model::{ForwardMode, Param};

const LAYER_NORM_EPS: f64 = 1e-5;

/// `[rows, cols]` leaf with entries from N(0, std²).
pub(super) fn normal<R: Rng>(shape: [usize; 2], std: f64, rng: &mut R) -> Tensor {
    let data = (0..shape[0] * shape[1])
        .map(|_| std * rng.sample::<f64, _>(StandardNormal))
        .collect();
    Tensor::new(data, shape)
}

/// `y = x Wᵀ + b` with `W: [out, in]`.
pub(super) struct Linear {
    weight: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    pub(super) fn new<R: Rng>(
        n_in: usize,
        n_out: usize,
        std: f64,
        bias: bool,
        rng: &mut R,
    ) -> Self {
        Linear {
            weight: normal([n_out, n_in], std, rng),
            bias: bias.then(|| Tensor::zeros([1, n_out])),
        }
    }

    pub(super) fn forward(&self, x: &Tensor) -> Tensor {
        let y = x.matmul_t(&self.weight);
        match &self.bias {
            Some(b) => y.add(b),
            None => y,
        }
    }

    pub(super) fn params(&self, prefix: &str, out: &mut Vec<Param>) {
        out.push(Param::new(format!("{prefix}.weight"), &self.weight, true));
        if let Some(b) = &self.bias {
            out.push(Param::new(format!("{prefix}.bias"), b, false));
        }
    }
}

/// Row-wise layer normalisation with learned gain and bias.
pub(super) struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
}

impl LayerNorm {
    pub(super) fn new(n: usize) -> Self {
        LayerNorm {
            weight: Tensor::full([1, n], 1.0),
            bias: Tensor::zeros([1, n]),
        }
    }

    pub(super) fn forward(&self, x: &Tensor) -> Tensor {
        x.normalize(LAYER_NORM_EPS).mul(&self.weight).add(&self.bias)
    }

    pub(super) fn params(&self, prefix: &str, out: &mut Vec<Param>) {
        out.push(Param::new(format!("{prefix}.weight"), &self.weight, false));
        out.push(Param::new(format!("{prefix}.bias"), &self.bias, false));
    }
}

/// Multi-head masked self-attention with a fused QKV projection.
pub(super) struct CausalSelfAttention {
    c_attn: Linear,
    c_proj: Linear,
    n_head: usize,
    n_embd: usize,
    attn_pdrop: f64,
    resid_pdrop: f64,
}

impl CausalSelfAttention {
    pub(super) fn new<R: Rng>(
        n_embd: usize,
        n_head: usize,
        attn_pdrop: f64,
        resid_pdrop: f64,
        proj_std: f64,
        rng: &mut R,
    ) -> Self {
        CausalSelfAttention {
            c_attn: Linear::new(n_embd, 3 * n_embd, super::gpt::INIT_STD, true, rng),
            c_proj: Linear::new(n_embd, n_embd, proj_std, true, rng),
            n_head,
            n_embd,
            attn_pdrop,
            resid_pdrop,
        }
    }

    /// `x` is `[b * t, n_embd]`, `b` sequences of `t` rows stacked.
    pub(super) fn forward(
        &self,
        x: &Tensor,
        b: usize,
        t: usize,
        mode: &mut ForwardMode<'_>,
    ) -> Tensor {
        let e = self.n_embd;
        let hd = e / self.n_head;
        let scale = 1.0 / (hd as f64).sqrt();
        let qkv = self.c_attn.forward(x);

        let seqs: Vec<Tensor> = (0..b)
            .map(|s| {
                let rows = qkv.slice_rows(s * t, (s + 1) * t);
                let heads: Vec<Tensor> = (0..self.n_head)
                    .map(|h| {
                        let q = rows.slice_cols(h * hd, (h + 1) * hd);
                        let k = rows.slice_cols(e + h * hd, e + (h + 1) * hd);
                        let v = rows.slice_cols(2 * e + h * hd, 2 * e + (h + 1) * hd);
                        let att = q.matmul(&k.transpose()).scale(scale).causal_softmax();
                        mode.dropout(&att, self.attn_pdrop).matmul(&v)
                    })
                    .collect();
                Tensor::hcat(&heads)
            })
            .collect();

        let y = self.c_proj.forward(&Tensor::vcat(&seqs));
        mode.dropout(&y, self.resid_pdrop)
    }

    pub(super) fn params(&self, prefix: &str, out: &mut Vec<Param>) {
        self.c_attn.params(&format!("{prefix}.c_attn"), out);
        self.c_proj.params(&format!("{prefix}.c_proj"), out);
    }
}

/// Position-wise feed-forward: `4 * n_embd` hidden units with GELU.
pub(super) struct Mlp {
    c_fc: Linear,
    c_proj: Linear,
    resid_pdrop: f64,
}

impl Mlp {
    pub(super) fn new<R: Rng>(n_embd: usize, resid_pdrop: f64, proj_std: f64, rng: &mut R) -> Self {
        Mlp {
            c_fc: Linear::new(n_embd, 4 * n_embd, super::gpt::INIT_STD, true, rng),
            c_proj: Linear::new(4 * n_embd, n_embd, proj_std, true, rng),
            resid_pdrop,
        }
    }

    pub(super) fn forward(&self, x: &Tensor, mode: &mut ForwardMode<'_>) -> Tensor {
        let y = self.c_proj.forward(&self.c_fc.forward(x).gelu());
        mode.dropout(&y, self.resid_pdrop)
    }

    pub(super) fn params(&self, prefix: &str, out: &mut Vec<Param>) {
        self.c_fc.params(&format!("{prefix}.c_fc"), out);
        self.c_proj.params(&format!("{prefix}.c_proj"), out);
    }
}

/// `x + attn(ln_1(x))`, then `x + mlp(ln_2(x))`.
pub(super) struct Block {
    ln_1: LayerNorm,
    attn: CausalSelfAttention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    pub(super) fn new(
        ln_1: LayerNorm,
        attn: CausalSelfAttention,
        ln_2: LayerNorm,
        mlp: Mlp,
    ) -> Self {
        Block {
            ln_1,
            attn,
            ln_2,
            mlp,
        }
    }

    pub(super) fn forward(
        &self,
        x: &Tensor,
        b: usize,
        t: usize,
        mode: &mut ForwardMode<'_>,
    ) -> Tensor {
        let x = x.add(&self.attn.forward(&self.ln_1.forward(x), b, t, mode));
        x.add(&self.mlp.forward(&self.ln_2.forward(&x), mode))
    }

    pub(super) fn params(&self, prefix: &str, out: &mut Vec<Param>) {
        self.ln_1.params(&format!("{prefix}.ln_1"), out);
        self.attn.params(&format!("{prefix}.attn"), out);
        self.ln_2.params(&format!("{prefix}.ln_2"), out);
        self.mlp.params(&format!("{prefix}.mlp"), out);
    }
}
