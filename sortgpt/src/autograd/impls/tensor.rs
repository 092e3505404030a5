//! Tensor autograd: dense row-major 2-D matrices with reverse-mode differentiation.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use rand::Rng;

/// Accumulates the node's output gradient into its parents.
type BackwardFn = Box<dyn Fn(&[f64])>;

/// Internal tensor node: forward values, gradient, and graph edges for backprop.
struct Node {
    /// Forward pass values, row-major.
    data: Vec<f64>,
    /// Gradient of the loss with respect to `data`; filled in backward.
    grad: Vec<f64>,
    /// `[rows, cols]`.
    shape: [usize; 2],
    /// Inputs of the op that produced this node (empty for leaves).
    parents: Vec<Tensor>,
    /// Chain rule for this op; `None` for leaves.
    backward: Option<BackwardFn>,
}

/// Handle to a 2-D tensor in the autograd computation graph.
///
/// Cloning is cheap (it clones the `Rc`). Every op returns a new tensor that
/// remembers its inputs; [`Tensor::backward`] on a 1x1 loss walks the graph in
/// reverse topological order and accumulates gradients into every tensor that
/// contributed, parameters included.
#[derive(Clone)]
pub struct Tensor(Rc<RefCell<Node>>);

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0.borrow();
        f.debug_struct("Tensor")
            .field("shape", &node.shape)
            .field("data", &node.data)
            .finish()
    }
}

impl Tensor {
    // ---- constructors -------------------------------------------------------

    /// Creates a leaf tensor with zero gradient.
    ///
    /// # Panics
    ///
    /// If `data.len() != shape[0] * shape[1]`.
    #[must_use]
    pub fn new(data: Vec<f64>, shape: [usize; 2]) -> Self {
        assert_eq!(
            data.len(),
            shape[0] * shape[1],
            "tensor: data length does not match shape {shape:?}"
        );
        Tensor(Rc::new(RefCell::new(Node {
            grad: vec![0.0; data.len()],
            data,
            shape,
            parents: Vec::new(),
            backward: None,
        })))
    }

    /// Leaf tensor filled with `value`.
    #[must_use]
    pub fn full(shape: [usize; 2], value: f64) -> Self {
        Self::new(vec![value; shape[0] * shape[1]], shape)
    }

    #[must_use]
    pub fn zeros(shape: [usize; 2]) -> Self {
        Self::full(shape, 0.0)
    }

    /// 1x1 leaf tensor.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self::new(vec![value], [1, 1])
    }

    /// Creates an op output that remembers `parents` and the chain rule `backward`.
    fn from_op(
        data: Vec<f64>,
        shape: [usize; 2],
        parents: Vec<Tensor>,
        backward: impl Fn(&[f64]) + 'static,
    ) -> Self {
        let out = Self::new(data, shape);
        {
            let mut node = out.0.borrow_mut();
            node.parents = parents;
            node.backward = Some(Box::new(backward));
        }
        out
    }

    // ---- accessors ----------------------------------------------------------

    #[must_use]
    pub fn shape(&self) -> [usize; 2] {
        self.0.borrow().shape
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.shape()[0]
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.shape()[1]
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forward values (copied out of the node).
    #[must_use]
    pub fn data(&self) -> Vec<f64> {
        self.0.borrow().data.clone()
    }

    /// Accumulated gradient (copied out of the node).
    #[must_use]
    pub fn grad(&self) -> Vec<f64> {
        self.0.borrow().grad.clone()
    }

    /// Value of a 1x1 tensor.
    ///
    /// # Panics
    ///
    /// If the tensor is not 1x1.
    #[must_use]
    pub fn item(&self) -> f64 {
        assert_eq!(self.len(), 1, "item() on a non-scalar tensor");
        self.0.borrow().data[0]
    }

    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let node = self.0.borrow();
        node.data[r * node.shape[1] + c]
    }

    /// Copy of row `r`.
    #[must_use]
    pub fn row(&self, r: usize) -> Vec<f64> {
        let node = self.0.borrow();
        let n = node.shape[1];
        node.data[r * n..(r + 1) * n].to_vec()
    }

    /// Replaces the forward values in place (shape unchanged).
    ///
    /// # Panics
    ///
    /// If the length differs from the current length.
    pub fn set_data(&self, data: Vec<f64>) {
        let mut node = self.0.borrow_mut();
        assert_eq!(node.data.len(), data.len(), "set_data: length mismatch");
        node.data = data;
    }

    pub fn zero_grad(&self) {
        self.0.borrow_mut().grad.iter_mut().for_each(|g| *g = 0.0);
    }

    /// Adds `g` element-wise to this tensor's gradient.
    fn add_grad(&self, g: &[f64]) {
        let mut node = self.0.borrow_mut();
        for (acc, &d) in node.grad.iter_mut().zip(g) {
            *acc += d;
        }
    }

    /// Gives mutable access to data and gradient together (optimizer updates).
    pub(crate) fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut [f64], &mut [f64]),
    {
        let mut node = self.0.borrow_mut();
        let Node { data, grad, .. } = &mut *node;
        f(data, grad);
    }

    // ---- backward -----------------------------------------------------------

    /// Runs backprop from this 1x1 tensor (the loss) to every tensor it depends on.
    ///
    /// Gradients of leaves accumulate across calls until [`Tensor::zero_grad`].
    /// Call at most once per graph.
    ///
    /// # Panics
    ///
    /// If the tensor is not 1x1.
    pub fn backward(&self) {
        assert_eq!(self.len(), 1, "backward() requires a scalar (1x1) tensor");

        fn build_topo(
            t: &Tensor,
            visited: &mut HashSet<*const RefCell<Node>>,
            topo: &mut Vec<Tensor>,
        ) {
            if !visited.insert(Rc::as_ptr(&t.0)) {
                return;
            }
            for parent in &t.0.borrow().parents {
                build_topo(parent, visited, topo);
            }
            topo.push(t.clone());
        }

        let mut topo = Vec::new();
        let mut visited = HashSet::new();
        build_topo(self, &mut visited, &mut topo);

        self.0.borrow_mut().grad[0] = 1.0;
        for t in topo.iter().rev() {
            let node = t.0.borrow();
            if let Some(f) = node.backward.as_ref() {
                f(&node.grad);
            }
        }
    }

    // ---- linear algebra -----------------------------------------------------

    /// Matrix product: `[m, k] x [k, n] -> [m, n]`.
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        let [m, k] = self.shape();
        let [k2, n] = other.shape();
        assert_eq!(k, k2, "matmul shape mismatch: [{m},{k}] x [{k2},{n}]");

        let a = self.data();
        let b = other.data();
        let mut c = vec![0.0; m * n];
        for i in 0..m {
            for l in 0..k {
                let av = a[i * k + l];
                if av == 0.0 {
                    continue;
                }
                let b_row = &b[l * n..(l + 1) * n];
                let c_row = &mut c[i * n..(i + 1) * n];
                for (cv, &bv) in c_row.iter_mut().zip(b_row) {
                    *cv += av * bv;
                }
            }
        }

        let (lhs, rhs) = (self.clone(), other.clone());
        Tensor::from_op(c, [m, n], vec![self.clone(), other.clone()], move |g| {
            // dA = G @ B^T
            let mut da = vec![0.0; m * k];
            for i in 0..m {
                for l in 0..k {
                    da[i * k + l] = (0..n).map(|j| g[i * n + j] * b[l * n + j]).sum();
                }
            }
            lhs.add_grad(&da);

            // dB = A^T @ G
            let mut db = vec![0.0; k * n];
            for i in 0..m {
                for l in 0..k {
                    let av = a[i * k + l];
                    for j in 0..n {
                        db[l * n + j] += av * g[i * n + j];
                    }
                }
            }
            rhs.add_grad(&db);
        })
    }

    /// Product with a transposed weight: `[m, k] x [n, k]^T -> [m, n]`.
    ///
    /// Linear layers store weights as `[out, in]`, so `x.matmul_t(w)` is `x @ w.T`.
    #[must_use]
    pub fn matmul_t(&self, w: &Tensor) -> Tensor {
        let [m, k] = self.shape();
        let [n, k2] = w.shape();
        assert_eq!(k, k2, "matmul_t shape mismatch: [{m},{k}] x [{n},{k2}]^T");

        let x = self.data();
        let wd = w.data();
        let mut c = vec![0.0; m * n];
        for i in 0..m {
            let x_row = &x[i * k..(i + 1) * k];
            for j in 0..n {
                let w_row = &wd[j * k..(j + 1) * k];
                c[i * n + j] = x_row.iter().zip(w_row).map(|(a, b)| a * b).sum();
            }
        }

        let (lhs, rhs) = (self.clone(), w.clone());
        Tensor::from_op(c, [m, n], vec![self.clone(), w.clone()], move |g| {
            // dX = G @ W
            let mut dx = vec![0.0; m * k];
            // dW = G^T @ X
            let mut dw = vec![0.0; n * k];
            for i in 0..m {
                for j in 0..n {
                    let gv = g[i * n + j];
                    if gv == 0.0 {
                        continue;
                    }
                    for l in 0..k {
                        dx[i * k + l] += gv * wd[j * k + l];
                        dw[j * k + l] += gv * x[i * k + l];
                    }
                }
            }
            lhs.add_grad(&dx);
            rhs.add_grad(&dw);
        })
    }

    #[must_use]
    pub fn transpose(&self) -> Tensor {
        let [m, n] = self.shape();
        let a = self.data();
        let mut out = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                out[j * m + i] = a[i * n + j];
            }
        }
        let src = self.clone();
        Tensor::from_op(out, [n, m], vec![self.clone()], move |g| {
            let mut da = vec![0.0; m * n];
            for i in 0..m {
                for j in 0..n {
                    da[i * n + j] = g[j * m + i];
                }
            }
            src.add_grad(&da);
        })
    }

    // ---- element-wise -------------------------------------------------------

    /// Element-wise sum. `other` is either the same shape or a `[1, n]` row broadcast over rows.
    #[must_use]
    pub fn add(&self, other: &Tensor) -> Tensor {
        let [m, n] = self.shape();
        let broadcast = broadcast_kind(self.shape(), other.shape(), "add");
        let a = self.data();
        let b = other.data();
        let out: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(idx, &av)| av + b[if broadcast { idx % n } else { idx }])
            .collect();

        let (lhs, rhs) = (self.clone(), other.clone());
        Tensor::from_op(out, [m, n], vec![self.clone(), other.clone()], move |g| {
            lhs.add_grad(g);
            if broadcast {
                rhs.add_grad(&sum_rows(g, m, n));
            } else {
                rhs.add_grad(g);
            }
        })
    }

    /// Element-wise product. `other` is either the same shape or a `[1, n]` row broadcast over rows.
    #[must_use]
    pub fn mul(&self, other: &Tensor) -> Tensor {
        let [m, n] = self.shape();
        let broadcast = broadcast_kind(self.shape(), other.shape(), "mul");
        let a = self.data();
        let b = other.data();
        let pick = move |idx: usize| if broadcast { idx % n } else { idx };
        let out: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(idx, &av)| av * b[pick(idx)])
            .collect();

        let (lhs, rhs) = (self.clone(), other.clone());
        Tensor::from_op(out, [m, n], vec![self.clone(), other.clone()], move |g| {
            let da: Vec<f64> = g
                .iter()
                .enumerate()
                .map(|(idx, &gv)| gv * b[pick(idx)])
                .collect();
            lhs.add_grad(&da);
            let db: Vec<f64> = g.iter().zip(&a).map(|(&gv, &av)| gv * av).collect();
            if broadcast {
                rhs.add_grad(&sum_rows(&db, m, n));
            } else {
                rhs.add_grad(&db);
            }
        })
    }

    /// Multiplies every element by `s`.
    #[must_use]
    pub fn scale(&self, s: f64) -> Tensor {
        let out: Vec<f64> = self.data().iter().map(|&x| x * s).collect();
        let src = self.clone();
        Tensor::from_op(out, self.shape(), vec![self.clone()], move |g| {
            let da: Vec<f64> = g.iter().map(|&gv| gv * s).collect();
            src.add_grad(&da);
        })
    }

    /// GELU, tanh approximation.
    #[must_use]
    pub fn gelu(&self) -> Tensor {
        const C: f64 = 0.797_884_560_802_865_4; // sqrt(2 / pi)
        const K: f64 = 0.044_715;
        let x = self.data();
        let tanhs: Vec<f64> = x.iter().map(|&v| (C * (v + K * v * v * v)).tanh()).collect();
        let out: Vec<f64> = x
            .iter()
            .zip(&tanhs)
            .map(|(&v, &t)| 0.5 * v * (1.0 + t))
            .collect();

        let src = self.clone();
        Tensor::from_op(out, self.shape(), vec![self.clone()], move |g| {
            let da: Vec<f64> = g
                .iter()
                .zip(x.iter().zip(&tanhs))
                .map(|(&gv, (&v, &t))| {
                    let du = C * (1.0 + 3.0 * K * v * v);
                    gv * (0.5 * (1.0 + t) + 0.5 * v * (1.0 - t * t) * du)
                })
                .collect();
            src.add_grad(&da);
        })
    }

    /// Inverted dropout: zeroes each element with probability `p` and scales survivors by `1 / (1 - p)`.
    ///
    /// Returns `self` unchanged when `p == 0`.
    #[must_use]
    pub fn dropout<R: Rng>(&self, p: f64, rng: &mut R) -> Tensor {
        if p <= 0.0 {
            return self.clone();
        }
        let keep = 1.0 / (1.0 - p);
        let mask: Vec<f64> = (0..self.len())
            .map(|_| if rng.random::<f64>() < p { 0.0 } else { keep })
            .collect();
        let out: Vec<f64> = self.data().iter().zip(&mask).map(|(x, m)| x * m).collect();

        let src = self.clone();
        Tensor::from_op(out, self.shape(), vec![self.clone()], move |g| {
            let da: Vec<f64> = g.iter().zip(&mask).map(|(gv, m)| gv * m).collect();
            src.add_grad(&da);
        })
    }

    // ---- row-wise -----------------------------------------------------------

    /// Normalizes each row to zero mean and unit variance (LayerNorm without affine).
    #[must_use]
    pub fn normalize(&self, eps: f64) -> Tensor {
        let [m, n] = self.shape();
        let x = self.data();
        let mut xhat = vec![0.0; m * n];
        let mut rstd = vec![0.0; m];
        for i in 0..m {
            let row = &x[i * n..(i + 1) * n];
            let mean = row.iter().sum::<f64>() / n as f64;
            let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
            rstd[i] = 1.0 / (var + eps).sqrt();
            for j in 0..n {
                xhat[i * n + j] = (row[j] - mean) * rstd[i];
            }
        }

        let src = self.clone();
        let y = xhat.clone();
        Tensor::from_op(xhat, [m, n], vec![self.clone()], move |g| {
            let mut da = vec![0.0; m * n];
            for i in 0..m {
                let g_row = &g[i * n..(i + 1) * n];
                let y_row = &y[i * n..(i + 1) * n];
                let g_mean = g_row.iter().sum::<f64>() / n as f64;
                let gy_mean = g_row.iter().zip(y_row).map(|(a, b)| a * b).sum::<f64>() / n as f64;
                for j in 0..n {
                    da[i * n + j] = rstd[i] * (g_row[j] - g_mean - y_row[j] * gy_mean);
                }
            }
            src.add_grad(&da);
        })
    }

    /// Row-wise softmax where row `i` only sees columns `0..=i`; masked entries are 0.
    #[must_use]
    pub fn causal_softmax(&self) -> Tensor {
        let [m, n] = self.shape();
        let x = self.data();
        let mut p = vec![0.0; m * n];
        for i in 0..m {
            let visible = (i + 1).min(n);
            let row = &x[i * n..i * n + visible];
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for j in 0..visible {
                let e = (row[j] - max).exp();
                p[i * n + j] = e;
                sum += e;
            }
            for j in 0..visible {
                p[i * n + j] /= sum;
            }
        }

        let src = self.clone();
        let probs = p.clone();
        Tensor::from_op(p, [m, n], vec![self.clone()], move |g| {
            // dx_j = p_j * (g_j - sum_k g_k p_k)
            let mut da = vec![0.0; m * n];
            for i in 0..m {
                let g_row = &g[i * n..(i + 1) * n];
                let p_row = &probs[i * n..(i + 1) * n];
                let dot: f64 = g_row.iter().zip(p_row).map(|(a, b)| a * b).sum();
                for j in 0..n {
                    da[i * n + j] = p_row[j] * (g_row[j] - dot);
                }
            }
            src.add_grad(&da);
        })
    }

    // ---- reshaping ----------------------------------------------------------

    /// Rows `[start, end)`.
    #[must_use]
    pub fn slice_rows(&self, start: usize, end: usize) -> Tensor {
        let [m, n] = self.shape();
        assert!(start <= end && end <= m, "slice_rows {start}..{end} out of {m} rows");
        let out = self.0.borrow().data[start * n..end * n].to_vec();
        let src = self.clone();
        Tensor::from_op(out, [end - start, n], vec![self.clone()], move |g| {
            let mut da = vec![0.0; m * n];
            da[start * n..end * n].copy_from_slice(g);
            src.add_grad(&da);
        })
    }

    /// Columns `[start, end)`.
    #[must_use]
    pub fn slice_cols(&self, start: usize, end: usize) -> Tensor {
        let [m, n] = self.shape();
        assert!(start <= end && end <= n, "slice_cols {start}..{end} out of {n} cols");
        let w = end - start;
        let a = self.data();
        let out: Vec<f64> = (0..m)
            .flat_map(|i| a[i * n + start..i * n + end].to_vec())
            .collect();
        let src = self.clone();
        Tensor::from_op(out, [m, w], vec![self.clone()], move |g| {
            let mut da = vec![0.0; m * n];
            for i in 0..m {
                da[i * n + start..i * n + end].copy_from_slice(&g[i * w..(i + 1) * w]);
            }
            src.add_grad(&da);
        })
    }

    /// Stacks tensors with equal column counts on top of each other.
    ///
    /// # Panics
    ///
    /// If `parts` is empty or the column counts differ.
    #[must_use]
    pub fn vcat(parts: &[Tensor]) -> Tensor {
        assert!(!parts.is_empty(), "vcat: empty slice");
        let n = parts[0].cols();
        assert!(parts.iter().all(|t| t.cols() == n), "vcat: column mismatch");
        let m: usize = parts.iter().map(Tensor::rows).sum();
        let out: Vec<f64> = parts.iter().flat_map(Tensor::data).collect();

        let srcs = parts.to_vec();
        Tensor::from_op(out, [m, n], parts.to_vec(), move |g| {
            let mut offset = 0;
            for t in &srcs {
                let len = t.len();
                t.add_grad(&g[offset..offset + len]);
                offset += len;
            }
        })
    }

    /// Places tensors with equal row counts side by side.
    ///
    /// # Panics
    ///
    /// If `parts` is empty or the row counts differ.
    #[must_use]
    pub fn hcat(parts: &[Tensor]) -> Tensor {
        assert!(!parts.is_empty(), "hcat: empty slice");
        let m = parts[0].rows();
        assert!(parts.iter().all(|t| t.rows() == m), "hcat: row mismatch");
        let widths: Vec<usize> = parts.iter().map(Tensor::cols).collect();
        let n: usize = widths.iter().sum();
        let datas: Vec<Vec<f64>> = parts.iter().map(Tensor::data).collect();
        let mut out = Vec::with_capacity(m * n);
        for i in 0..m {
            for (d, &w) in datas.iter().zip(&widths) {
                out.extend_from_slice(&d[i * w..(i + 1) * w]);
            }
        }

        let srcs = parts.to_vec();
        Tensor::from_op(out, [m, n], parts.to_vec(), move |g| {
            let mut col = 0;
            for (t, &w) in srcs.iter().zip(&widths) {
                let mut dt = Vec::with_capacity(m * w);
                for i in 0..m {
                    dt.extend_from_slice(&g[i * n + col..i * n + col + w]);
                }
                t.add_grad(&dt);
                col += w;
            }
        })
    }

    /// Embedding lookup: output row `r` is row `ids[r]` of `self`.
    ///
    /// Backward scatter-adds into the selected rows (a row picked twice gets both gradients).
    #[must_use]
    pub fn gather_rows(&self, ids: &[usize]) -> Tensor {
        let [m, n] = self.shape();
        assert!(ids.iter().all(|&id| id < m), "gather_rows: id out of {m} rows");
        let a = self.data();
        let out: Vec<f64> = ids
            .iter()
            .flat_map(|&id| a[id * n..(id + 1) * n].to_vec())
            .collect();

        let src = self.clone();
        let ids = ids.to_vec();
        Tensor::from_op(out, [ids.len(), n], vec![self.clone()], move |g| {
            let mut da = vec![0.0; m * n];
            for (r, &id) in ids.iter().enumerate() {
                for j in 0..n {
                    da[id * n + j] += g[r * n + j];
                }
            }
            src.add_grad(&da);
        })
    }

    // ---- reductions ---------------------------------------------------------

    /// Sum of all elements as a 1x1 tensor.
    #[must_use]
    pub fn sum(&self) -> Tensor {
        let len = self.len();
        let total: f64 = self.0.borrow().data.iter().sum();
        let src = self.clone();
        Tensor::from_op(vec![total], [1, 1], vec![self.clone()], move |g| {
            src.add_grad(&vec![g[0]; len]);
        })
    }

    /// Mean cross entropy of row-wise logits `[m, v]` against `targets` (one per row).
    ///
    /// Rows whose target is `None` are ignored. If every row is ignored the
    /// result is a constant 0.
    ///
    /// # Panics
    ///
    /// If `targets.len() != rows` or a target is `>= v`.
    #[must_use]
    pub fn cross_entropy(&self, targets: &[Option<usize>]) -> Tensor {
        let [m, v] = self.shape();
        assert_eq!(targets.len(), m, "cross_entropy: one target per row");
        let count = targets.iter().flatten().count();
        if count == 0 {
            return Tensor::scalar(0.0);
        }

        let logits = self.data();
        let mut probs = vec![0.0; m * v];
        let mut total = 0.0;
        for (i, target) in targets.iter().enumerate() {
            let Some(t) = *target else { continue };
            assert!(t < v, "cross_entropy: target {t} out of {v} classes");
            let row = &logits[i * v..(i + 1) * v];
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = row.iter().map(|x| (x - max).exp()).sum();
            for j in 0..v {
                probs[i * v + j] = (row[j] - max).exp() / sum;
            }
            total -= (row[t] - max) - sum.ln();
        }
        let inv = 1.0 / count as f64;

        let src = self.clone();
        let targets = targets.to_vec();
        Tensor::from_op(vec![total * inv], [1, 1], vec![self.clone()], move |g| {
            let scale = g[0] * inv;
            let mut da = vec![0.0; m * v];
            for (i, target) in targets.iter().enumerate() {
                let Some(t) = *target else { continue };
                for j in 0..v {
                    let onehot = if j == t { 1.0 } else { 0.0 };
                    da[i * v + j] = scale * (probs[i * v + j] - onehot);
                }
            }
            src.add_grad(&da);
        })
    }
}

/// Returns `true` for a `[1, n]` row broadcast, `false` for identical shapes.
fn broadcast_kind(lhs: [usize; 2], rhs: [usize; 2], op: &str) -> bool {
    if lhs == rhs {
        return false;
    }
    assert!(
        rhs[0] == 1 && rhs[1] == lhs[1],
        "{op} shape mismatch: {lhs:?} with {rhs:?}"
    );
    true
}

/// Column sums of an `[m, n]` buffer.
fn sum_rows(g: &[f64], m: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n];
    for i in 0..m {
        for j in 0..n {
            out[j] += g[i * n + j];
        }
    }
    out
}
