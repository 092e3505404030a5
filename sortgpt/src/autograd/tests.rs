//! Tests for the tensor autograd engine.
//!
//! Forward values are checked on small hand-computed cases; backward passes are
//! checked against central finite differences.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::autograd::Tensor;

const EPS: f64 = 1e-6;
const TOL: f64 = 1e-5;

fn assert_close(a: &[f64], b: &[f64], tol: f64) {
    assert_eq!(a.len(), b.len(), "length mismatch");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() < tol, "index {i}: {x} vs {y}");
    }
}

/// Fixed, non-uniform upstream weights so every output element gets a distinct gradient.
fn upstream(shape: [usize; 2]) -> Tensor {
    let n = shape[0] * shape[1];
    Tensor::new((0..n).map(|i| 0.3 + 0.17 * i as f64).collect(), shape)
}

fn input(shape: [usize; 2]) -> Tensor {
    let n = shape[0] * shape[1];
    Tensor::new(
        (0..n).map(|i| ((i * 7 % 11) as f64 - 5.0) * 0.21).collect(),
        shape,
    )
}

/// Compares the analytic gradient of `sum(f(x) * upstream)` w.r.t. `x` with finite differences.
fn check_grad(x: &Tensor, f: impl Fn(&Tensor) -> Tensor) {
    let out = f(x);
    let w = upstream(out.shape());
    out.mul(&w).sum().backward();
    let analytic = x.grad();

    let base = x.data();
    let mut numeric = vec![0.0; base.len()];
    for i in 0..base.len() {
        let mut plus = base.clone();
        plus[i] += EPS;
        x.set_data(plus);
        let fp = f(x).mul(&w).sum().item();
        let mut minus = base.clone();
        minus[i] -= EPS;
        x.set_data(minus);
        let fm = f(x).mul(&w).sum().item();
        numeric[i] = (fp - fm) / (2.0 * EPS);
    }
    x.set_data(base);
    assert_close(&analytic, &numeric, TOL);
}

#[test]
fn matmul_forward() {
    let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]);
    let b = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], [3, 2]);
    let c = a.matmul(&b);
    assert_eq!(c.shape(), [2, 2]);
    assert_eq!(c.data(), vec![4.0, 5.0, 10.0, 11.0]);
}

#[test]
fn matmul_t_equals_matmul_with_transpose() {
    let x = input([3, 4]);
    let w = input([5, 4]);
    assert_close(
        &x.matmul_t(&w).data(),
        &x.matmul(&w.transpose()).data(),
        1e-12,
    );
}

#[test]
fn matmul_backward_both_sides() {
    let b = input([4, 2]);
    check_grad(&input([3, 4]), |a| a.matmul(&b));
    let a = input([3, 4]);
    check_grad(&input([4, 2]), |b| a.matmul(b));
}

#[test]
fn matmul_t_backward_both_sides() {
    let w = input([5, 4]);
    check_grad(&input([3, 4]), |x| x.matmul_t(&w));
    let x = input([3, 4]);
    check_grad(&input([5, 4]), |w| x.matmul_t(w));
}

#[test]
fn add_and_mul_broadcast_backward() {
    let row = input([1, 4]);
    check_grad(&input([3, 4]), |x| x.add(&row));
    check_grad(&input([3, 4]), |x| x.mul(&row));
    let x = input([3, 4]);
    check_grad(&input([1, 4]), |r| x.add(r));
    check_grad(&input([1, 4]), |r| x.mul(r));
}

#[test]
fn tensor_used_twice_accumulates_gradient() {
    let x = Tensor::new(vec![3.0], [1, 1]);
    let y = x.mul(&x);
    y.backward();
    assert_eq!(x.grad(), vec![6.0]);
}

#[test]
fn gelu_backward() {
    check_grad(&input([2, 5]), Tensor::gelu);
}

#[test]
fn gelu_forward_known_values() {
    let x = Tensor::new(vec![0.0, 10.0, -10.0], [1, 3]);
    let y = x.gelu().data();
    assert!(y[0].abs() < 1e-12);
    assert!((y[1] - 10.0).abs() < 1e-6);
    assert!(y[2].abs() < 1e-6);
}

#[test]
fn normalize_rows_have_zero_mean_unit_variance() {
    let y = input([3, 6]).normalize(1e-5);
    for r in 0..3 {
        let row = y.row(r);
        let mean = row.iter().sum::<f64>() / 6.0;
        let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 6.0;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-3);
    }
}

#[test]
fn normalize_backward() {
    check_grad(&input([3, 6]), |x| x.normalize(1e-5));
}

#[test]
fn causal_softmax_masks_future_columns() {
    let p = input([4, 4]).causal_softmax();
    for i in 0..4 {
        let row = p.row(i);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for (j, &v) in row.iter().enumerate() {
            if j > i {
                assert_eq!(v, 0.0);
            } else {
                assert!(v > 0.0);
            }
        }
    }
    assert_eq!(p.get(0, 0), 1.0);
}

#[test]
fn causal_softmax_backward() {
    check_grad(&input([4, 4]), Tensor::causal_softmax);
}

#[test]
fn reshaping_ops_backward() {
    check_grad(&input([4, 3]), Tensor::transpose);
    check_grad(&input([4, 3]), |x| x.slice_rows(1, 3));
    check_grad(&input([4, 6]), |x| x.slice_cols(2, 5));
    check_grad(&input([2, 3]), |x| {
        Tensor::vcat(&[x.clone(), x.scale(2.0), x.slice_rows(0, 1)])
    });
    check_grad(&input([3, 2]), |x| Tensor::hcat(&[x.slice_cols(1, 2), x.clone()]));
}

#[test]
fn gather_rows_scatters_repeated_ids() {
    let table = input([4, 3]);
    let out = table.gather_rows(&[2, 0, 2]);
    assert_eq!(out.shape(), [3, 3]);
    assert_eq!(out.row(0), table.row(2));
    out.sum().backward();
    let g = table.grad();
    assert_eq!(&g[0..3], &[1.0, 1.0, 1.0]);
    assert_eq!(&g[3..6], &[0.0, 0.0, 0.0]);
    assert_eq!(&g[6..9], &[2.0, 2.0, 2.0]);
}

#[test]
fn cross_entropy_of_uniform_logits_is_log_vocab() {
    let logits = Tensor::zeros([2, 3]);
    let loss = logits.cross_entropy(&[Some(0), Some(2)]);
    assert!((loss.item() - 3f64.ln()).abs() < 1e-12);
}

#[test]
fn cross_entropy_ignores_masked_rows() {
    let logits = input([3, 4]);
    let full = logits.slice_rows(2, 3).cross_entropy(&[Some(1)]).item();
    let masked = logits.cross_entropy(&[None, None, Some(1)]).item();
    assert!((full - masked).abs() < 1e-12);
}

#[test]
fn cross_entropy_all_ignored_is_zero() {
    let logits = input([2, 3]);
    let loss = logits.cross_entropy(&[None, None]);
    assert_eq!(loss.item(), 0.0);
    loss.backward();
    assert!(logits.grad().iter().all(|&g| g == 0.0));
}

#[test]
fn cross_entropy_backward() {
    let targets = [Some(1), None, Some(3)];
    let x = input([3, 4]);
    let loss = x.cross_entropy(&targets);
    loss.backward();
    let analytic = x.grad();
    let base = x.data();
    for i in 0..base.len() {
        let mut plus = base.clone();
        plus[i] += EPS;
        let fp = Tensor::new(plus, [3, 4]).cross_entropy(&targets).item();
        let mut minus = base.clone();
        minus[i] -= EPS;
        let fm = Tensor::new(minus, [3, 4]).cross_entropy(&targets).item();
        assert!((analytic[i] - (fp - fm) / (2.0 * EPS)).abs() < TOL);
    }
    // ignored row receives no gradient
    assert!(analytic[4..8].iter().all(|&g| g == 0.0));
}

#[test]
fn dropout_zero_probability_is_identity() {
    let mut rng = StdRng::seed_from_u64(0);
    let x = input([2, 3]);
    let y = x.dropout(0.0, &mut rng);
    assert_eq!(x.data(), y.data());
}

#[test]
fn dropout_scales_survivors_and_routes_gradient() {
    let mut rng = StdRng::seed_from_u64(7);
    let x = Tensor::full([10, 10], 1.0);
    let y = x.dropout(0.5, &mut rng);
    let data = y.data();
    assert!(data.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-12));
    let kept = data.iter().filter(|&&v| v > 0.0).count();
    assert!(kept > 20 && kept < 80, "kept {kept} of 100");
    y.sum().backward();
    assert_eq!(x.grad(), data);
}

#[test]
fn zero_grad_resets_leaf() {
    let x = input([2, 2]);
    x.sum().backward();
    assert!(x.grad().iter().all(|&g| g == 1.0));
    x.zero_grad();
    assert!(x.grad().iter().all(|&g| g == 0.0));
}
