//! The training loop.
//!
//! [`Trainer`] owns the model and the optimizer. Each [`Trainer::step`] runs a forward pass in
//! train mode, backpropagates, clips the global gradient norm, and steps the optimizer.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;

use crate::config::TrainerConfig;
use crate::data::Batch;
use crate::model::{ForwardMode, Gpt, ModelError};
use crate::optim::{clip_grad_norm, AdamW, Optimizer};

/// What one iteration produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingStats {
    pub iter: usize,
    pub loss: f64,
    /// Global gradient norm before clipping.
    pub grad_norm: f64,
}

/// Whether iteration `iter` gets a progress line. Iteration 0 always does; a `log_every`
/// of 0 is treated as 1.
fn logs_at(iter: usize, log_every: usize) -> bool {
    iter % log_every.max(1) == 0
}

fn progress_line(iter_dt: Duration, stats: &TrainingStats) -> String {
    format!(
        "iter_dt {:.2}ms; iter {}: train loss {:.5}",
        iter_dt.as_secs_f64() * 1000.0,
        stats.iter,
        stats.loss
    )
}

/// Drives optimisation of a [`Gpt`].
pub struct Trainer<O = AdamW> {
    model: Gpt,
    optimizer: O,
    config: TrainerConfig,
    iter_num: usize,
}

impl Trainer<AdamW> {
    /// Trainer with an [`AdamW`] built from `config`.
    #[must_use]
    pub fn new(model: Gpt, config: &TrainerConfig) -> Self {
        Self::with_optimizer(model, AdamW::from_config(config), config)
    }
}

impl<O: Optimizer> Trainer<O> {
    #[must_use]
    pub fn with_optimizer(model: Gpt, optimizer: O, config: &TrainerConfig) -> Self {
        Trainer {
            model,
            optimizer,
            config: config.clone(),
            iter_num: 0,
        }
    }

    #[must_use]
    pub fn model(&self) -> &Gpt {
        &self.model
    }

    #[must_use]
    pub fn into_model(self) -> Gpt {
        self.model
    }

    /// Iterations completed so far.
    #[must_use]
    pub fn iter_num(&self) -> usize {
        self.iter_num
    }

    /// One optimisation step on `batch`. Dropout masks are drawn from `rng`.
    pub fn step(&mut self, batch: &Batch, rng: &mut StdRng) -> Result<TrainingStats, ModelError> {
        let loss = self
            .model
            .loss(&batch.x, &batch.y, ForwardMode::Train(rng))?;
        loss.backward();

        let params = self.model.params();
        let grad_norm = clip_grad_norm(&params, self.config.grad_norm_clip);
        self.optimizer.step(&params);

        let stats = TrainingStats {
            iter: self.iter_num,
            loss: loss.item(),
            grad_norm,
        };
        self.iter_num += 1;
        Ok(stats)
    }

    /// Trains until `max_iters` iterations are done, pulling one batch per iteration.
    ///
    /// Logs every `log_every` iterations (including the first). Stops early with a warning if
    /// `batches` runs dry.
    pub fn run<I>(&mut self, batches: I, rng: &mut StdRng) -> Result<Vec<TrainingStats>, ModelError>
    where
        I: IntoIterator<Item = Batch>,
    {
        let max_iters = self.config.max_iters;
        info!(
            "training for {} iterations (lr {}, batch size {})",
            max_iters,
            self.optimizer.learning_rate(),
            self.config.batch_size
        );

        let mut batches = batches.into_iter();
        let mut stats = Vec::with_capacity(max_iters.saturating_sub(self.iter_num));
        let mut last = Instant::now();
        while self.iter_num < max_iters {
            let Some(batch) = batches.next() else {
                warn!("batch source exhausted after {} iterations", self.iter_num);
                break;
            };
            let s = self.step(&batch, rng)?;

            let now = Instant::now();
            let iter_dt = now.duration_since(last);
            last = now;
            if logs_at(s.iter, self.config.log_every) {
                info!("{}", progress_line(iter_dt, &s));
            }
            debug!("iter {}: grad norm {:.4}", s.iter, s.grad_norm);
            stats.push(s);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;

    use crate::config::GptConfig;
    use crate::data::{Dataset, RandomLoader, SortDataset, Split};

    fn tiny_model(rng: &mut StdRng) -> Gpt {
        let config = GptConfig {
            n_layer: 1,
            n_head: 2,
            n_embd: 16,
            embd_pdrop: 0.0,
            resid_pdrop: 0.0,
            attn_pdrop: 0.0,
        };
        Gpt::new(&config, 3, 5, rng).unwrap()
    }

    fn config(max_iters: usize) -> TrainerConfig {
        TrainerConfig {
            max_iters,
            batch_size: 8,
            learning_rate: 1e-2,
            log_every: 1,
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn repeated_steps_fit_a_fixed_batch() {
        let mut rng = StdRng::seed_from_u64(0);
        let ds = SortDataset::new(Split::Train, 3, 3).unwrap();
        let batch: Batch = (0..8).map(|_| ds.sample(&mut rng)).collect();
        let mut trainer = Trainer::new(tiny_model(&mut rng), &config(200));

        let first = trainer.step(&batch, &mut rng).unwrap();
        let mut last = first;
        for _ in 0..100 {
            last = trainer.step(&batch, &mut rng).unwrap();
        }
        assert_eq!(first.iter, 0);
        assert_eq!(last.iter, 100);
        assert!(first.grad_norm > 0.0);
        assert!(last.loss < first.loss * 0.5, "{} -> {}", first.loss, last.loss);
    }

    #[test]
    fn run_stops_at_max_iters() {
        let mut rng = StdRng::seed_from_u64(1);
        let ds = SortDataset::new(Split::Train, 3, 3).unwrap();
        let loader = RandomLoader::new(&ds, 4, StdRng::seed_from_u64(2)).unwrap();
        let mut trainer = Trainer::new(tiny_model(&mut rng), &config(5));
        let stats = trainer.run(loader, &mut rng).unwrap();
        let iters: Vec<usize> = stats.iter().map(|s| s.iter).collect();
        assert_eq!(iters, vec![0, 1, 2, 3, 4]);
        assert_eq!(trainer.iter_num(), 5);
        assert!(stats.iter().all(|s| s.loss.is_finite()));
    }

    #[test]
    fn run_stops_early_when_batches_run_out() {
        let mut rng = StdRng::seed_from_u64(3);
        let ds = SortDataset::new(Split::Train, 3, 3).unwrap();
        let batches: Vec<Batch> = (0..2)
            .map(|_| (0..4).map(|_| ds.sample(&mut rng)).collect())
            .collect();
        let mut trainer = Trainer::new(tiny_model(&mut rng), &config(10));
        let stats = trainer.run(batches, &mut rng).unwrap();
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn progress_is_logged_every_log_every_iterations_from_zero() {
        let logged: Vec<usize> = (0..10).filter(|&i| logs_at(i, 4)).collect();
        assert_eq!(logged, vec![0, 4, 8]);
        assert!((0..5).all(|i| logs_at(i, 1)));
        assert!((0..5).all(|i| logs_at(i, 0)));
        assert!(logs_at(0, 100));
        assert!(!logs_at(99, 100));
    }

    #[test]
    fn progress_line_reports_time_iteration_and_loss() {
        let stats = TrainingStats {
            iter: 42,
            loss: 1.234_567_8,
            grad_norm: 0.5,
        };
        assert_eq!(
            progress_line(Duration::from_micros(1500), &stats),
            "iter_dt 1.50ms; iter 42: train loss 1.23457"
        );
    }

    #[test]
    fn step_propagates_model_errors() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut trainer = Trainer::new(tiny_model(&mut rng), &config(1));
        let batch = Batch {
            x: vec![vec![0, 7]],
            y: vec![vec![None, Some(1)]],
        };
        assert!(matches!(
            trainer.step(&batch, &mut rng),
            Err(ModelError::TokenOutOfVocab { token: 7, .. })
        ));
        assert_eq!(trainer.iter_num(), 0);
    }
}
