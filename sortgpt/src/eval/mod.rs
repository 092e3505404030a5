//! Sorting accuracy of a trained model.
//!
//! [`eval_split`] greedily completes every problem in a split and counts exact matches;
//! [`sort_prompt`] runs one user-supplied sequence.

use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EvalConfig;
use crate::data::{SequentialLoader, SortDataset, Split};
use crate::error::Result;
use crate::generate::{generate, GenerateOptions};
use crate::model::{Gpt, ModelError};

/// Exact-match score on one split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvalReport {
    pub split: Split,
    pub correct: usize,
    pub total: usize,
}

impl EvalReport {
    /// Fraction of problems sorted exactly, 0 for an empty report.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} final score: {}/{} = {:.2}% correct",
            self.split,
            self.correct,
            self.total,
            100.0 * self.accuracy()
        )
    }
}

/// Hands out at most `remaining` mistake lines.
struct MistakeLog {
    remaining: usize,
}

impl MistakeLog {
    fn new(max_mistakes: usize) -> Self {
        MistakeLog {
            remaining: max_mistakes,
        }
    }

    /// The line to log for a wrong answer, or `None` once the cap is used up.
    fn note(
        &mut self,
        input: &[usize],
        candidate: &[usize],
        expected: &[usize],
    ) -> Option<String> {
        self.remaining = self.remaining.checked_sub(1)?;
        Some(format!(
            "GPT claims that {input:?} sorted is {candidate:?} but gt is {expected:?}"
        ))
    }
}

/// Scores `model` on `dataset`, `config.batch_size` problems at a time.
///
/// Each problem's first `length` tokens are the prompt; the model generates `length` more
/// greedily and is right only if they equal the sorted input. The first
/// `config.max_mistakes` failures are logged.
pub fn eval_split(
    model: &Gpt,
    dataset: &SortDataset,
    config: &EvalConfig,
    rng: &mut StdRng,
) -> Result<EvalReport> {
    let n = dataset.length();
    let loader = SequentialLoader::new(dataset, config.batch_size, StdRng::from_rng(rng))?;
    let max_batches = config.max_batches.unwrap_or(usize::MAX);
    let options = GenerateOptions::new(n);
    debug!(
        "evaluating {} split: {} of {} batches",
        dataset.split(),
        loader.num_batches().min(max_batches),
        loader.num_batches()
    );

    let mut report = EvalReport {
        split: dataset.split(),
        correct: 0,
        total: 0,
    };
    let mut mistakes = MistakeLog::new(config.max_mistakes);
    for batch in loader.take(max_batches) {
        let inputs: Vec<Vec<usize>> = batch.x.iter().map(|x| x[..n].to_vec()).collect();
        let solutions: Vec<Vec<usize>> = batch
            .y
            .iter()
            .map(|y| y[y.len() - n..].iter().flatten().copied().collect())
            .collect();
        let completed = generate(model, &inputs, &options, rng)?;

        for ((inp, sol), out) in inputs.iter().zip(&solutions).zip(&completed) {
            let candidate = &out[n..];
            report.total += 1;
            if candidate == sol.as_slice() {
                report.correct += 1;
            } else if let Some(line) = mistakes.note(inp, candidate, sol) {
                info!("{line}");
            }
        }
    }
    info!("{report}");
    Ok(report)
}

/// Outcome of sorting one prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptReport {
    pub input: Vec<usize>,
    pub predicted: Vec<usize>,
    pub expected: Vec<usize>,
}

impl PromptReport {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.predicted == self.expected
    }
}

/// Asks the model to sort `prompt` and compares with the true sort.
pub fn sort_prompt(model: &Gpt, prompt: &[usize], rng: &mut StdRng) -> Result<PromptReport> {
    if prompt.is_empty() {
        return Err(ModelError::EmptySequence.into());
    }
    let n = prompt.len();
    let out = generate(model, &[prompt.to_vec()], &GenerateOptions::new(n), rng)?;
    let predicted = out
        .into_iter()
        .next()
        .map(|seq| seq[n..].to_vec())
        .unwrap_or_default();
    let mut expected = prompt.to_vec();
    expected.sort_unstable();

    let report = PromptReport {
        input: prompt.to_vec(),
        predicted,
        expected,
    };
    info!("input sequence  : {:?}", report.input);
    info!("predicted sorted: {:?}", report.predicted);
    info!("gt sort         : {:?}", report.expected);
    info!("matches         : {}", report.is_correct());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{GptConfig, TrainerConfig};
    use crate::data::RandomLoader;
    use crate::error::Error;
    use crate::train::Trainer;

    fn tiny_model() -> Gpt {
        let config = GptConfig {
            n_layer: 1,
            n_head: 2,
            n_embd: 8,
            ..GptConfig::default()
        };
        Gpt::new(&config, 3, 5, &mut StdRng::seed_from_u64(0)).unwrap()
    }

    fn eval_config(batch_size: usize, max_batches: Option<usize>) -> EvalConfig {
        EvalConfig {
            batch_size,
            max_batches,
            max_mistakes: 3,
        }
    }

    #[test]
    fn counts_every_problem_up_to_max_batches() {
        let model = tiny_model();
        let ds = SortDataset::new(Split::Test, 3, 3)
            .unwrap()
            .with_num_samples(25)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let all = eval_split(&model, &ds, &eval_config(10, None), &mut rng).unwrap();
        assert_eq!(all.split, Split::Test);
        assert_eq!(all.total, 25);
        assert!(all.correct <= all.total);

        let capped = eval_split(&model, &ds, &eval_config(10, Some(2)), &mut rng).unwrap();
        assert_eq!(capped.total, 20);
    }

    #[test]
    fn mistake_lines_stop_at_the_cap() {
        let mut log = MistakeLog::new(2);
        assert_eq!(
            log.note(&[2, 0, 1], &[0, 2, 1], &[0, 1, 2]).as_deref(),
            Some("GPT claims that [2, 0, 1] sorted is [0, 2, 1] but gt is [0, 1, 2]")
        );
        assert!(log.note(&[1, 0], &[1, 1], &[0, 1]).is_some());
        assert_eq!(log.note(&[1, 0], &[1, 1], &[0, 1]), None);
        assert_eq!(log.note(&[1, 0], &[1, 1], &[0, 1]), None);

        let mut silent = MistakeLog::new(0);
        assert_eq!(silent.note(&[1, 0], &[1, 1], &[0, 1]), None);
    }

    #[test]
    fn report_formats_score() {
        let report = EvalReport {
            split: Split::Train,
            correct: 3,
            total: 4,
        };
        assert_eq!(report.accuracy(), 0.75);
        assert_eq!(report.to_string(), "train final score: 3/4 = 75.00% correct");
        let empty = EvalReport {
            total: 0,
            correct: 0,
            ..report
        };
        assert_eq!(empty.accuracy(), 0.0);
    }

    #[test]
    fn prompt_report_compares_with_true_sort() {
        let model = tiny_model();
        let mut rng = StdRng::seed_from_u64(2);
        let report = sort_prompt(&model, &[2, 0, 1], &mut rng).unwrap();
        assert_eq!(report.input, vec![2, 0, 1]);
        assert_eq!(report.expected, vec![0, 1, 2]);
        assert_eq!(report.predicted.len(), 3);
        assert_eq!(report.is_correct(), report.predicted == vec![0, 1, 2]);
    }

    #[test]
    fn prompt_errors_are_reported() {
        let model = tiny_model();
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(
            sort_prompt(&model, &[], &mut rng).unwrap_err(),
            Error::Model(ModelError::EmptySequence)
        );
        assert!(matches!(
            sort_prompt(&model, &[0, 5], &mut rng),
            Err(Error::Model(ModelError::TokenOutOfVocab { token: 5, .. }))
        ));
    }

    #[test]
    fn zero_batch_size_is_a_data_error() {
        let model = tiny_model();
        let ds = SortDataset::new(Split::Train, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            eval_split(&model, &ds, &eval_config(0, None), &mut rng),
            Err(Error::Data(_))
        ));
    }

    #[test]
    fn trained_model_sorts_training_problems() {
        let mut rng = StdRng::seed_from_u64(4);
        let ds = SortDataset::new(Split::Train, 3, 3).unwrap();
        let problems = ds.clone().with_num_samples(50).unwrap();
        let config = GptConfig {
            n_layer: 1,
            n_head: 2,
            n_embd: 16,
            embd_pdrop: 0.0,
            resid_pdrop: 0.0,
            attn_pdrop: 0.0,
        };
        let model = Gpt::new(&config, 3, 5, &mut rng).unwrap();
        let trainer_config = TrainerConfig {
            max_iters: 400,
            batch_size: 16,
            learning_rate: 5e-3,
            ..TrainerConfig::default()
        };
        let loader = RandomLoader::new(&ds, 16, StdRng::seed_from_u64(5)).unwrap();
        let mut trainer = Trainer::new(model, &trainer_config);
        trainer.run(loader, &mut rng).unwrap();

        let report =
            eval_split(trainer.model(), &problems, &eval_config(25, None), &mut rng).unwrap();
        assert!(report.accuracy() > 0.5, "{report}");
    }
}
