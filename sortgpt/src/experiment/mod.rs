//! One end-to-end sort experiment: data, model, training, evaluation.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::Config;
use crate::data::{Dataset, RandomLoader, SortDataset, Split};
use crate::error::Result;
use crate::eval::{eval_split, sort_prompt, EvalReport, PromptReport};
use crate::model::Gpt;
use crate::train::Trainer;

/// What a finished run reports.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub run_name: String,
    /// Loss of the last training iteration, if any ran.
    pub final_loss: Option<f64>,
    pub train: EvalReport,
    pub test: EvalReport,
    pub prompt: Option<PromptReport>,
}

/// `{exp_name}__{seed}__{unix_seconds}`.
#[must_use]
pub fn run_name(exp_name: &str, seed: u64, now: SystemTime) -> String {
    let secs = now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    format!("{exp_name}__{seed}__{secs}")
}

/// Runs the experiment described by `config`, then sorts `prompt` with the trained model.
///
/// Every random draw (initialisation, sampling, dropout) comes from one generator seeded
/// with `config.seed`.
pub fn run(config: &Config, prompt: Option<&[usize]>) -> Result<RunSummary> {
    config.validate()?;
    let run_name = run_name(&config.exp_name, config.seed, SystemTime::now());
    info!("run {run_name}");
    debug!("{config:#?}");
    info!("hyperparameters\n{}", config.hyperparameter_table());

    let mut rng = StdRng::seed_from_u64(config.seed);
    let train = SortDataset::from_config(Split::Train, &config.data)?;
    let test = SortDataset::from_config(Split::Test, &config.data)?;

    let example = train.get(0, &mut rng);
    for (x, y) in example.x.iter().zip(&example.y) {
        match y {
            Some(y) => info!("{x} {y}"),
            None => info!("{x} -1"),
        }
    }

    let model = Gpt::new(
        &config.gpt,
        train.vocab_size(),
        train.block_size(),
        &mut rng,
    )?;
    info!(
        "number of parameters: {:.2}M",
        model.num_params() as f64 / 1e6
    );

    let loader = RandomLoader::new(
        &train,
        config.trainer.batch_size,
        StdRng::from_rng(&mut rng),
    )?;
    let mut trainer = Trainer::new(model, &config.trainer);
    let stats = trainer.run(loader, &mut rng)?;
    let model = trainer.into_model();

    let train_report = eval_split(&model, &train, &config.eval, &mut rng)?;
    let test_report = eval_split(&model, &test, &config.eval, &mut rng)?;
    let prompt = prompt
        .map(|p| sort_prompt(&model, p, &mut rng))
        .transpose()?;

    Ok(RunSummary {
        run_name,
        final_loss: stats.last().map(|s| s.loss),
        train: train_report,
        test: test_report,
        prompt,
    })
}
