//! `train-sort`: train a small GPT to sort digit sequences and report how well it does.
//!
//! ```text
//! train-sort --seed 3 --hps trainer.max_iters=500 gpt.n_layer=2 --prompt 2,0,1,1,0,2
//! ```
//!
//! Settings come from defaults, then `--config file.json`, then `SORTGPT_*` environment
//! variables, then `--hps`, then `--exp-name` and `--seed`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::{info, LevelFilter};
use sortgpt::config::ConfigBuilder;
use sortgpt::{experiment, logger, Config};

#[derive(Parser, Debug)]
#[command(name = "train-sort", about = "Train a GPT to sort short digit sequences")]
struct Args {
    /// Name of this experiment (default `train_sort`)
    #[arg(long)]
    exp_name: Option<String>,

    /// Seed for every random draw (default 1)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hyperparameter overrides, e.g. `trainer.max_iters=500`
    #[arg(long, num_args = 1..)]
    hps: Vec<String>,

    /// Sequence to sort after training, e.g. `2,0,1`
    #[arg(long, value_delimiter = ',')]
    prompt: Vec<usize>,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut builder = ConfigBuilder::new();
    if let Some(path) = &args.config {
        builder = builder
            .file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
    }

    let mut overrides = args.hps.clone();
    if let Some(name) = &args.exp_name {
        overrides.push(format!("exp_name={name}"));
    }
    if let Some(seed) = args.seed {
        overrides.push(format!("seed={seed}"));
    }

    builder
        .env()
        .context("failed to read SORTGPT_* environment")?
        .overrides(&overrides)
        .context("failed to apply overrides")?
        .build()
        .context("invalid configuration")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(args.log_level).context("failed to initialise logger")?;

    let config = build_config(&args)?;
    let prompt = (!args.prompt.is_empty()).then_some(args.prompt.as_slice());
    let summary = experiment::run(&config, prompt).context("experiment failed")?;

    if let Some(loss) = summary.final_loss {
        info!("{}: final train loss {loss:.5}", summary.run_name);
    }
    info!(
        "train accuracy {:.2}%, test accuracy {:.2}%",
        100.0 * summary.train.accuracy(),
        100.0 * summary.test.accuracy()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_prompt() {
        let args = Args::try_parse_from([
            "train-sort",
            "--seed",
            "3",
            "--hps",
            "trainer.max_iters=10",
            "gpt.n_layer=1",
            "--prompt",
            "2,0,1",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.hps, vec!["trainer.max_iters=10", "gpt.n_layer=1"]);
        assert_eq!(args.prompt, vec![2, 0, 1]);
        assert_eq!(args.log_level, LevelFilter::Debug);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = Args::try_parse_from(["train-sort", "--log-level", "loud"]).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn second_logger_init_carries_context() {
        let _ = logger::init(LevelFilter::Off);
        let err = logger::init(LevelFilter::Off)
            .context("failed to initialise logger")
            .unwrap_err();
        assert!(format!("{err:#}").starts_with("failed to initialise logger: "));
    }

    #[test]
    fn cli_flags_override_hps() {
        let args = Args::try_parse_from([
            "train-sort",
            "--exp-name",
            "cli",
            "--seed",
            "9",
            "--hps",
            "seed=2",
            "data.length=4",
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.exp_name, "cli");
        assert_eq!(config.seed, 9);
        assert_eq!(config.data.length, 4);
    }

    #[test]
    fn bad_override_is_reported() {
        let args = Args::try_parse_from(["train-sort", "--hps", "gpt.depth=2"]).unwrap();
        let err = build_config(&args).unwrap_err();
        assert!(format!("{err:#}").contains("gpt.depth"));
    }
}
