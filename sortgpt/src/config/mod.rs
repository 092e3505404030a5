//! Configuration for the dataset, model, training, and evaluation.
//!
//! Build with [`ConfigBuilder`] (defaults → JSON file → `SORTGPT_*` env → `key=value` overrides)
//! and validate with [`Config::validate`]. Default values and env naming live in the
//! `constants` submodule.

mod builder;
pub(crate) mod constants;
mod error;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_BETAS, DEFAULT_EVAL_BATCH_SIZE, DEFAULT_EVAL_MAX_BATCHES,
    DEFAULT_EVAL_MAX_MISTAKES, DEFAULT_EXP_NAME, DEFAULT_GRAD_NORM_CLIP, DEFAULT_LEARNING_RATE,
    DEFAULT_LENGTH, DEFAULT_LOG_EVERY, DEFAULT_MAX_ITERS, DEFAULT_NUM_DIGITS, DEFAULT_NUM_SAMPLES,
    DEFAULT_N_EMBD, DEFAULT_N_HEAD, DEFAULT_N_LAYER, DEFAULT_PDROP, DEFAULT_SEED,
    DEFAULT_WEIGHT_DECAY,
};

pub use builder::{apply_override, env_key, env_overrides, env_string, ConfigBuilder};
pub use error::ConfigError;

/// Central configuration for one sort experiment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Experiment name; prefix of the run name.
    pub exp_name: String,
    /// Seed for every RNG in the run.
    pub seed: u64,
    pub data: DataConfig,
    pub gpt: GptConfig,
    pub trainer: TrainerConfig,
    pub eval: EvalConfig,
}

/// Sort task shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Digits per problem.
    pub length: usize,
    /// Alphabet size; digits are `0..num_digits`.
    pub num_digits: usize,
    /// Nominal dataset length (samples per pass of a sequential loader).
    pub num_samples: usize,
}

/// Transformer dimensions and dropout. Vocabulary and block size come from the dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GptConfig {
    pub n_layer: usize,
    pub n_head: usize,
    /// Embedding width; must be divisible by `n_head`.
    pub n_embd: usize,
    pub embd_pdrop: f64,
    pub resid_pdrop: f64,
    pub attn_pdrop: f64,
}

/// Optimization settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    pub max_iters: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// AdamW `(beta1, beta2)`.
    pub betas: (f64, f64),
    /// Decoupled weight decay, only applied on matmul weights.
    pub weight_decay: f64,
    /// Max global gradient norm; 0 disables clipping.
    pub grad_norm_clip: f64,
    /// Log the training loss every this many iterations.
    pub log_every: usize,
}

/// Greedy-decoding evaluation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub batch_size: usize,
    /// Stop after this many batches; `None` runs the whole split.
    pub max_batches: Option<usize>,
    /// How many wrong answers to log per split.
    pub max_mistakes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exp_name: DEFAULT_EXP_NAME.to_string(),
            seed: DEFAULT_SEED,
            data: DataConfig::default(),
            gpt: GptConfig::default(),
            trainer: TrainerConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            num_digits: DEFAULT_NUM_DIGITS,
            num_samples: DEFAULT_NUM_SAMPLES,
        }
    }
}

impl Default for GptConfig {
    fn default() -> Self {
        Self {
            n_layer: DEFAULT_N_LAYER,
            n_head: DEFAULT_N_HEAD,
            n_embd: DEFAULT_N_EMBD,
            embd_pdrop: DEFAULT_PDROP,
            resid_pdrop: DEFAULT_PDROP,
            attn_pdrop: DEFAULT_PDROP,
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iters: DEFAULT_MAX_ITERS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            betas: DEFAULT_BETAS,
            weight_decay: DEFAULT_WEIGHT_DECAY,
            grad_norm_clip: DEFAULT_GRAD_NORM_CLIP,
            log_every: DEFAULT_LOG_EVERY,
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_EVAL_BATCH_SIZE,
            max_batches: Some(DEFAULT_EVAL_MAX_BATCHES),
            max_mistakes: DEFAULT_EVAL_MAX_MISTAKES,
        }
    }
}

fn positive(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(())
}

fn probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..1.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{name} ({value}) must be in [0, 1)"
        )));
    }
    Ok(())
}

impl Config {
    /// Validates configuration. Returns `Ok(())` if valid, or a [`ConfigError::Validation`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("data.length", self.data.length)?;
        positive("data.num_digits", self.data.num_digits)?;
        positive("data.num_samples", self.data.num_samples)?;

        let gpt = &self.gpt;
        positive("gpt.n_layer", gpt.n_layer)?;
        positive("gpt.n_head", gpt.n_head)?;
        positive("gpt.n_embd", gpt.n_embd)?;
        if gpt.n_embd % gpt.n_head != 0 {
            return Err(ConfigError::Validation(format!(
                "gpt.n_embd ({}) must be divisible by gpt.n_head ({})",
                gpt.n_embd, gpt.n_head
            )));
        }
        probability("gpt.embd_pdrop", gpt.embd_pdrop)?;
        probability("gpt.resid_pdrop", gpt.resid_pdrop)?;
        probability("gpt.attn_pdrop", gpt.attn_pdrop)?;

        let trainer = &self.trainer;
        positive("trainer.max_iters", trainer.max_iters)?;
        positive("trainer.batch_size", trainer.batch_size)?;
        positive("trainer.log_every", trainer.log_every)?;
        if trainer.learning_rate.is_nan() || trainer.learning_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "trainer.learning_rate must be greater than 0".to_string(),
            ));
        }
        probability("trainer.betas.0", trainer.betas.0)?;
        probability("trainer.betas.1", trainer.betas.1)?;
        if trainer.weight_decay.is_nan() || trainer.weight_decay < 0.0 {
            return Err(ConfigError::Validation(
                "trainer.weight_decay must be >= 0".to_string(),
            ));
        }
        if trainer.grad_norm_clip.is_nan() || trainer.grad_norm_clip < 0.0 {
            return Err(ConfigError::Validation(
                "trainer.grad_norm_clip must be >= 0 (0 disables clipping)".to_string(),
            ));
        }

        positive("eval.batch_size", self.eval.batch_size)?;
        if self.eval.max_batches == Some(0) {
            return Err(ConfigError::Validation(
                "eval.max_batches must be greater than 0 (or null for the whole split)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Flattened `|param|value|` markdown table of every setting.
    #[must_use]
    pub fn hyperparameter_table(&self) -> String {
        fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
            match value {
                Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        flatten(&key, v, rows);
                    }
                }
                Value::String(s) => rows.push((prefix.to_string(), s.clone())),
                other => rows.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut rows = Vec::new();
        if let Ok(tree) = serde_json::to_value(self) {
            flatten("", &tree, &mut rows);
        }
        let body: Vec<String> = rows
            .iter()
            .map(|(k, v)| format!("|{k}|{v}|"))
            .collect();
        format!("|param|value|\n|-|-|\n{}", body.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    /// Lock so env tests don't run in parallel and pollute each other.
    static CONFIG_ENV_LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        CONFIG_ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.data.length, 6);
        assert_eq!(cfg.data.num_digits, 3);
        assert_eq!(cfg.trainer.batch_size, 64);
        assert_eq!(cfg.trainer.max_iters, 2000);
        assert_eq!(cfg.trainer.betas, (0.9, 0.95));
        assert_eq!(cfg.eval.max_batches, Some(50));
    }

    #[test]
    fn validate_rejects_n_embd_not_divisible_by_n_head() {
        let mut cfg = Config::default();
        cfg.gpt.n_embd = 50;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("divisible"));
    }

    #[test]
    fn validate_rejects_zero_sizes() {
        let mut cfg = Config::default();
        cfg.data.length = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.trainer.batch_size = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.eval.max_batches = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_probabilities() {
        let mut cfg = Config::default();
        cfg.gpt.attn_pdrop = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.trainer.betas = (0.9, -0.1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_learning_rate() {
        let mut cfg = Config::default();
        cfg.trainer.learning_rate = 0.0;
        assert!(cfg.validate().is_err());
        cfg.trainer.learning_rate = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn override_sets_nested_fields() {
        let mut cfg = Config::default();
        apply_override(&mut cfg, "trainer.max_iters=500").unwrap();
        apply_override(&mut cfg, "trainer.betas=[0.8, 0.99]").unwrap();
        apply_override(&mut cfg, "eval.max_batches=null").unwrap();
        apply_override(&mut cfg, "exp_name=123").unwrap();
        assert_eq!(cfg.trainer.max_iters, 500);
        assert_eq!(cfg.trainer.betas, (0.8, 0.99));
        assert_eq!(cfg.eval.max_batches, None);
        assert_eq!(cfg.exp_name, "123");
    }

    #[test]
    fn override_unknown_key_is_rejected() {
        let mut cfg = Config::default();
        let err = apply_override(&mut cfg, "trainer.max_itrs=5").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(k) if k == "trainer.max_itrs"));
        let err = apply_override(&mut cfg, "seed.inner=5").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn override_wrong_type_is_parse_error() {
        let mut cfg = Config::default();
        let err = apply_override(&mut cfg, "gpt.n_layer=abc").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref key, .. } if key == "gpt.n_layer"));
        assert_eq!(cfg, Config::default(), "failed override leaves config untouched");
    }

    #[test]
    fn override_without_equals_is_malformed() {
        let mut cfg = Config::default();
        let err = apply_override(&mut cfg, "trainer.max_iters").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedOverride(_)));
    }

    #[test]
    fn builder_validates_after_overrides() {
        let res = ConfigBuilder::new().overrides(["gpt.n_head=5"]).unwrap().build();
        assert!(matches!(res, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn builder_reads_partial_json_file() {
        let path = std::env::temp_dir().join("sortgpt_config_test_partial.json");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"seed": 7, "trainer": {{"max_iters": 10}}}}"#).unwrap();
        drop(f);

        let res = ConfigBuilder::new().file(&path).and_then(ConfigBuilder::build);
        let _ = std::fs::remove_file(&path);
        let cfg = res.unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.trainer.max_iters, 10);
        assert_eq!(cfg.trainer.batch_size, 64);
    }

    #[test]
    fn builder_rejects_unknown_file_fields() {
        let path = std::env::temp_dir().join("sortgpt_config_test_unknown.json");
        std::fs::write(&path, r#"{"trainer": {"num_workers": 4}}"#).unwrap();
        let res = ConfigBuilder::new().file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(res, Err(ConfigError::File { .. })));
    }

    #[test]
    fn builder_missing_file_is_io_error() {
        let res = ConfigBuilder::new().file("/nonexistent/sortgpt_never_exists.json");
        assert!(matches!(res, Err(ConfigError::Io { .. })));
    }

    fn build_from_env() -> Result<Config, ConfigError> {
        ConfigBuilder::new().env()?.build()
    }

    #[test]
    fn env_layer_falls_back_to_defaults() {
        let _g = env_lock();
        std::env::remove_var(env_key("SEED"));
        std::env::remove_var(env_key("TRAINER__MAX_ITERS"));
        let cfg = build_from_env().unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn env_layer_overrides_nested_fields() {
        let _g = env_lock();
        let seed = env_key("SEED");
        let iters = env_key("TRAINER__MAX_ITERS");
        std::env::set_var(&seed, "9");
        std::env::set_var(&iters, "42");
        let res = build_from_env();
        std::env::remove_var(seed);
        std::env::remove_var(iters);
        let cfg = res.unwrap();
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.trainer.max_iters, 42);
    }

    #[test]
    fn env_layer_rejects_mistyped_value() {
        let _g = env_lock();
        let key = env_key("SEED");
        std::env::set_var(&key, "not_a_number");
        let res = build_from_env();
        std::env::remove_var(key);
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn env_layer_reports_non_unicode_value() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let _g = env_lock();
        let key = env_key("EXP_NAME");
        std::env::set_var(&key, OsStr::from_bytes(&[0x66, 0x6f, 0xff]));
        let res = env_overrides();
        std::env::remove_var(&key);
        match res {
            Err(ConfigError::EnvVar { key: k, .. }) => assert_eq!(k, key),
            other => panic!("expected EnvVar error, got {other:?}"),
        }
    }

    #[test]
    fn env_string_unset_returns_none() {
        let key = "SORTGPT_UNLIKELY_KEY_12345";
        assert_eq!(env_string(key).unwrap(), None);
    }

    #[test]
    fn hyperparameter_table_lists_flattened_keys() {
        let table = Config::default().hyperparameter_table();
        assert!(table.starts_with("|param|value|\n|-|-|\n"));
        assert!(table.contains("|trainer.max_iters|2000|"));
        assert!(table.contains("|exp_name|train_sort|"));
        assert!(table.contains("|trainer.betas|[0.9,0.95]|"));
    }

    #[test]
    fn config_error_display_names_key() {
        let e = ConfigError::Parse {
            key: "gpt.n_layer".to_string(),
            value: "abc".to_string(),
            message: "invalid type".to_string(),
        };
        assert!(e.to_string().contains("gpt.n_layer"));
        assert!(e.to_string().contains("abc"));
    }
}
