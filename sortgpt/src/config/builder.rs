//! Build [`Config`] from layered sources.
//!
//! Precedence, lowest first: [`Config::default`], a JSON file ([`ConfigBuilder::file`]),
//! `SORTGPT_*` environment variables ([`ConfigBuilder::env`]), then explicit `key=value`
//! overrides ([`ConfigBuilder::overrides`]). [`ConfigBuilder::build`] validates the result.
//!
//! Overrides address fields by dotted path (`trainer.max_iters=500`). Values are parsed as
//! JSON first (`0.1`, `[0.9, 0.99]`, `null`) and fall back to a plain string (`exp_name=run1`).

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::constants::{ENV_PATH_SEPARATOR, ENV_PREFIX};
use super::Config;
use super::ConfigError;

/// Returns the full environment variable key for a given suffix (e.g. `SEED` → `SORTGPT_SEED`).
#[must_use]
pub fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Reads an environment variable as a string.
///
/// Returns `Some(value)` if the variable is set and valid UTF-8, `None` if unset.
/// Returns `Err(ConfigError::EnvVar)` if the variable is set but invalid (e.g. not Unicode).
pub fn env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(s) => Ok(Some(s)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvVar {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Collects `SORTGPT_*` environment variables as overrides, sorted by key.
///
/// `SORTGPT_TRAINER__MAX_ITERS=500` becomes `trainer.max_iters=500`.
pub fn env_overrides() -> Result<Vec<String>, ConfigError> {
    let mut entries = Vec::new();
    for (key, _) in std::env::vars_os() {
        let Some(key) = key.to_str() else { continue };
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let Some(value) = env_string(key)? else {
            continue;
        };
        let path = suffix
            .split(ENV_PATH_SEPARATOR)
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        entries.push(format!("{path}={value}"));
    }
    entries.sort();
    Ok(entries)
}

/// Applies one `dotted.path=value` override to `config`.
///
/// # Errors
///
/// - [`ConfigError::MalformedOverride`] when `entry` has no `=`.
/// - [`ConfigError::UnknownKey`] when the path does not name a field.
/// - [`ConfigError::Parse`] when the value does not fit the field's type.
pub fn apply_override(config: &mut Config, entry: &str) -> Result<(), ConfigError> {
    let (path, raw) = entry
        .split_once('=')
        .ok_or_else(|| ConfigError::MalformedOverride(entry.to_string()))?;
    let path = path.trim();
    let raw = raw.trim();
    let parse_error = |message: String| ConfigError::Parse {
        key: path.to_string(),
        value: raw.to_string(),
        message,
    };

    let mut tree = serde_json::to_value(&*config).map_err(|e| parse_error(e.to_string()))?;
    let mut slot = &mut tree;
    for segment in path.split('.') {
        slot = slot
            .as_object_mut()
            .and_then(|obj| obj.get_mut(segment))
            .ok_or_else(|| ConfigError::UnknownKey(path.to_string()))?;
    }
    *slot = if slot.is_string() {
        Value::String(raw.to_string())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    *config = serde_json::from_value(tree).map_err(|e| parse_error(e.to_string()))?;
    Ok(())
}

/// Layered [`Config`] construction.
///
/// ```no_run
/// # use sortgpt::config::ConfigBuilder;
/// let config = ConfigBuilder::new()
///     .file("sort.json")?
///     .env()?
///     .overrides(["trainer.max_iters=500"])?
///     .build()?;
/// # Ok::<(), sortgpt::config::ConfigError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Starts from [`Config::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current config with the contents of a JSON file.
    ///
    /// Fields missing from the file keep their defaults; unknown fields are rejected.
    pub fn file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.config = serde_json::from_str(&text).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(self)
    }

    /// Applies `SORTGPT_*` environment variables (see [`env_overrides`]).
    pub fn env(self) -> Result<Self, ConfigError> {
        let entries = env_overrides()?;
        self.overrides(entries)
    }

    /// Applies `key=value` overrides in order.
    pub fn overrides<I, S>(mut self, entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            apply_override(&mut self.config, entry.as_ref())?;
        }
        Ok(self)
    }

    /// Validates and returns the config.
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
