//! Configuration errors.
//!
//! All errors produced by the config module (file loading, env loading, overrides, validation)
//! use [`ConfigError`].

use std::fmt;
use std::path::PathBuf;

/// Errors produced when building or validating configuration.
///
/// # Variants
///
/// - **Validation**: Values are inconsistent or out of range (e.g. `n_embd` not divisible by `n_head`).
///   *When*: [`Config::validate`](super::Config::validate), also run by the builder.
///   *Recovery*: Fix the value named in the message.
///
/// - **EnvVar**: An environment variable could not be read (e.g. invalid Unicode).
///   *When*: Reading `SORTGPT_*` variables.
///   *Recovery*: Ensure the variable contains valid Unicode, or unset it.
///
/// - **Parse**: A value was read but does not fit the target field (e.g. `trainer.max_iters=abc`).
///   *When*: Applying an override, from `--hps` or from a `SORTGPT_*` variable.
///   *Recovery*: Use a value of the right type; the message names the key and the offending value.
///
/// - **Io**: The config file could not be read.
///   *When*: `ConfigBuilder::file`.
///   *Recovery*: Check the path and permissions.
///
/// - **File**: The config file is not valid JSON for [`Config`](super::Config) (syntax error, unknown
///   or mistyped field).
///   *When*: `ConfigBuilder::file`.
///   *Recovery*: Fix the file; the message carries the line and column.
///
/// - **UnknownKey**: An override names a path that does not exist in the config tree.
///   *When*: Applying `--hps` entries or `SORTGPT_*` variables.
///   *Recovery*: Check the spelling; paths look like `trainer.max_iters`.
///
/// - **MalformedOverride**: An override is not of the form `key=value`.
///   *When*: Applying `--hps` entries.
///   *Recovery*: Write overrides as `section.field=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration validation failed.
    Validation(String),

    /// Failed to read an environment variable.
    EnvVar {
        /// The full environment variable name.
        key: String,
        /// Underlying cause (e.g. not Unicode).
        message: String,
    },

    /// A value could not be converted into the expected type.
    Parse {
        /// Config path or environment variable name.
        key: String,
        /// The raw value that failed.
        value: String,
        /// Human-readable reason.
        message: String,
    },

    /// The config file could not be read.
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        message: String,
    },

    /// The config file could not be deserialized.
    File {
        /// File that was parsed.
        path: PathBuf,
        /// Deserializer message.
        message: String,
    },

    /// Override path does not exist.
    UnknownKey(String),

    /// Override without `=`.
    MalformedOverride(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Validation(m) => write!(f, "config validation: {m}"),
            ConfigError::EnvVar { key, message } => write!(f, "env var {key}: {message}"),
            ConfigError::Parse {
                key,
                value,
                message,
            } => write!(f, "config {key}={value:?}: {message}"),
            ConfigError::Io { path, message } => {
                write!(f, "config file {}: {message}", path.display())
            }
            ConfigError::File { path, message } => {
                write!(f, "config file {} is invalid: {message}", path.display())
            }
            ConfigError::UnknownKey(k) => write!(f, "config: unknown key {k:?}"),
            ConfigError::MalformedOverride(entry) => {
                write!(f, "config: override {entry:?} is not of the form key=value")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
