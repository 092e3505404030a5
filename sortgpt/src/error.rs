//! Crate-level error.
//!
//! Pipeline functions ([`eval`](crate::eval), [`experiment`](crate::experiment)) touch several
//! modules and return [`Error`], which wraps each module's error via `From`.

use std::fmt;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::model::ModelError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Config(ConfigError),
    Data(DataError),
    Model(ModelError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "{e}"),
            Error::Data(e) => write!(f, "{e}"),
            Error::Model(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Data(e) => Some(e),
            Error::Model(e) => Some(e),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DataError> for Error {
    fn from(e: DataError) -> Self {
        Error::Data(e)
    }
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Error::Model(e)
    }
}

/// Result alias for pipeline functions.
pub type Result<T> = std::result::Result<T, Error>;
