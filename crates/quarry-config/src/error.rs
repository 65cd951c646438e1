use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`crate::Config`]
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
