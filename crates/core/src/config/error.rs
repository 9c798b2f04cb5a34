//! Error types for configuration loading.
//!
//! This module defines all errors that can occur while reading or writing
//! the files under `.feature-pilot/`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and saving.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a configuration file to disk.
    #[error("Failed to write config file at {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse YAML file at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize YAML for {path}: {source}")]
    YamlSerialize {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Invalid configuration structure.
    #[error("Invalid configuration in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
