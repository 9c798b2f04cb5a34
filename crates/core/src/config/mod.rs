//! Configuration loading and management.
//!
//! This module provides functionality to load and save the files of the
//! `.feature-pilot/` directory.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, save_pipeline, CONFIG_DIR};
pub use models::AppConfig;
