//! # fp-protocol
//!
//! Core protocol definitions and data models for feature-pilot.
//!
//! This crate defines all shared data structures used for:
//! - Canonical agent events every provider is normalized into
//! - Supervised process session state and push notifications
//! - Pipeline step configuration and feature statuses
//! - Global configuration from config.toml
//!
//! ## Modules
//!
//! - [`events`]: Canonical event schema
//! - [`config_models`]: Global configuration from config.toml
//! - [`pipeline_models`]: Pipeline steps and feature statuses
//! - [`session_models`]: Runtime session state and status
//! - [`ipc`]: Operations and push events for callers
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, chrono and uuid
//! - TypeScript generation: Wire types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other feature-pilot crates

pub mod config_models;
pub mod events;
pub mod ipc;
pub mod pipeline_models;
pub mod session_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use events::*;
pub use ipc::*;
pub use pipeline_models::*;
pub use session_models::*;
