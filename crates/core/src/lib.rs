//! # fp-core
//!
//! Core process orchestration for feature-pilot.
//!
//! This crate provides:
//! - A provider abstraction over coding-agent backends, routed by model id
//! - An executor running agent CLIs and normalizing their output into
//!   canonical events
//! - Managed sessions for long-running external commands (test runners)
//! - The pipeline state machine computing a feature's next status
//! - Configuration loading from `.feature-pilot/`
//!
//! ## Modules
//!
//! - [`agents`]: Provider trait, registry, executor and backends
//! - [`session`]: Supervised process sessions
//! - [`pipeline`]: Next-status computation and step management
//! - [`config`]: Configuration loading and saving

pub mod agents;
pub mod config;
pub mod pipeline;
pub mod session;
