//! Common test utilities shared by the integration tests.
//!
//! - Fixtures: fake agent CLIs, pipeline steps, session managers
//! - Assertions over canonical and session events

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
