//! ABOUTME: Core error and tracing foundations for stakeout
//! ABOUTME: Error/Result types and telemetry setup used by all other crates

pub mod error;
pub mod telemetry;

pub use error::{Error, Result};
