//! Football video analysis pipeline.
//!
//! This crate provides:
//! - The sequential sampling and analysis pipeline with partial results
//! - Worker configuration from the environment
//! - Structured request logging and request metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RequestLogger;
pub use pipeline::{BatchAccumulator, Pipeline, PipelineState};
