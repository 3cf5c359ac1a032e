//! Gemini frame analysis client.
//!
//! This crate provides:
//! - The `FrameAnalyzer` seam used by the pipeline
//! - A retrying `GeminiClient` over a pluggable `Transport`
//! - API-key (rate limited) and Vertex AI (gcp_auth) transports
//! - Upstream error classification driving the retry policy
//! - Request prompt and response schema for per-frame analysis

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod prompt;
pub mod request;
pub mod retry;
pub mod schema;
pub mod token_cache;
pub mod transport;

pub use client::{build_analyzer, FrameAnalyzer, GeminiClient};
pub use config::{AuthMode, VisionConfig};
pub use error::{ErrorClass, VisionError, VisionResult};
pub use request::GenerateContentRequest;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{ApiKeyTransport, HttpTransport, Transport, VertexTransport};
