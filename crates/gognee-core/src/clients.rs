//! External Client Capabilities
//!
//! The LLM endpoint and the embedding endpoint are collaborators, not parts
//! of this crate. Each is a narrow async trait the host implements; the
//! library never constructs one. Native async-fn-in-trait keeps the seam
//! dependency-free — implementors just write `async fn`, and the facade is
//! generic over both capabilities.
//!
//! Cancellation follows Rust semantics: dropping the future of any facade
//! operation aborts it at the next suspension point.

use std::future::Future;

use serde_json::Value;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// LLM completion failure classification.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// The completion was not valid JSON for the requested schema.
    #[error("completion did not match schema: {0}")]
    Parse(String),
    /// The endpoint rejected the call for rate limiting. Retryable.
    #[error("rate limited: {0}")]
    RateLimit(String),
    /// Authentication or authorization failure. Not retryable.
    #[error("auth failure: {0}")]
    Auth(String),
    /// The call exceeded its deadline.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Anything else (network failure, server error).
    #[error("llm error: {0}")]
    Other(String),
}

/// Embedding failure classification.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Transient failure (rate limit, network); the batch may be retried.
    #[error("transient embedding failure: {0}")]
    Transient(String),
    /// Permanent failure (bad request, auth); retrying will not help.
    #[error("permanent embedding failure: {0}")]
    Permanent(String),
}

// ============================================================================
// CAPABILITY TRAITS
// ============================================================================

/// Schema-constrained JSON completion capability.
pub trait LlmClient: Send + Sync {
    /// Complete `prompt` into a JSON document conforming to `schema`.
    ///
    /// Returns the raw completion text; the caller normalizes and parses it.
    fn complete_with_schema(
        &self,
        prompt: &str,
        schema: &Value,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// Batch text-embedding capability.
///
/// Output ordering matches input ordering, and every vector has the fixed
/// dimension the instance was configured with.
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts into fixed-dimension vectors.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;
}

// ============================================================================
// TESTS
// ============================================================================
