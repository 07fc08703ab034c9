//! Deterministic LLM and embedding clients.
//!
//! `MockLlm` answers extraction prompts from a fixed world model: the entity
//! stage returns every known entity mentioned in the chunk, the relation
//! stage returns every known triplet whose endpoints made it into the entity
//! listing. `MockEmbedder` hashes tokens into a fixed-dimension vector, so
//! texts sharing words land near each other and every run is reproducible.
//! Both count their calls and can be told to fail, for partial-failure and
//! incremental-skip assertions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gognee_core::{EmbeddingClient, EmbeddingError, LlmClient, LlmError};
use serde_json::{json, Value};

/// Dimension every mock embedding uses.
pub const EMBED_DIM: usize = 16;

// ============================================================================
// MOCK LLM
// ============================================================================

struct LlmInner {
    /// (name, type, description)
    entities: Vec<(String, String, String)>,
    /// (subject, relation, object)
    triplets: Vec<(String, String, String)>,
    calls: AtomicUsize,
    fail_budget: AtomicUsize,
}

/// World-model-driven extraction endpoint. Clone freely; clones share call
/// counters and the failure budget.
#[derive(Clone)]
pub struct MockLlm {
    inner: Arc<LlmInner>,
}

impl MockLlm {
    pub fn new(entities: &[(&str, &str, &str)], triplets: &[(&str, &str, &str)]) -> Self {
        Self {
            inner: Arc::new(LlmInner {
                entities: entities
                    .iter()
                    .map(|(n, t, d)| (n.to_string(), t.to_string(), d.to_string()))
                    .collect(),
                triplets: triplets
                    .iter()
                    .map(|(s, r, o)| (s.to_string(), r.to_string(), o.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
                fail_budget: AtomicUsize::new(0),
            }),
        }
    }

    /// Total completions served (failures included).
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` completions fail with a rate-limit error.
    pub fn fail_next(&self, n: usize) {
        self.inner.fail_budget.store(n, Ordering::SeqCst);
    }
}

impl LlmClient for MockLlm {
    async fn complete_with_schema(
        &self,
        prompt: &str,
        _schema: &Value,
    ) -> Result<String, LlmError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_budget.load(Ordering::SeqCst) > 0 {
            self.inner.fail_budget.fetch_sub(1, Ordering::SeqCst);
            return Err(LlmError::RateLimit("mock budget exhausted".to_string()));
        }

        if prompt.starts_with("Extract relations") {
            let listing = prompt
                .split("Entities: ")
                .nth(1)
                .and_then(|rest| rest.split("\n\nText:").next())
                .unwrap_or("")
                .to_lowercase();

            let triplets: Vec<Value> = self
                .inner
                .triplets
                .iter()
                .filter(|(subject, _, object)| {
                    listing.contains(&subject.to_lowercase())
                        && listing.contains(&object.to_lowercase())
                })
                .map(|(subject, relation, object)| {
                    json!({ "subject": subject, "relation": relation, "object": object })
                })
                .collect();
            Ok(json!({ "triplets": triplets }).to_string())
        } else {
            let text = prompt.split("Text:\n").nth(1).unwrap_or("");
            let entities: Vec<Value> = self
                .inner
                .entities
                .iter()
                .filter(|(name, _, _)| contains_words(text, name))
                .map(|(name, entity_type, description)| {
                    json!({ "name": name, "type": entity_type, "description": description })
                })
                .collect();
            Ok(json!({ "entities": entities }).to_string())
        }
    }
}

/// Whether `text` contains `name` as a consecutive word sequence.
fn contains_words(text: &str, name: &str) -> bool {
    let text_tokens = tokenize(text);
    let name_tokens = tokenize(name);
    if name_tokens.is_empty() {
        return false;
    }
    text_tokens
        .windows(name_tokens.len())
        .any(|window| window == name_tokens.as_slice())
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// MOCK EMBEDDER
// ============================================================================

struct EmbedderInner {
    calls: AtomicUsize,
    fail_budget: AtomicUsize,
}

/// Token-hash embedding endpoint: deterministic, fixed-dimension, and texts
/// sharing tokens score a higher cosine similarity.
#[derive(Clone)]
pub struct MockEmbedder {
    inner: Arc<EmbedderInner>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EmbedderInner {
                calls: AtomicUsize::new(0),
                fail_budget: AtomicUsize::new(0),
            }),
        }
    }

    /// Total embed batches served (failures included).
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` batches fail transiently.
    pub fn fail_next(&self, n: usize) {
        self.inner.fail_budget.store(n, Ordering::SeqCst);
    }

    /// The deterministic vector for `text`, outside the client trait.
    pub fn vector_for(text: &str) -> Vec<f32> {
        embed_text(text)
    }
}

impl EmbeddingClient for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_budget.load(Ordering::SeqCst) > 0 {
            self.inner.fail_budget.fetch_sub(1, Ordering::SeqCst);
            return Err(EmbeddingError::Transient("mock budget exhausted".to_string()));
        }
        Ok(texts.iter().map(|text| embed_text(text)).collect())
    }
}

fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBED_DIM];
    for token in tokenize(text) {
        let mut seed = fnv1a(&token);
        for slot in vector.iter_mut() {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            *slot += ((seed >> 33) as f32 / u32::MAX as f32) - 0.5;
        }
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for slot in vector.iter_mut() {
            *slot /= norm;
        }
    }
    vector
}

fn fnv1a(text: &str) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gognee_core::cosine_similarity;

    #[test]
    fn test_embedding_is_deterministic() {
        assert_eq!(embed_text("Go language"), embed_text("Go language"));
    }

    #[test]
    fn test_shared_tokens_raise_similarity() {
        let a = embed_text("Go: Programming language");
        let b = embed_text("language choice");
        let c = embed_text("quarterly revenue forecast");
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[test]
    fn test_word_matching_is_bounded() {
        assert!(contains_words("pick Go over Rust", "go"));
        assert!(!contains_words("good morning", "go"));
        assert!(contains_words("Alice works with Bob at Acme.", "Alice"));
    }
}
