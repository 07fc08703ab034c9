//! Facade assembly helpers for journey tests.

use gognee_core::{Gognee, GogneeConfig};

use crate::mocks::{MockEmbedder, MockLlm};

/// The shared world model most journeys run against.
pub fn standard_world() -> MockLlm {
    MockLlm::new(
        &[
            ("Alice", "Person", "Engineer at Acme"),
            ("Bob", "Person", "Engineer at Acme"),
            ("Carol", "Person", "Data scientist"),
            ("Acme", "Organization", "Employer"),
            ("Go", "Technology", "Programming language"),
            ("Rust", "Technology", "Programming language"),
        ],
        &[
            ("Alice", "works with", "Bob"),
            ("Alice", "works at", "Acme"),
            ("Bob", "works at", "Acme"),
            ("Carol", "works at", "Acme"),
            ("Go", "preferred over", "Rust"),
        ],
    )
}

/// Build an in-memory facade over the standard world, returning client
/// handles so tests can count calls and inject failures.
pub fn build(config: GogneeConfig) -> (Gognee<MockLlm, MockEmbedder>, MockLlm, MockEmbedder) {
    let llm = standard_world();
    let embedder = MockEmbedder::new();
    let gognee = Gognee::builder(llm.clone(), embedder.clone())
        .config(config)
        .build()
        .expect("facade builds");
    (gognee, llm, embedder)
}

/// In-memory facade with default configuration.
pub fn build_default() -> (Gognee<MockLlm, MockEmbedder>, MockLlm, MockEmbedder) {
    build(GogneeConfig::default())
}
