//! Deterministic mock clients.

mod clients;

pub use clients::{MockEmbedder, MockLlm, EMBED_DIM};
