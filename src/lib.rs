//! WORDVEC - In-Memory Word Embedding Store
//!
//! Loads a word2vec-style binary vector dump into an immutable in-memory
//! store and answers exact nearest-neighbor and analogy queries over the
//! full vocabulary.

pub mod engine;
pub mod store;

pub use engine::{EngineConfig, Neighbor, QueryError, SimilarityEngine};
pub use store::{CancelToken, LoadError, VectorStore};
