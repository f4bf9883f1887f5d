//! Store Module
//!
//! Vocabulary and embedding matrix parsed from a binary vector dump.

mod loader;
mod vector_store;

pub use loader::{CancelToken, LoadError};
pub use vector_store::VectorStore;
