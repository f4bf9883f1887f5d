//! Vector Store
//!
//! Immutable vocabulary and embedding matrix with O(1) word lookup.

use std::io::BufRead;

use hashbrown::HashMap;

use super::loader::{self, CancelToken, LoadError};

/// In-memory word embedding store.
///
/// Holds the vocabulary in insertion order next to a flat row-major
/// embedding matrix. Constructed empty, populated by a single [`load`],
/// and read-only afterwards; concurrent readers need no locking.
///
/// [`load`]: VectorStore::load
#[derive(Debug, Default, Clone)]
pub struct VectorStore {
    /// Words in insertion order; position doubles as the matrix row index
    words: Vec<String>,
    /// Word -> row index
    index: HashMap<String, usize>,
    /// Row-major matrix, `words.len() * dimension` floats
    matrix: Vec<f32>,
    /// Components per vector
    dimension: usize,
}

impl VectorStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a binary vector dump and build a populated store.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, LoadError> {
        loader::parse(reader, None)
    }

    /// Populate the store from a binary vector dump.
    ///
    /// Atomic: on success the parsed vocabulary and matrix replace the
    /// store's contents; on failure the store is left exactly as it was
    /// (empty for a first load) and is safe to retry with another stream.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<(), LoadError> {
        *self = loader::parse(reader, None)?;
        Ok(())
    }

    /// Same as [`load`], checking `cancel` between records and failing
    /// with [`LoadError::Cancelled`] once it trips.
    ///
    /// [`load`]: VectorStore::load
    pub fn load_with_cancel<R: BufRead>(
        &mut self,
        reader: R,
        cancel: &CancelToken,
    ) -> Result<(), LoadError> {
        *self = loader::parse(reader, Some(cancel))?;
        Ok(())
    }

    /// Get the normalized embedding for a word, exact case-sensitive
    /// match. Absence is not an error.
    pub fn get_vector(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&i| self.row(i))
    }

    /// Check if a word is in the vocabulary
    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Number of unique words in the vocabulary
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if the store is unpopulated
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Components per embedding vector (0 before a successful load)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Iterate `(word, vector)` pairs in insertion order.
    ///
    /// Each call starts a fresh traversal.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.words
            .iter()
            .enumerate()
            .map(|(i, word)| (word.as_str(), self.row(i)))
    }

    pub(crate) fn index_of(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub(crate) fn word_at(&self, index: usize) -> &str {
        &self.words[index]
    }

    pub(crate) fn row(&self, index: usize) -> &[f32] {
        &self.matrix[index * self.dimension..(index + 1) * self.dimension]
    }

    pub(crate) fn from_parts(
        words: Vec<String>,
        index: HashMap<String, usize>,
        matrix: Vec<f32>,
        dimension: usize,
    ) -> Self {
        debug_assert_eq!(words.len() * dimension, matrix.len());
        debug_assert_eq!(words.len(), index.len());
        Self {
            words,
            index,
            matrix,
            dimension,
        }
    }
}
