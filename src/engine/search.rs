//! Similarity Search
//!
//! The query surface over a loaded store: nearest neighbors for a word
//! and analogy resolution for a signed phrase.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::store::VectorStore;

use super::config::EngineConfig;
use super::phrase::{self, Sign};
use super::ranking::{self, Candidate};
use super::similarity;

/// Errors raised by a single query.
///
/// Local to the query; the store stays valid and later queries are
/// unaffected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The named word has no vector in the vocabulary
    #[error("word not found in vocabulary: '{0}'")]
    WordNotFound(String),

    /// The phrase contained no words
    #[error("phrase contains no words")]
    EmptyPhrase,
}

/// One ranked result row
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Vocabulary word
    pub word: String,
    /// Cosine similarity to the query vector
    pub score: f32,
}

/// Similarity engine over an immutable vector store.
///
/// Every query is a pure read, so one engine can serve any number of
/// threads sharing the same store.
#[derive(Clone)]
pub struct SimilarityEngine {
    store: Arc<VectorStore>,
    config: EngineConfig,
}

impl SimilarityEngine {
    /// Create an engine over a loaded store
    pub fn new(store: Arc<VectorStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create with default configuration
    pub fn with_defaults(store: Arc<VectorStore>) -> Self {
        Self::new(store, EngineConfig::default())
    }

    /// Get the underlying store
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rank the vocabulary by similarity to `word`, best first.
    ///
    /// The word itself is excluded from the results. `count = None`
    /// falls back to the configured default; a count beyond the
    /// vocabulary returns every other entry. Ties break by vocabulary
    /// insertion order.
    pub fn closest_to(
        &self,
        word: &str,
        count: Option<usize>,
    ) -> Result<Vec<Neighbor>, QueryError> {
        let index = self
            .store
            .index_of(word)
            .ok_or_else(|| QueryError::WordNotFound(word.to_string()))?;

        let k = count.unwrap_or(self.config.default_count);
        debug!("closest_to: word='{}' k={}", word, k);

        let query = self.store.row(index);
        let hits = ranking::top_k(&self.store, query, &[index], k, self.config.scan_workers);
        Ok(self.to_neighbors(hits))
    }

    /// Resolve an analogy phrase and rank the vocabulary against it.
    ///
    /// The phrase's signed words are summed into one query vector, which
    /// is normalized before scoring so results stay in cosine range.
    /// Every word that appeared in the phrase is excluded from the
    /// results. Count and tie-break semantics match [`closest_to`].
    ///
    /// [`closest_to`]: SimilarityEngine::closest_to
    pub fn analogy_for(
        &self,
        phrase: &str,
        count: Option<usize>,
    ) -> Result<Vec<Neighbor>, QueryError> {
        let terms = phrase::parse(phrase)?;

        let mut query = vec![0.0f32; self.store.dimension()];
        let mut exclude: Vec<usize> = Vec::with_capacity(terms.len());
        for term in &terms {
            let index = self
                .store
                .index_of(&term.word)
                .ok_or_else(|| QueryError::WordNotFound(term.word.clone()))?;
            let row = self.store.row(index);
            match term.sign {
                Sign::Plus => {
                    for (q, x) in query.iter_mut().zip(row) {
                        *q += x;
                    }
                }
                Sign::Minus => {
                    for (q, x) in query.iter_mut().zip(row) {
                        *q -= x;
                    }
                }
            }
            if !exclude.contains(&index) {
                exclude.push(index);
            }
        }
        similarity::normalize(&mut query);

        let k = count.unwrap_or(self.config.default_count);
        debug!("analogy_for: {} terms, k={}", terms.len(), k);

        let hits = ranking::top_k(&self.store, &query, &exclude, k, self.config.scan_workers);
        Ok(self.to_neighbors(hits))
    }

    fn to_neighbors(&self, hits: Vec<Candidate>) -> Vec<Neighbor> {
        hits.into_iter()
            .map(|c| Neighbor {
                word: self.store.word_at(c.index).to_string(),
                score: c.score,
            })
            .collect()
    }
}
