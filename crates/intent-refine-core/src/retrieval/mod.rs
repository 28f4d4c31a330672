//! Lexical candidate retrieval
//!
//! A TF-IDF index over the example store, ranked by cosine similarity and
//! persisted to a content-addressed cache.

pub mod cache;
pub mod index;
pub mod vectorizer;

pub use cache::{CacheStatus, IndexCache};
pub use index::{Candidate, RetrievalIndex};
pub use vectorizer::{SparseVector, TfidfVectorizer, VectorizerParams};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, loading or persisting an index
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("example store is empty; nothing to index")]
    EmptyStore,

    #[error("no terms left after pruning {examples} examples")]
    EmptyVocabulary { examples: usize },

    #[error("index cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index cache at {path} is unusable: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to serialize index: {0}")]
    Serialization(String),
}

