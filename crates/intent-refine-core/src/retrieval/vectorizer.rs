//! TF-IDF vectorizer over word unigrams and bigrams.

use super::RetrievalError;
use intent_refine_config::RetrievalConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Longest n-gram produced by the analyzer
const MAX_NGRAM: usize = 2;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

/// Fitting parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorizerParams {
    /// Vocabulary cap, most frequent terms first
    pub max_features: usize,
    /// Minimum document count for a term
    pub min_df: usize,
    /// Maximum document fraction for a term
    pub max_df: f64,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: 500,
            min_df: 1,
            max_df: 0.95,
        }
    }
}

impl From<&RetrievalConfig> for VectorizerParams {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            max_features: config.max_features,
            min_df: config.min_df,
            max_df: config.max_df,
        }
    }
}

/// Sparse vector with ascending indices
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f64>,
}

impl SparseVector {
    /// Build from `(index, value)` pairs sorted by index
    fn from_sorted(entries: impl IntoIterator<Item = (u32, f64)>) -> Self {
        let (indices, values) = entries.into_iter().unzip();
        Self { indices, values }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Dot product by merging the two index lists
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in &mut self.values {
                *value /= norm;
            }
        }
    }
}

/// Fitted TF-IDF model: term vocabulary plus smoothed IDF weights.
///
/// Text is accent-stripped (NFKD, combining marks dropped) and lowercased,
/// split into tokens of two or more word characters, and expanded into
/// unigrams and space-joined bigrams. Vectors are L2-normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    /// term -> column, assigned in lexicographic term order
    vocabulary: BTreeMap<String, u32>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit the vocabulary and IDF weights over `documents`
    pub fn fit<S: AsRef<str>>(
        documents: &[S],
        params: VectorizerParams,
    ) -> Result<Self, RetrievalError> {
        let n_docs = documents.len();
        if n_docs == 0 {
            return Err(RetrievalError::EmptyStore);
        }

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut corpus_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let terms = analyze(doc.as_ref());
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *corpus_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Upper bound never drops below min_df so tiny stores still fit.
        let max_doc_count = (params.max_df * n_docs as f64).max(params.min_df as f64);
        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= params.min_df && (*df as f64) <= max_doc_count)
            .collect();

        if kept.len() > params.max_features {
            kept.sort_by(|(a_term, a_df), (b_term, b_df)| {
                b_df.cmp(a_df)
                    .then_with(|| corpus_freq[b_term].cmp(&corpus_freq[a_term]))
                    .then_with(|| a_term.cmp(b_term))
            });
            kept.truncate(params.max_features);
        }

        if kept.is_empty() {
            return Err(RetrievalError::EmptyVocabulary { examples: n_docs });
        }

        kept.sort_by(|(a, _), (b, _)| a.cmp(b));
        let n = n_docs as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (column, (term, df)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, column as u32);
        }

        Ok(Self {
            params,
            vocabulary,
            idf,
        })
    }

    /// Vectorize one document; out-of-vocabulary terms are dropped
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<u32, f64> = BTreeMap::new();
        for term in analyze(document) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut vector = SparseVector::from_sorted(
            counts
                .into_iter()
                .map(|(column, count)| (column, count * self.idf[column as usize])),
        );
        vector.normalize();
        vector
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Terms in column order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.vocabulary.keys().map(String::as_str)
    }
}

/// Accent-strip and lowercase
fn preprocess(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Unigrams followed by bigrams
fn analyze(text: &str) -> Vec<String> {
    let normalized = preprocess(text);
    let tokens: Vec<&str> = token_pattern()
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    for n in 2..=MAX_NGRAM {
        terms.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_unigrams_and_bigrams() {
        let terms = analyze("Turn ON the flashlight");
        assert_eq!(
            terms,
            vec![
                "turn",
                "on",
                "the",
                "flashlight",
                "turn on",
                "on the",
                "the flashlight"
            ]
        );
    }

    #[test]
    fn test_analyze_drops_single_char_tokens() {
        let terms = analyze("i can't see");
        assert_eq!(terms, vec!["can", "see", "can see"]);
    }

    #[test]
    fn test_preprocess_strips_accents() {
        assert_eq!(preprocess("Café Crème"), "cafe creme");
        assert_eq!(analyze("NAÏVE"), vec!["naive"]);
    }

    #[test]
    fn test_fit_prunes_terms_in_every_document() {
        let docs = ["flashlight on", "flashlight off"];
        let vectorizer = TfidfVectorizer::fit(&docs, VectorizerParams::default()).unwrap();

        assert!(!vectorizer.contains_term("flashlight"));
        assert!(vectorizer.contains_term("on"));
        assert!(vectorizer.contains_term("flashlight off"));
        assert_eq!(vectorizer.vocabulary_size(), 4);
    }

    #[test]
    fn test_vocabulary_is_lexicographic() {
        let docs = ["zebra apple", "mango"];
        let vectorizer = TfidfVectorizer::fit(&docs, VectorizerParams::default()).unwrap();
        let terms: Vec<&str> = vectorizer.terms().collect();
        assert_eq!(terms, vec!["apple", "mango", "zebra", "zebra apple"]);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let docs = ["alpha beta", "alpha gamma", "alpha delta", "omega"];
        let params = VectorizerParams {
            max_features: 1,
            ..Default::default()
        };
        let vectorizer = TfidfVectorizer::fit(&docs, params).unwrap();
        let terms: Vec<&str> = vectorizer.terms().collect();
        assert_eq!(terms, vec!["alpha"]);
    }

    #[test]
    fn test_single_document_store_fits() {
        let vectorizer =
            TfidfVectorizer::fit(&["open camera"], VectorizerParams::default()).unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 3);
    }

    #[test]
    fn test_empty_documents_is_error() {
        let docs: [&str; 0] = [];
        let result = TfidfVectorizer::fit(&docs, VectorizerParams::default());
        assert!(matches!(result, Err(RetrievalError::EmptyStore)));
    }

    #[test]
    fn test_no_terms_is_error() {
        let result = TfidfVectorizer::fit(&["a", "b"], VectorizerParams::default());
        assert!(matches!(
            result,
            Err(RetrievalError::EmptyVocabulary { examples: 2 })
        ));
    }

    #[test]
    fn test_transform_is_unit_length() {
        let docs = ["open camera", "take a selfie", "record video"];
        let vectorizer = TfidfVectorizer::fit(&docs, VectorizerParams::default()).unwrap();
        let vector = vectorizer.transform("open the camera now");
        assert!((vector.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_out_of_vocabulary_is_empty() {
        let docs = ["open camera", "record video"];
        let vectorizer = TfidfVectorizer::fit(&docs, VectorizerParams::default()).unwrap();
        let vector = vectorizer.transform("xyzzy quantum");
        assert!(vector.is_empty());
        assert_eq!(vector.norm(), 0.0);
    }

    #[test]
    fn test_idf_weights_rare_terms_higher() {
        let docs = ["call mom", "call john", "text maria"];
        let vectorizer = TfidfVectorizer::fit(&docs, VectorizerParams::default()).unwrap();
        let vector = vectorizer.transform("call mom");
        // columns: "call", "call mom", "mom"
        assert_eq!(vector.nnz(), 3);
        let call = vector.values()[0];
        let mom = vector.values()[2];
        assert!(mom > call);
    }

    #[test]
    fn test_sparse_dot() {
        let a = SparseVector::from_sorted(vec![(0, 1.0), (2, 2.0)]);
        let b = SparseVector::from_sorted(vec![(1, 5.0), (2, 3.0)]);
        assert_eq!(a.dot(&b), 6.0);
        assert_eq!(a.dot(&SparseVector::default()), 0.0);
    }
}
