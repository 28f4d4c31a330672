use super::vectorizer::{SparseVector, TfidfVectorizer, VectorizerParams};
use super::RetrievalError;
use intent_refine_config::ExampleStore;
use serde::{Deserialize, Serialize};

/// Best-matching example for one intent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub intent: String,
    /// Cosine similarity in [0, 1]
    pub score: f64,
    pub matched_example: String,
}

/// Fitted vectorizer together with the vectors it produced.
///
/// Rows follow example store order; `examples` and `labels` are parallel
/// to `vectors`. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalIndex {
    vectorizer: TfidfVectorizer,
    vectors: Vec<SparseVector>,
    examples: Vec<String>,
    labels: Vec<String>,
}

impl RetrievalIndex {
    /// Fit and vectorize every example in the store
    pub fn build(store: &ExampleStore, params: VectorizerParams) -> Result<Self, RetrievalError> {
        let (examples, labels): (Vec<String>, Vec<String>) = store
            .flatten()
            .map(|(example, intent)| (example.to_string(), intent.to_string()))
            .unzip();

        if examples.is_empty() {
            return Err(RetrievalError::EmptyStore);
        }

        let vectorizer = TfidfVectorizer::fit(&examples, params)?;
        let vectors = examples.iter().map(|e| vectorizer.transform(e)).collect();

        tracing::info!(
            examples = examples.len(),
            features = vectorizer.vocabulary_size(),
            "Built retrieval index"
        );

        Ok(Self {
            vectorizer,
            vectors,
            examples,
            labels,
        })
    }

    /// Rank intents for `query`, at most one candidate per intent.
    ///
    /// The top `k` rows by similarity are aggregated by intent, keeping the
    /// best row of each. Ties go to the earlier row, then to the intent
    /// seen first.
    pub fn rank(&self, query: &str, k: usize) -> Vec<Candidate> {
        if k == 0 {
            return Vec::new();
        }

        let query_vector = self.vectorizer.transform(&query.to_lowercase());
        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| (row, query_vector.dot(vector).clamp(0.0, 1.0)))
            .collect();

        scored.sort_by(|(a_row, a_score), (b_row, b_score)| {
            b_score.total_cmp(a_score).then_with(|| a_row.cmp(b_row))
        });
        scored.truncate(k);

        let mut candidates: Vec<Candidate> = Vec::new();
        for (row, score) in scored {
            let intent = &self.labels[row];
            match candidates.iter_mut().find(|c| &c.intent == intent) {
                Some(existing) if score > existing.score => {
                    existing.score = score;
                    existing.matched_example = self.examples[row].clone();
                }
                Some(_) => {}
                None => candidates.push(Candidate {
                    intent: intent.clone(),
                    score,
                    matched_example: self.examples[row].clone(),
                }),
            }
        }

        // stable: equal scores keep first-seen order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(k);
        candidates
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
