//! Example store: intent labels and their example utterances.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_DATASET: &str = include_str!("../data/intents.toml");

/// Example utterances for one intent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntentExamples {
    pub name: String,
    pub examples: Vec<String>,
}

/// Ordered mapping from intent label to example utterances.
///
/// Order is significant: it fixes the row order of the retrieval index and
/// with it every tie-break downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleStore {
    #[serde(rename = "intent", default)]
    intents: Vec<IntentExamples>,
}

impl ExampleStore {
    /// The dataset compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_DATASET)
    }

    /// Load from a TOML file of `[[intent]]` tables
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        store.validate()?;
        Ok(store)
    }

    /// Load `path` when given, the built-in dataset otherwise
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                tracing::info!("Loading example store from {}", path.display());
                Self::load(path)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let store: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Dataset(e.to_string()))?;
        store.validate()?;
        Ok(store)
    }

    /// Build from `(intent, examples)` pairs, keeping their order
    pub fn from_pairs<I, S, E>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, Vec<E>)>,
        S: Into<String>,
        E: Into<String>,
    {
        let intents = pairs
            .into_iter()
            .map(|(name, examples)| IntentExamples {
                name: name.into(),
                examples: examples.into_iter().map(Into::into).collect(),
            })
            .collect();
        let store = Self { intents };
        store.validate()?;
        Ok(store)
    }

    /// Duplicate labels and intents without examples are rejected.
    /// An empty store is valid here; the index builder refuses it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for intent in &self.intents {
            if intent.name.trim().is_empty() {
                return Err(ConfigError::Dataset("intent with an empty name".into()));
            }
            if !seen.insert(intent.name.as_str()) {
                return Err(ConfigError::Dataset(format!(
                    "duplicate intent '{}'",
                    intent.name
                )));
            }
            if intent.examples.is_empty() {
                return Err(ConfigError::Dataset(format!(
                    "intent '{}' has no examples",
                    intent.name
                )));
            }
        }
        Ok(())
    }

    pub fn intents(&self) -> &[IntentExamples] {
        &self.intents
    }

    /// Number of distinct intent labels
    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }

    /// Total utterances across all intents
    pub fn example_count(&self) -> usize {
        self.intents.iter().map(|i| i.examples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// `(utterance, intent)` pairs in store order
    pub fn flatten(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.intents.iter().flat_map(|intent| {
            intent
                .examples
                .iter()
                .map(move |example| (example.as_str(), intent.name.as_str()))
        })
    }
}
