//! Refine service: retrieval followed by model disambiguation.

use crate::agent::{create_provider, Decision, Disambiguator, GenerationConfig, PromptTemplate};
use crate::config::AppConfig;
use crate::dataset::ExampleStore;
use crate::retrieval::{Candidate, CacheStatus, IndexCache, RetrievalIndex, VectorizerParams};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

/// Rows considered per query unless configured otherwise
pub const DEFAULT_TOP_K: usize = 3;

/// Read-only request pipeline shared by all handlers
#[derive(Clone)]
pub struct RefineService {
    index: Arc<RetrievalIndex>,
    disambiguator: Disambiguator,
    top_k: usize,
    intent_count: usize,
    example_count: usize,
}

impl RefineService {
    pub fn new(store: &ExampleStore, index: RetrievalIndex, disambiguator: Disambiguator) -> Self {
        Self {
            index: Arc::new(index),
            disambiguator,
            top_k: DEFAULT_TOP_K,
            intent_count: store.intent_count(),
            example_count: store.example_count(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Assemble the service from configuration.
    ///
    /// Order matters: the provider (and its API key) is resolved before the
    /// index is built, so configuration errors surface before any work.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let provider = create_provider(&config.model).context("Failed to create model provider")?;

        let template = match config.model.prompt_template_path {
            Some(ref path) => PromptTemplate::from_file(path).with_context(|| {
                format!("Failed to read prompt template {}", path.display())
            })?,
            None => PromptTemplate::default(),
        };

        let disambiguator = Disambiguator::new(provider)
            .with_template(template)
            .with_generation_config(GenerationConfig {
                temperature: Some(config.model.temperature),
                max_tokens: Some(config.model.max_tokens),
                top_p: None,
                json_response: true,
            });

        let (store, index, _) = load_index(config)?;

        Ok(Self::new(&store, index, disambiguator).with_top_k(config.retrieval.top_k))
    }

    /// Candidates for `text` without calling the model
    pub fn candidates(&self, text: &str) -> Vec<Candidate> {
        self.index.rank(text, self.top_k)
    }

    /// Rank, then disambiguate; model failures yield the fallback decision
    pub async fn refine(&self, text: &str) -> Decision {
        let start = Instant::now();
        let candidates = self.candidates(text);
        let search_ms = start.elapsed().as_secs_f64() * 1000.0;

        let model_start = Instant::now();
        let decision = self.disambiguator.decide_or_fallback(text, &candidates).await;
        let model_ms = model_start.elapsed().as_secs_f64() * 1000.0;
        let total_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            intent = %decision.intent,
            top_candidate = candidates.first().map(|c| c.intent.as_str()).unwrap_or("-"),
            search_ms = %format!("{search_ms:.1}"),
            model_ms = %format!("{model_ms:.0}"),
            total_ms = %format!("{total_ms:.0}"),
            "Refined"
        );

        decision
    }

    pub fn index(&self) -> &RetrievalIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Distinct intents in the example store
    pub fn intent_count(&self) -> usize {
        self.intent_count
    }

    /// Total example utterances in the store
    pub fn example_count(&self) -> usize {
        self.example_count
    }
}

/// Load the example store and its index through the cache
pub fn load_index(config: &AppConfig) -> Result<(ExampleStore, RetrievalIndex, CacheStatus)> {
    let store = ExampleStore::load_or_builtin(config.retrieval.dataset_path.as_deref())
        .context("Failed to load example store")?;
    tracing::info!(
        intents = store.intent_count(),
        examples = store.example_count(),
        "Example store loaded"
    );

    let cache = IndexCache::new(&config.retrieval.cache_dir);
    let (index, status) = cache
        .load_or_build(&store, VectorizerParams::from(&config.retrieval))
        .context("Failed to prepare retrieval index")?;

    Ok((store, index, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::providers::MockProvider;
    use crate::agent::{ProviderError, CLARIFY_INTENT};

    fn flashlight_store() -> ExampleStore {
        ExampleStore::from_pairs(vec![
            ("FLASHLIGHT_ON", vec!["flashlight on", "torch on"]),
            ("FLASHLIGHT_OFF", vec!["flashlight off", "torch off"]),
        ])
        .unwrap()
    }

    fn service_with(provider: MockProvider) -> RefineService {
        let store = flashlight_store();
        let index = RetrievalIndex::build(&store, VectorizerParams::default()).unwrap();
        RefineService::new(&store, index, Disambiguator::new(Arc::new(provider)))
    }

    #[test]
    fn test_counts() {
        let service = service_with(MockProvider::default());
        assert_eq!(service.intent_count(), 2);
        assert_eq!(service.example_count(), 4);
        assert_eq!(service.top_k(), DEFAULT_TOP_K);
    }

    #[test]
    fn test_candidates_bounded_by_intents() {
        let service = service_with(MockProvider::default());
        let candidates = service.candidates("turn on the flashlight please");
        assert!(candidates.len() <= 2);
        assert_eq!(candidates[0].intent, "FLASHLIGHT_ON");
    }

    #[tokio::test]
    async fn test_refine_uses_model_decision() {
        let service = service_with(MockProvider::new(
            r#"{"intent":"FLASHLIGHT_ON","reply":"Flashlight on","entities":{}}"#,
        ));
        let decision = service.refine("torch on").await;
        assert_eq!(decision.intent, "FLASHLIGHT_ON");
        assert_eq!(decision.reply, "Flashlight on");
    }

    #[tokio::test]
    async fn test_refine_falls_back_on_timeout() {
        let provider = MockProvider::failing(ProviderError::Timeout);
        let service = service_with(provider.clone());

        let decision = service.refine("torch on").await;
        assert_eq!(decision.intent, CLARIFY_INTENT);
        assert!(!decision.reply.is_empty());
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_from_config_with_mock_provider() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.model.provider = "mock".into();
        config.retrieval.cache_dir = dir.path().to_path_buf();
        config.retrieval.top_k = 5;

        let service = RefineService::from_config(&config).unwrap();
        assert_eq!(service.intent_count(), 44);
        assert_eq!(service.example_count(), 208);
        assert_eq!(service.top_k(), 5);

        let (_, _, status) = load_index(&config).unwrap();
        assert_eq!(status, CacheStatus::Hit);
    }

    #[test]
    fn test_from_config_unknown_provider_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.model.provider = "nope".into();
        config.retrieval.cache_dir = dir.path().to_path_buf();

        assert!(RefineService::from_config(&config).is_err());
        // provider is resolved before any index is written
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_from_config_empty_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("empty.toml");
        std::fs::write(&dataset, "").unwrap();

        let mut config = AppConfig::default();
        config.model.provider = "mock".into();
        config.retrieval.cache_dir = dir.path().join("cache");
        config.retrieval.dataset_path = Some(dataset);

        let err = RefineService::from_config(&config).err().unwrap();
        assert!(format!("{err:#}").contains("empty"));
    }
}
