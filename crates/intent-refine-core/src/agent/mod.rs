pub mod disambiguator;
pub mod factory;
pub mod model;
pub mod prompt;
pub mod providers;

pub use disambiguator::{Decision, DisambiguationError, Disambiguator, CLARIFY_INTENT};
pub use factory::create_provider;
pub use model::{
    ChatMessage, ChatRole, GenerationConfig, ModelProvider, ModelResponse, ProviderError,
    ProviderKind, ProviderMetadata, TokenUsage,
};
pub use prompt::PromptTemplate;
