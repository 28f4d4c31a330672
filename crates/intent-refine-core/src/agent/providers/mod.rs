pub mod mock;
pub mod openai_compat;

pub use mock::{MockProvider, DEFAULT_MOCK_RESPONSE};
pub use openai_compat::OpenAiCompatProvider;
