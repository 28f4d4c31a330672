pub use intent_refine_api::api;
pub use intent_refine_config::{config, dataset};
pub use intent_refine_core::{agent, retrieval, service};

pub mod cli;
