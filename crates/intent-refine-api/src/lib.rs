pub mod api;

pub use intent_refine_core::{agent, config, dataset, retrieval, service};
