pub mod agent;
pub mod retrieval;
pub mod service;

pub use intent_refine_config::{config, dataset};
pub use service::RefineService;
