pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::LocalStorage;
pub use config::AppConfig;
pub use crate::core::dedup::{dedup_key, DedupKey};
pub use crate::core::engine::ImportEngine;
pub use crate::core::import::ImportPipeline;
pub use crate::core::resilient::ResilientClient;
pub use crate::core::time_resolver::{resolve, resolve_now};
pub use utils::error::{Result, ScoutError};
