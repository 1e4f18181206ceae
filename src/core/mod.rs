pub mod analysis;
pub mod backup;
pub mod dedup;
pub mod engine;
pub mod enrichment;
pub mod import;
pub mod key_pool;
pub mod persist;
pub mod rate_limit;
pub mod resilient;
pub mod time_resolver;

pub use crate::domain::model::{EnrichedJob, ImportStats, InsertStats, JobAnalysis, JobRecord};
pub use crate::domain::ports::{JobStore, Pipeline, Storage};
pub use crate::utils::error::Result;
