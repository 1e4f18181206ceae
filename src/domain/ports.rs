use crate::domain::model::{CompanyRow, EnrichedJob, InsertStats, JobAnalysis, JobRecord};
use crate::utils::error::{Result, ScoutError};
use async_trait::async_trait;
use thiserror::Error;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Batch-oriented extract/transform/load contract driven by `ImportEngine`.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<JobRecord>>;
    async fn transform(&self, batch: Vec<JobRecord>) -> Result<Vec<EnrichedJob>>;
    async fn load(&self, batch: Vec<EnrichedJob>) -> Result<InsertStats>;
}

/// Error reported by a remote backend for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal failure of a key-rotating call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    #[error("all API keys rejected after {attempts} attempts: {last_error}")]
    Exhausted { attempts: usize, last_error: String },

    #[error("request failed: {message}")]
    Rejected { message: String },
}

impl From<CallFailure> for ScoutError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::Exhausted {
                attempts,
                last_error,
            } => ScoutError::KeyPoolExhausted {
                attempts,
                last_error,
            },
            CallFailure::Rejected { message } => ScoutError::RemoteRejected { message },
        }
    }
}

/// A remote call that needs an API key per attempt.
#[async_trait]
pub trait KeyedBackend: Send + Sync {
    type Request: Send + Sync;
    type Response: Send;

    async fn invoke(
        &self,
        api_key: &str,
        request: &Self::Request,
    ) -> std::result::Result<Self::Response, BackendError>;
}

/// Prompt sent to a text-generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub job_title: String,
    pub content: String,
}

#[async_trait]
pub trait JobAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> std::result::Result<JobAnalysis, CallFailure>;
}

#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, CallFailure>;
}

/// Relational-style store for jobs and companies.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn job_ids(&self) -> Result<Vec<String>>;
    async fn web_ids(&self) -> Result<Vec<String>>;
    async fn companies(&self) -> Result<Vec<CompanyRow>>;

    /// Writes the job, and the company when it is new, as one unit: on error
    /// nothing from this call is visible.
    async fn insert_job(&self, job: &JobRecord, new_company: Option<&CompanyRow>) -> Result<()>;
}
