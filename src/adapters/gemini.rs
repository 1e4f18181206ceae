//! Gemini REST backends for text generation and embeddings.

use crate::domain::ports::{BackendError, GenerateRequest, KeyedBackend};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_HEADER: &str = "x-goog-api-key";

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::new(format!("request timed out: {}", err))
        } else {
            BackendError::new(format!("transport error: {}", err))
        }
    }
}

/// Wording chosen so credential and quota statuses classify as rotatable.
fn describe_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "permission denied",
        StatusCode::TOO_MANY_REQUESTS => "rate limit exceeded",
        s if s.is_server_error() => "server error",
        _ => "request rejected",
    }
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedBody<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ReplyContent>,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedReply {
    embedding: Option<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// Shared HTTP client for one Gemini-compatible endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(
        &self,
        api_key: &str,
        path: &str,
        body: &B,
    ) -> std::result::Result<R, BackendError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::new(format!(
                "{} ({}): {}",
                describe_status(status),
                status.as_u16(),
                detail.trim()
            )));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| BackendError::new(format!("malformed response body: {}", e)))
    }
}

/// `models/{model}:generateContent`
#[derive(Debug, Clone)]
pub struct GeminiGenerate {
    client: GeminiClient,
    model: String,
}

impl GeminiGenerate {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl KeyedBackend for GeminiGenerate {
    type Request = GenerateRequest;
    type Response = String;

    async fn invoke(
        &self,
        api_key: &str,
        request: &GenerateRequest,
    ) -> std::result::Result<String, BackendError> {
        let body = GenerateBody {
            system_instruction: (!request.system_instruction.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            }),
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
        };

        let reply: GenerateReply = self
            .client
            .post(
                api_key,
                &format!("models/{}:generateContent", self.model),
                &body,
            )
            .await?;

        Ok(reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }
}

/// `models/{model}:embedContent` with the classification task type.
#[derive(Debug, Clone)]
pub struct GeminiEmbed {
    client: GeminiClient,
    model: String,
}

impl GeminiEmbed {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl KeyedBackend for GeminiEmbed {
    type Request = String;
    type Response = Vec<f32>;

    async fn invoke(
        &self,
        api_key: &str,
        text: &String,
    ) -> std::result::Result<Vec<f32>, BackendError> {
        let body = EmbedBody {
            model: format!("models/{}", self.model),
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type: "CLASSIFICATION",
        };

        let reply: EmbedReply = self
            .client
            .post(
                api_key,
                &format!("models/{}:embedContent", self.model),
                &body,
            )
            .await?;

        Ok(reply.embedding.map(|e| e.values).unwrap_or_default())
    }
}
