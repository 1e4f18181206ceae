//! Key-rotating wrapper around a remote backend.
//!
//! Credential and quota failures move to the next key in the pool until every
//! key has been tried once. Any other failure ends the call right away without
//! rotating. The pool cursor outlives a single call, so later calls start with
//! the last key that was in use.

use crate::core::key_pool::{mask_key, KeyPool};
use crate::core::rate_limit::CallSpacing;
use crate::domain::ports::{CallFailure, KeyedBackend, TextEmbedder};
use async_trait::async_trait;
use std::sync::Arc;

/// Message fragments that mark an error as credential or quota related.
pub const DEFAULT_CREDENTIAL_MARKERS: &[&str] = &[
    "api key",
    "quota",
    "rate limit",
    "permission",
    "unauthorized",
    "authentication",
    "exhausted",
];

#[derive(Debug, Clone)]
pub struct CredentialMatcher {
    markers: Vec<String>,
}

impl Default for CredentialMatcher {
    fn default() -> Self {
        Self {
            markers: DEFAULT_CREDENTIAL_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl CredentialMatcher {
    pub fn with_marker(mut self, marker: &str) -> Self {
        self.markers.push(marker.to_lowercase());
        self
    }

    pub fn is_credential_error(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.markers.iter().any(|m| message.contains(m.as_str()))
    }
}

/// Where a single call stands in the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Ready(usize),
    Retrying { key_index: usize, attempts: usize },
    Exhausted,
}

pub struct ResilientClient<B> {
    backend: B,
    pool: Arc<KeyPool>,
    spacing: Option<Arc<CallSpacing>>,
    matcher: CredentialMatcher,
    label: String,
}

impl<B: KeyedBackend> ResilientClient<B> {
    pub fn new(backend: B, pool: Arc<KeyPool>) -> Self {
        Self {
            backend,
            pool,
            spacing: None,
            matcher: CredentialMatcher::default(),
            label: "remote".to_string(),
        }
    }

    pub fn with_spacing(mut self, spacing: Arc<CallSpacing>) -> Self {
        self.spacing = Some(spacing);
        self
    }

    pub fn with_matcher(mut self, matcher: CredentialMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn pool(&self) -> &Arc<KeyPool> {
        &self.pool
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn try_call(
        &self,
        request: &B::Request,
    ) -> std::result::Result<B::Response, CallFailure> {
        self.try_call_traced(request).await.0
    }

    /// Like `try_call`, also returning every state the call passed through.
    pub async fn try_call_traced(
        &self,
        request: &B::Request,
    ) -> (std::result::Result<B::Response, CallFailure>, Vec<KeyState>) {
        let max_attempts = self.pool.len();
        let mut key_index = self.pool.current_index();
        let mut attempts = 0;
        let mut states = vec![KeyState::Ready(key_index)];

        loop {
            if let Some(spacing) = &self.spacing {
                spacing.wait().await;
            }

            let key = self.pool.key_at(key_index);
            tracing::debug!("{}: attempting with API key {}", self.label, mask_key(key));

            let err = match self.backend.invoke(key, request).await {
                Ok(response) => return (Ok(response), states),
                Err(err) => err,
            };

            if !self.matcher.is_credential_error(&err.message) {
                tracing::warn!("{}: non-credential error: {}", self.label, err);
                return (
                    Err(CallFailure::Rejected {
                        message: err.message,
                    }),
                    states,
                );
            }

            attempts += 1;
            tracing::warn!("{}: API key error ({}): {}", self.label, mask_key(key), err);

            if attempts >= max_attempts {
                states.push(KeyState::Exhausted);
                tracing::error!(
                    "{}: exhausted all {} API keys",
                    self.label,
                    max_attempts
                );
                return (
                    Err(CallFailure::Exhausted {
                        attempts,
                        last_error: err.message,
                    }),
                    states,
                );
            }

            key_index = self.pool.advance_from(key_index);
            states.push(KeyState::Retrying {
                key_index,
                attempts,
            });
            tracing::info!(
                "{}: switching to next API key: {}",
                self.label,
                mask_key(self.pool.key_at(key_index))
            );
        }
    }

    /// Never fails: any terminal failure is logged and replaced by the
    /// response type's default.
    pub async fn call(&self, request: &B::Request) -> B::Response
    where
        B::Response: Default,
    {
        match self.try_call(request).await {
            Ok(response) => response,
            Err(failure) => {
                tracing::warn!("{}: returning empty result ({})", self.label, failure);
                B::Response::default()
            }
        }
    }
}

#[async_trait]
impl<B> TextEmbedder for ResilientClient<B>
where
    B: KeyedBackend<Request = String, Response = Vec<f32>>,
{
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, CallFailure> {
        let values = self.try_call(&text.to_string()).await?;
        if values.is_empty() {
            tracing::warn!("{}: no embedding was returned", self.label);
        }
        Ok(values)
    }
}
