use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Which component is asking. Each role carries its own sampling settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmRole {
    Classifier,
    Extractor,
    Composer,
}

impl LlmRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classifier => "classifier",
            Self::Extractor => "extractor",
            Self::Composer => "composer",
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            Self::Classifier => 0.1,
            Self::Extractor => 0.2,
            Self::Composer => 0.7,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            Self::Classifier => 50,
            Self::Extractor => 100,
            Self::Composer => 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub role: LlmRole,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn for_role(role: LlmRole, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            role,
            system: system.into(),
            prompt: prompt.into(),
            temperature: role.temperature(),
            max_tokens: role.max_tokens(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Quota, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Server, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidResponse, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unavailable, message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 401/403
    Auth,
    /// 429 or exhausted quota
    Quota,
    Timeout,
    Network,
    /// 5xx
    Server,
    /// 400
    InvalidRequest,
    /// Body could not be decoded or held no text
    InvalidResponse,
    /// No model configured
    Unavailable,
}

impl LlmErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Server | Self::Timeout)
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Bounds every call with a timeout and retries transient failures.
pub struct ResilientLlm {
    inner: Arc<dyn LlmClient>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl ResilientLlm {
    pub fn new(inner: Arc<dyn LlmClient>, timeout: Duration, max_retries: u32) -> Self {
        Self { inner, timeout, max_retries, backoff: Duration::from_millis(250) }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl LlmClient for ResilientLlm {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            let call = tokio::time::timeout(self.timeout, self.inner.complete(request));
            let result = match call.await {
                Ok(result) => result,
                Err(_) => Err(LlmError::timeout(format!(
                    "no response within {}s",
                    self.timeout.as_secs_f32()
                ))),
            };

            match result {
                Err(error) if error.kind.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "llm.retry",
                        role = request.role.as_str(),
                        model = self.inner.model(),
                        attempt,
                        error = %error,
                        "retrying model call"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                other => return other,
            }
        }
    }
}
