//! Concrete language-model clients, chosen from configuration at startup.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tripdesk_core::config::{LlmConfig, LlmProvider};

use crate::llm::{CompletionRequest, LlmClient, LlmError, ResilientLlm};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

/// Builds the configured client wrapped with timeout and retry handling.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let inner: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LlmError::auth("gemini provider requires an api key"))?;
            Arc::new(GeminiClient::new(
                api_key,
                config.model.clone(),
                config.base_url.as_deref(),
                timeout,
            )?)
        }
        LlmProvider::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| LlmError::invalid_request("ollama provider requires a base url"))?;
            Arc::new(OllamaClient::new(base_url, config.model.clone(), timeout)?)
        }
        LlmProvider::Offline => return Ok(Arc::new(OfflineLlm)),
    };

    Ok(Arc::new(ResilientLlm::new(inner, timeout, config.max_retries)))
}

fn http_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| LlmError::network(format!("could not build http client: {error}")))
}

/// Drops the request URL from the message so endpoints never reach logs.
fn map_transport_error(error: reqwest::Error) -> LlmError {
    let error = error.without_url();
    if error.is_timeout() {
        LlmError::timeout(format!("request timed out: {error}"))
    } else if error.is_connect() {
        LlmError::network(format!("connection failed: {error}"))
    } else {
        LlmError::network(format!("request failed: {error}"))
    }
}

fn map_status(status: StatusCode, message: &str) -> LlmError {
    match status.as_u16() {
        400 => LlmError::invalid_request(format!("invalid request: {message}")),
        401 | 403 => LlmError::auth(format!("authentication failed: {message}")),
        404 => LlmError::invalid_request(format!("model not found: {message}")),
        429 => LlmError::quota(format!("quota or rate limit exceeded: {message}")),
        500..=599 => LlmError::server(format!("server error {status}: {message}")),
        _ => LlmError::invalid_response(format!("unexpected status {status}: {message}")),
    }
}

/// Google Generative Language `generateContent`.
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: SecretString,
        model: String,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.unwrap_or(GEMINI_BASE_URL).trim_end_matches('/').to_string();
        Ok(Self { client: http_client(timeout)?, api_key, model, base_url })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn translate_request(request: &CompletionRequest) -> GeminiRequest {
        // System text rides in the single user turn.
        let text = if request.system.is_empty() {
            request.prompt.clone()
        } else {
            format!("{}\n\n{}", request.system, request.prompt)
        };
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .header(GEMINI_KEY_HEADER, self.api_key.expose_secret())
            .json(&Self::translate_request(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| {
                LlmError::network(format!("failed to read response: {}", error.without_url()))
            })?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|error| error.error.message)
                .unwrap_or(body);
            return Err(map_status(status, &message));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|error| {
            LlmError::invalid_response(format!("failed to parse response: {error}"))
        })?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::invalid_response("response held no candidate text"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Local Ollama server, `/api/chat` without streaming.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "stream": false,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| {
                LlmError::network(format!("failed to read response: {}", error.without_url()))
            })?;
        if !status.is_success() {
            return Err(map_status(status, &text));
        }

        let parsed: OllamaResponse = serde_json::from_str(&text).map_err(|error| {
            LlmError::invalid_response(format!("failed to parse response: {error}"))
        })?;
        let content = parsed.message.content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::invalid_response("response held no message content"));
        }
        Ok(content)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// No model at all. Every component falls back to its deterministic path.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineLlm;

#[async_trait]
impl LlmClient for OfflineLlm {
    fn model(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
        Err(LlmError::unavailable("no language model configured"))
    }
}

/// Replays queued responses in order and records every request.
/// Once the queue is drained every call fails as `Unavailable`.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: Result<String, LlmError>) {
        match self.responses.lock() {
            Ok(mut responses) => responses.push_back(response),
            Err(poisoned) => poisoned.into_inner().push_back(response),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        let next = match self.responses.lock() {
            Ok(mut responses) => responses.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| Err(LlmError::unavailable("script exhausted")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;
    use secrecy::SecretString;
    use tripdesk_core::config::{AppConfig, LlmProvider};

    use super::{build_client, map_status, GeminiClient, OfflineLlm, ScriptedLlm};
    use crate::llm::{CompletionRequest, LlmClient, LlmError, LlmErrorKind, LlmRole};

    #[test]
    fn http_statuses_map_to_distinct_kinds() {
        assert_eq!(map_status(StatusCode::UNAUTHORIZED, "x").kind, LlmErrorKind::Auth);
        assert_eq!(map_status(StatusCode::FORBIDDEN, "x").kind, LlmErrorKind::Auth);
        assert_eq!(map_status(StatusCode::TOO_MANY_REQUESTS, "x").kind, LlmErrorKind::Quota);
        assert_eq!(map_status(StatusCode::BAD_GATEWAY, "x").kind, LlmErrorKind::Server);
        assert_eq!(map_status(StatusCode::BAD_REQUEST, "x").kind, LlmErrorKind::InvalidRequest);
    }

    #[test]
    fn gemini_request_folds_system_text_into_user_turn() {
        let request = CompletionRequest::for_role(LlmRole::Extractor, "be precise", "hello");
        let translated = serde_json::to_value(GeminiClient::translate_request(&request))
            .expect("serialize request");
        assert_eq!(translated["contents"][0]["role"], "user");
        assert_eq!(translated["contents"][0]["parts"][0]["text"], "be precise\n\nhello");
        assert_eq!(translated["generationConfig"]["maxOutputTokens"], 100);
    }

    #[tokio::test]
    async fn offline_client_is_unavailable() {
        let error = OfflineLlm
            .complete(&CompletionRequest::for_role(LlmRole::Composer, "", "hi"))
            .await
            .expect_err("offline never answers");
        assert_eq!(error.kind, LlmErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn scripted_client_replays_then_runs_dry() {
        let scripted = ScriptedLlm::new(vec![Ok("first".to_string())]);
        scripted.push(Err(LlmError::quota("out of credit")));
        let request = CompletionRequest::for_role(LlmRole::Classifier, "", "x");

        assert_eq!(scripted.complete(&request).await, Ok("first".to_string()));
        assert_eq!(
            scripted.complete(&request).await.map_err(|error| error.kind),
            Err(LlmErrorKind::Quota)
        );
        assert_eq!(
            scripted.complete(&request).await.map_err(|error| error.kind),
            Err(LlmErrorKind::Unavailable)
        );
        assert_eq!(scripted.requests().len(), 3);
    }

    #[test]
    fn offline_config_builds_offline_client() {
        let config = AppConfig::offline();
        let client = build_client(&config.llm).expect("offline client");
        assert_eq!(client.model(), "offline");
    }

    #[test]
    fn gemini_config_without_key_is_refused() {
        let mut config = AppConfig::offline();
        config.llm.provider = LlmProvider::Gemini;
        let error = build_client(&config.llm).err().expect("missing key");
        assert_eq!(error.kind, LlmErrorKind::Auth);
    }

    #[tokio::test]
    async fn transport_errors_never_carry_the_api_key() {
        let client = GeminiClient::new(
            SecretString::from("SUPERSECRETKEY123"),
            "gemini-2.5-flash".to_string(),
            Some("http://127.0.0.1:9"),
            Duration::from_secs(2),
        )
        .expect("client builds");

        let error = client
            .complete(&CompletionRequest::for_role(LlmRole::Classifier, "", "hello"))
            .await
            .expect_err("nothing listens on the discard port");

        assert!(matches!(error.kind, LlmErrorKind::Network | LlmErrorKind::Timeout));
        assert!(!error.to_string().contains("SUPERSECRETKEY123"), "leaked: {error}");
        assert!(!error.to_string().contains("127.0.0.1:9/models"), "url kept: {error}");
    }
}
