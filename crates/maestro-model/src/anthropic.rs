//! Anthropic Messages API model.
//!
//! Rate limits (429), server errors (5xx, including 529 overloaded) and
//! network failures are retried with doubling backoff. A `retry-after`
//! header from the server replaces the computed wait, within
//! `RetryConfig::max_backoff`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    planning::PlanningRequest,
    step::Action,
};
use maestro_core::traits::LanguageModel;

use crate::{
    api::{ApiErrorBody, ApiRequest, ApiResponse},
    convert,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

// ── Retry policy ──────────────────────────────────────────────────────────────

/// How many times a planning call is retried, and how long to wait between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry. Doubles on every further retry.
    pub initial_backoff: Duration,
    /// Ceiling on any wait, including one requested by the server.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Wait before retry number `retry` (zero-based).
    fn backoff(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        retry_after
            .unwrap_or_else(|| self.initial_backoff.saturating_mul(factor))
            .min(self.max_backoff)
    }
}

// ── Attempt errors ────────────────────────────────────────────────────────────

/// Why a single attempt failed.
#[derive(Debug)]
enum CallError {
    Status {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },
    Network(String),
    Decode(String),
}

impl CallError {
    fn is_retryable(&self) -> bool {
        match self {
            CallError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            CallError::Network(_) => true,
            CallError::Decode(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CallError::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Status { status, message, .. } => write!(f, "HTTP {status}: {message}"),
            CallError::Network(e) => write!(f, "network error: {e}"),
            CallError::Decode(e) => write!(f, "malformed response: {e}"),
        }
    }
}

// ── Model ───────────────────────────────────────────────────────────────────────

/// A `LanguageModel` backed by the Anthropic Messages API.
pub struct AnthropicModel {
    api_key: String,
    model_id: String,
    base_url: String,
    client: reqwest::Client,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryConfig,
}

impl AnthropicModel {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_id: model_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            retry: RetryConfig::default(),
        }
    }

    /// Point the model at another host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_request(&self, request: &PlanningRequest) -> ApiRequest {
        ApiRequest {
            model: self.model_id.clone(),
            messages: convert::messages(request),
            system: Some(convert::system_prompt(request)),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: convert::tools(request),
        }
    }

    async fn send_once(&self, body: &ApiRequest) -> Result<ApiResponse, CallError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| CallError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Only the delay-seconds form; HTTP dates fall back to backoff.
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| format!("{}: {}", b.error.error_type, b.error.message))
                .unwrap_or(text);
            return Err(CallError::Status {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        response.json::<ApiResponse>().await.map_err(|e| CallError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn plan(&self, request: &PlanningRequest) -> MaestroResult<Action> {
        let body = self.build_request(request);
        let attempts = self.retry.max_retries + 1;

        for attempt in 0..attempts {
            match self.send_once(&body).await {
                Ok(response) => {
                    debug!(
                        agent = %request.agent,
                        message_id = %response.id,
                        model = %response.model,
                        stop_reason = response.stop_reason.as_deref().unwrap_or(""),
                        "model responded"
                    );
                    return convert::parse_action(response);
                }
                Err(CallError::Decode(reason)) => {
                    return Err(MaestroError::validation(format!("malformed model response: {reason}")));
                }
                Err(err) if !err.is_retryable() => {
                    warn!(agent = %request.agent, error = %err, "model call rejected");
                    return Err(MaestroError::ModelUnavailable { reason: err.to_string() });
                }
                Err(err) if attempt + 1 == attempts => {
                    warn!(agent = %request.agent, error = %err, attempts, "model retries exhausted");
                    return Err(MaestroError::ModelUnavailable {
                        reason: format!("{err} (after {attempts} attempt(s))"),
                    });
                }
                Err(err) => {
                    let delay = self.retry.backoff(attempt, err.retry_after());
                    warn!(
                        agent = %request.agent,
                        error = %err,
                        attempt = attempt + 1,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        "model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(MaestroError::ModelUnavailable {
            reason: "no attempt was made".to_string(),
        })
    }
}
