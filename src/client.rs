use anyhow::Context as _;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Environment variables the client is configured from.
pub const ENV_API_URL: &str = "TREATFORGE_API_URL";
pub const ENV_API_KEY: &str = "TREATFORGE_API_KEY";
pub const ENV_MODEL: &str = "TREATFORGE_MODEL";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    session_id: &'a str,
    task: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Per-call sampling knobs. `None` fields are left out of the request body
/// so the service applies its own defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub style: Option<String>,
    pub additional_context: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Generation cancelled")]
    Cancelled,
    #[error("generation service returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("request to generation service failed")]
    Transport(#[from] reqwest::Error),
    #[error("generation service returned a malformed response body")]
    MalformedResponse(#[source] serde_json::Error),
}

impl GenerateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Thin client for the text generation service. One endpoint, keyed by the
/// `X-API-Key` header.
pub struct GenerationClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GenerationClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        Url::parse(base_url).with_context(|| format!("invalid service url: {base_url}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint: generate_endpoint(base_url),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Builds a client from `TREATFORGE_API_URL`, `TREATFORGE_API_KEY` and
    /// `TREATFORGE_MODEL`. The url and key are required.
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            std::env::var(ENV_API_URL).with_context(|| format!("{ENV_API_URL} is not set"))?;
        let api_key =
            std::env::var(ENV_API_KEY).with_context(|| format!("{ENV_API_KEY} is not set"))?;
        let model = std::env::var(ENV_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
        Self::new(&base_url, api_key, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one generation request. Cancelling the token abandons the
    /// in-flight request and yields `GenerateError::Cancelled`.
    pub async fn generate(
        &self,
        session_id: &str,
        task: &str,
        params: &GenerationParams,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(GenerateError::Cancelled),
            result = self.send(session_id, task, params) => result,
        }
    }

    async fn send(
        &self,
        session_id: &str,
        task: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerateError> {
        let request = GenerateRequest {
            session_id,
            task,
            model: &self.model,
            style: params.style.as_deref(),
            additional_context: params.additional_context.as_deref(),
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(session_id, task_len = task.len(), "generation request");

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerateError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(GenerateError::MalformedResponse)?;
        tracing::debug!(session_id, text_len = parsed.text.len(), "generation response");
        Ok(parsed.text)
    }
}

fn generate_endpoint(base_url: &str) -> String {
    format!("{}/generate", base_url.trim_end_matches('/'))
}

/// Session id tying a call to its treatment, chapter and generation unit,
/// made unique by a millisecond timestamp.
pub fn session_id(treatment_id: &str, chapter_id: &str, unit: &str) -> String {
    format!(
        "{treatment_id}-{chapter_id}-{unit}-{}",
        Utc::now().timestamp_millis()
    )
}
