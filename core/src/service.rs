//! Composition text service
//!
//! [`CompositionTextService`] is the boundary to the hosted generative-text
//! model. [`GenerativeTextClient`] implements it over HTTP; it is built
//! explicitly from [`ApiConfig`] and handed to each generation call, so tests
//! can substitute their own service.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use cadenza_shared::SelectionState;
use cadenza_shared::api::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse};

use crate::config::ApiConfig;
use crate::error::GenerationError;
use crate::prompt::build_prompt;

/// Produces raw composition text for a selection.
///
/// One request, one complete response: no streaming, no retry.
pub trait CompositionTextService {
    fn compose(
        &self,
        selection: &SelectionState,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// HTTP client for the `generateContent` endpoint.
#[derive(Clone)]
pub struct GenerativeTextClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    key_env: String,
    timeout: Duration,
}

impl fmt::Debug for GenerativeTextClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerativeTextClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerativeTextClient {
    /// Creates a client with an explicit credential.
    ///
    /// `api_key` may be `None`; requests then fail with
    /// [`GenerationError::MissingCredential`].
    pub fn new(config: &ApiConfig, api_key: Option<String>) -> Result<Self, GenerationError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            key_env: config.key_env.clone(),
            timeout,
        })
    }

    /// Creates a client reading the credential from `config.key_env`.
    pub fn from_env(config: &ApiConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                "Environment variable {} is not set; generation will fail until it is",
                config.key_env
            );
        }
        Self::new(config, api_key)
    }

    /// Whether a credential is available.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Full URL of the generate endpoint.
    pub fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    async fn send(&self, prompt: String) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::MissingCredential(self.key_env.clone()))?;

        let request = self
            .http
            .post(self.request_url())
            .header("x-goog-api-key", api_key)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(GenerationError::Timeout),
            Ok(Err(e)) => return Err(GenerationError::Network(e.to_string())),
            Err(_) => return Err(GenerationError::Timeout),
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body));
        }

        parse_success_body(&body)
    }
}

impl CompositionTextService for GenerativeTextClient {
    fn compose(
        &self,
        selection: &SelectionState,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send {
        let prompt = build_prompt(selection);
        async move {
            tracing::debug!("Requesting composition from {}", self.model);
            self.send(prompt).await
        }
    }
}

/// Extracts the composition text from a 2xx body.
pub(crate) fn parse_success_body(body: &str) -> Result<String, GenerationError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        tracing::warn!("Prompt blocked by the model: {}", reason);
    }

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GenerationError::EmptyResponse),
    }
}

/// Maps a non-2xx body to a [`GenerationError::Status`].
pub(crate) fn parse_error_body(status: u16, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().chars().take(200).collect());
    GenerationError::Status { status, message }
}
