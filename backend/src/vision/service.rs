use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};
use reqwest::{Client as HttpClient, StatusCode};
use sha2::{Digest, Sha256};
use shared::AnalysisResult;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{Config, MAX_IMAGE_BYTES, MAX_RESPONSE_BYTES, MAX_RESPONSE_TOKENS};
use crate::vision::normalize::normalize_reply;
use crate::vision::protocol::{ChatCompletionRequest, ChatCompletionResponse, identify_request};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Image data is required")]
    MissingImage,
    #[error("Invalid image encoding")]
    InvalidEncoding,
    #[error("Image too large")]
    ImageTooLarge,
    #[error("OpenAI API key is not set")]
    MissingCredential,
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Upstream returned {status}: {body}")]
    Provider { status: StatusCode, body: String },
    #[error("Malformed upstream response: {0}")]
    Envelope(String),
}

impl AnalysisError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingImage
                | AnalysisError::InvalidEncoding
                | AnalysisError::ImageTooLarge
        )
    }

    fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Transport(err) => err.is_timeout() || err.is_connect(),
            AnalysisError::Provider { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct VisionService {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    model: String,
    retries: u32,
    retry_delay: Duration,
}

impl VisionService {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder()
            .timeout(config.upstream_timeout)
            .build()?;

        Ok(Self {
            http_client,
            api_key: config.openai_api_key.clone(),
            api_url: config.openai_api_url.clone(),
            model: config.vision_model.clone(),
            retries: config.upstream_retries,
            retry_delay: config.upstream_retry_delay,
        })
    }

    pub fn credential_set(&self) -> bool {
        self.api_key.is_some()
    }

    /// Identifies the species in a base64-encoded JPEG. Validation and
    /// configuration problems surface as errors before any outbound call;
    /// an unusable model reply degrades to the fallback result instead.
    pub async fn identify(&self, base64_image: &str) -> Result<AnalysisResult, AnalysisError> {
        if base64_image.is_empty() {
            return Err(AnalysisError::MissingImage);
        }
        let image_bytes = BASE64
            .decode(base64_image)
            .map_err(|_| AnalysisError::InvalidEncoding)?;
        if image_bytes.len() > MAX_IMAGE_BYTES {
            return Err(AnalysisError::ImageTooLarge);
        }

        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingCredential)?;

        let request_id = Uuid::new_v4();
        info!(
            "Request {}: analyzing image, {} bytes, sha256 {}",
            request_id,
            image_bytes.len(),
            image_hash(&image_bytes)
        );

        let request = identify_request(&self.model, base64_image, MAX_RESPONSE_TOKENS);
        let response = self.dispatch(&request, api_key, request_id).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AnalysisError::Envelope("reply contains no message content".to_string())
            })?;
        debug!(
            "Request {}: model replied with {} chars",
            request_id,
            content.len()
        );

        let result = normalize_reply(&content);
        info!("Request {}: identified species: {}", request_id, result.species);
        Ok(result)
    }

    async fn dispatch(
        &self,
        request: &ChatCompletionRequest,
        api_key: &str,
        request_id: Uuid,
    ) -> Result<ChatCompletionResponse, AnalysisError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(request, api_key).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) if attempt <= self.retries && err.is_retryable() => {
                    warn!(
                        "Request {}: upstream attempt {} failed, retrying: {}",
                        request_id, attempt, err
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        request: &ChatCompletionRequest,
        api_key: &str,
    ) -> Result<ChatCompletionResponse, AnalysisError> {
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Provider { status, body });
        }

        if let Some(length) = response.content_length() {
            if length > MAX_RESPONSE_BYTES {
                return Err(AnalysisError::Envelope(format!(
                    "response body of {} bytes exceeds limit",
                    length
                )));
            }
        }
        let bytes = response.bytes().await?;
        if bytes.len() as u64 > MAX_RESPONSE_BYTES {
            return Err(AnalysisError::Envelope(format!(
                "response body of {} bytes exceeds limit",
                bytes.len()
            )));
        }

        serde_json::from_slice(&bytes).map_err(|err| AnalysisError::Envelope(err.to_string()))
    }
}

fn image_hash(image_data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_data);
    hex::encode(hasher.finalize())
}
