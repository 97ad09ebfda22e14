use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_VISION_MODEL: &str = "gpt-4o";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_CATCHES_PATH: &str = "catches.json";

/// Token budget for the model reply.
pub const MAX_RESPONSE_TOKENS: u32 = 300;
/// Largest accepted decoded image payload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Largest accepted upstream response body.
pub const MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Upstream URL must use https: {0}")]
    InsecureUrl(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub vision_model: String,
    pub upstream_timeout: Duration,
    pub upstream_retries: u32,
    pub upstream_retry_delay: Duration,
    pub port: u16,
    pub catches_path: PathBuf,
}

impl Config {
    /// Reads configuration from the process environment. Malformed values
    /// fail here, at startup, not at first request. A missing API key is
    /// not an error: the analyze endpoint reports it per request.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());

        let openai_api_url =
            env::var("OPENAI_API_URL").unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string());
        validate_upstream_url(&openai_api_url)?;

        let vision_model =
            env::var("VISION_MODEL").unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string());

        let timeout_secs: u64 = parse_var("UPSTREAM_TIMEOUT_SECS", 10)?;
        let upstream_retries: u32 = parse_var("UPSTREAM_RETRIES", 3)?;
        let retry_delay_ms: u64 = parse_var("UPSTREAM_RETRY_DELAY_MS", 1000)?;
        let port: u16 = parse_var("PORT", DEFAULT_PORT)?;

        let catches_path = PathBuf::from(
            env::var("CATCHES_PATH").unwrap_or_else(|_| DEFAULT_CATCHES_PATH.to_string()),
        );

        Ok(Self {
            openai_api_key,
            openai_api_url,
            vision_model,
            upstream_timeout: Duration::from_secs(timeout_secs),
            upstream_retries,
            upstream_retry_delay: Duration::from_millis(retry_delay_ms),
            port,
            catches_path,
        })
    }
}

fn validate_upstream_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw)?;
    if parsed.scheme() != "https" {
        return Err(ConfigError::InsecureUrl(raw.to_string()));
    }
    Ok(())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}
