//! Data models and structures
//!
//! Defines the gateway request value objects (prompt plus optional JPEG
//! image) and the environment-driven configuration.

use crate::ai::mime;
use crate::gateway::{ATTEMPT_TIMEOUT, MAX_ATTEMPTS, RATE_LIMIT_BACKOFF};
use crate::{Error, Result};
use base64::Engine as _;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

/// Which candidate list serves a request. Decided once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    Text,
    Vision,
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestClass::Text => write!(f, "text"),
            RequestClass::Vision => write!(f, "vision"),
        }
    }
}

/// JPEG-encoded still image attached to a vision request.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type())
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EncodedImage {
    /// Wrap bytes that are already JPEG.
    pub fn jpeg(bytes: Vec<u8>) -> Result<Self> {
        if !mime::is_jpeg(&bytes) {
            return Err(Error::Validation(
                "image payload is not JPEG-encoded".to_string(),
            ));
        }
        Ok(Self { bytes })
    }

    /// Accept any still image the `image` crate can decode, transcoding to
    /// JPEG when needed.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self> {
        if mime::is_jpeg(bytes) {
            return Ok(Self {
                bytes: bytes.to_vec(),
            });
        }

        let decoded = image::load_from_memory(bytes)?;
        // JPEG has no alpha channel
        let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
        let mut out = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)?;
        tracing::debug!(
            "Transcoded {} byte image to {} byte JPEG",
            bytes.len(),
            out.len()
        );
        Ok(Self { bytes: out })
    }

    /// Decode a `data:image/...;base64,` URL (or bare base64) as handed over
    /// by browser file pickers and camera captures.
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let trimmed = data_url.trim();
        let payload = match trimmed.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    Error::Validation("data URL is missing its ',' separator".to_string())
                })?;
                if !header.ends_with(";base64") {
                    return Err(Error::Validation(format!(
                        "data URL must be base64-encoded (got '{}')",
                        header
                    )));
                }
                payload
            }
            None => trimmed,
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::Validation(format!("Failed to decode base64 image: {}", e)))?;
        Self::from_image_bytes(&bytes)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_image_bytes(&bytes)
    }

    pub fn mime_type(&self) -> &'static str {
        mime::JPEG
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }
}

/// A normalized (prompt, optional image) pair. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct Request {
    prompt: String,
    image: Option<EncodedImage>,
}

impl Request {
    pub fn new(prompt: impl Into<String>, image: Option<EncodedImage>) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::Validation("prompt text must not be empty".to_string()));
        }
        Ok(Self { prompt, image })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    pub fn class(&self) -> RequestClass {
        if self.image.is_some() {
            RequestClass::Vision
        } else {
            RequestClass::Text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions (Groq by default).
    OpenAi,
    /// RapidAPI-hosted Gemini proxy.
    GeminiProxy,
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "groq" => Ok(ProviderKind::OpenAi),
            "gemini-proxy" | "gemini" | "rapidapi" => Ok(ProviderKind::GeminiProxy),
            other => Err(Error::Config(format!("Unknown LLM_PROVIDER '{}'", other))),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub base_url: String,
    pub rapidapi_key: Option<String>,
    pub rapidapi_host: Option<String>,
    pub text_models: Option<Vec<String>>,
    pub vision_models: Option<Vec<String>>,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub exponential_backoff: bool,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

impl Config {
    pub fn from_env() -> Result<Self> {
        tolerate_missing_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't have to touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::OpenAi,
        };

        let config = Self {
            provider,
            api_key: non_empty(lookup("LLM_API_KEY")),
            base_url: non_empty(lookup("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            rapidapi_key: non_empty(lookup("RAPIDAPI_KEY")),
            rapidapi_host: non_empty(lookup("RAPIDAPI_HOST")),
            text_models: lookup("LLM_TEXT_MODELS").map(|v| split_list(&v)),
            vision_models: lookup("LLM_VISION_MODELS").map(|v| split_list(&v)),
            max_attempts: parse_or("LLM_MAX_ATTEMPTS", lookup("LLM_MAX_ATTEMPTS"), MAX_ATTEMPTS)?,
            backoff_ms: parse_or(
                "LLM_BACKOFF_MS",
                lookup("LLM_BACKOFF_MS"),
                RATE_LIMIT_BACKOFF.as_millis() as u64,
            )?,
            exponential_backoff: parse_backoff_strategy(lookup("LLM_BACKOFF_STRATEGY"))?,
            timeout_secs: parse_or(
                "LLM_TIMEOUT_SECS",
                lookup("LLM_TIMEOUT_SECS"),
                ATTEMPT_TIMEOUT.as_secs(),
            )?,
            temperature: parse_or(
                "LLM_TEMPERATURE",
                lookup("LLM_TEMPERATURE"),
                DEFAULT_TEMPERATURE,
            )?,
            max_tokens: parse_or(
                "LLM_MAX_TOKENS",
                lookup("LLM_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
            )?,
        };

        match config.provider {
            ProviderKind::OpenAi if config.api_key.is_none() => {
                return Err(Error::Config("LLM_API_KEY not set".to_string()));
            }
            ProviderKind::GeminiProxy
                if config.rapidapi_key.is_none() || config.rapidapi_host.is_none() =>
            {
                return Err(Error::Config(
                    "RAPIDAPI_KEY and RAPIDAPI_HOST must both be set for the gemini-proxy provider"
                        .to_string(),
                ));
            }
            _ => {}
        }

        if config.max_attempts == 0 {
            return Err(Error::Config("LLM_MAX_ATTEMPTS must be at least 1".to_string()));
        }
        if config.timeout_secs == 0 {
            return Err(Error::Config("LLM_TIMEOUT_SECS must be at least 1".to_string()));
        }

        Ok(config)
    }
}

/// A missing `.env` is fine, a malformed one is not.
fn tolerate_missing_dotenv<T>(loaded: std::result::Result<T, dotenvy::Error>) -> Result<()> {
    match loaded {
        Err(e) if !e.not_found() => Err(e.into()),
        _ => Ok(()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_backoff_strategy(value: Option<String>) -> Result<bool> {
    match non_empty(value).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if v == "fixed" => Ok(false),
        Some(v) if v == "exponential" => Ok(true),
        Some(other) => Err(Error::Config(format!(
            "LLM_BACKOFF_STRATEGY must be 'fixed' or 'exponential' (got '{}')",
            other
        ))),
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match non_empty(value) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
