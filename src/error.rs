//! Error handling and custom error types
//!
//! Provides unified error handling across the gateway using thiserror. Transport
//! failures that the gateway could not recover from surface as
//! [`Error::Gateway`]; malformed model output surfaces as [`Error::Parse`] so
//! callers can tell the two apart.

use crate::gateway::FailureReason;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to load .env file: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("AI gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Response parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Terminal failure of a single dispatch.
///
/// Each variant keeps the reason the retry loop stopped so diagnostics can
/// distinguish a drained vision cascade from a spent attempt budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gave up after {attempts} attempts (last: {last_reason} on {last_model}): {detail}")]
    AttemptsExhausted {
        attempts: u32,
        last_reason: FailureReason,
        last_model: String,
        detail: String,
    },

    #[error("no vision model left after {attempts} attempts (last tried: {last_model})")]
    CandidatesExhausted { attempts: u32, last_model: String },

    #[error("provider rejected attempt {attempts} on {model} ({reason}): {detail}")]
    Fatal {
        attempts: u32,
        model: String,
        reason: FailureReason,
        detail: String,
    },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl GatewayError {
    /// Number of network attempts made before the failure.
    pub fn attempts(&self) -> u32 {
        match self {
            GatewayError::AttemptsExhausted { attempts, .. }
            | GatewayError::CandidatesExhausted { attempts, .. }
            | GatewayError::Fatal { attempts, .. }
            | GatewayError::Cancelled { attempts } => *attempts,
        }
    }
}

/// Model output was obtained but could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (near: {excerpt:?})")]
pub struct ParseError {
    pub message: String,
    pub excerpt: String,
}

pub type Result<T> = std::result::Result<T, Error>;
