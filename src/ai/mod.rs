//! Provider transports for chat completions
//!
//! A transport performs exactly one HTTP exchange for one model and reports
//! what happened without deciding whether to retry. Retry policy lives in
//! [`crate::gateway`].

pub mod gemini;
pub mod mime;
pub mod mock;
pub mod openai;

pub use gemini::GeminiProxyTransport;
pub use mock::{MockTransport, ScriptedReply};
pub use openai::OpenAiTransport;

use crate::models::Request;
use async_trait::async_trait;
use std::fmt;

/// Why a single exchange did not yield completion text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Non-2xx response.
    Http { status: u16, body: String },
    /// Connect/DNS/IO failure before a response arrived.
    Network(String),
    /// The attempt exceeded its deadline.
    Timeout,
    /// 2xx response whose envelope held no completion text.
    Malformed(String),
}

impl TransportFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportFailure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Http { status, body } => {
                write!(f, "HTTP {}: {}", status, truncate(body, 300))
            }
            TransportFailure::Network(msg) => write!(f, "network error: {}", msg),
            TransportFailure::Timeout => write!(f, "attempt timed out"),
            TransportFailure::Malformed(msg) => write!(f, "unexpected response: {}", msg),
        }
    }
}

pub type TransportResult = std::result::Result<String, TransportFailure>;

#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send `request` to `model` once and return the raw completion text.
    async fn send(&self, model: &str, request: &Request) -> TransportResult;

    /// Short provider label used in logs.
    fn name(&self) -> &str;
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("ಕನ್ನಡ text", 3), "ಕನ್...");
    }

    #[test]
    fn test_failure_status() {
        let failure = TransportFailure::Http {
            status: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(failure.status(), Some(429));
        assert_eq!(TransportFailure::Timeout.status(), None);
        assert!(failure.to_string().contains("429"));
    }
}
