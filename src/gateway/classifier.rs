//! Maps a failed exchange to the reason the retry loop acts on.

use crate::ai::TransportFailure;
use crate::models::RequestClass;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    RateLimited,
    /// HTTP 413. Handled exactly like [`FailureReason::RateLimited`].
    PayloadTooLarge,
    ModelUnavailable,
    TransientNetwork,
    Fatal,
}

impl FailureReason {
    /// Capacity-style failures: wait, then maybe toggle the text model.
    pub fn is_capacity(self) -> bool {
        matches!(
            self,
            FailureReason::RateLimited | FailureReason::PayloadTooLarge
        )
    }

    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureReason::Fatal)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureReason::RateLimited => "rate_limited",
            FailureReason::PayloadTooLarge => "payload_too_large",
            FailureReason::ModelUnavailable => "model_unavailable",
            FailureReason::TransientNetwork => "transient_network",
            FailureReason::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &["rate_limit", "rate limit", "too many requests", "quota"];

const DECOMMISSION_MARKERS: &[&str] = &[
    "model_decommissioned",
    "decommissioned",
    "model_not_found",
    "does not support image",
];

fn contains_any(body: &str, markers: &[&str]) -> bool {
    let lower = body.to_ascii_lowercase();
    markers.iter().any(|marker| lower.contains(marker))
}

/// Classify one failed attempt. Pure; rules apply in priority order.
pub fn classify(failure: &TransportFailure, class: RequestClass) -> FailureReason {
    match failure {
        TransportFailure::Http { status, body } => {
            if *status == 413 {
                return FailureReason::PayloadTooLarge;
            }
            if *status == 429 || contains_any(body, RATE_LIMIT_MARKERS) {
                return FailureReason::RateLimited;
            }
            let rejected_model =
                contains_any(body, DECOMMISSION_MARKERS) || matches!(*status, 400 | 404);
            if rejected_model && class == RequestClass::Vision {
                return FailureReason::ModelUnavailable;
            }
            FailureReason::Fatal
        }
        TransportFailure::Network(_) | TransportFailure::Timeout => {
            FailureReason::TransientNetwork
        }
        TransportFailure::Malformed(_) => FailureReason::Fatal,
    }
}
