//! Structured observability hooks for the retry loop.
//!
//! Every state transition of a dispatch is reported as a [`GatewayEvent`] to
//! the configured [`GatewayObserver`]. The default observer forwards events
//! to `tracing`; tests install a [`RecordingObserver`] and assert on the
//! captured sequence.

use super::FailureReason;
use crate::models::RequestClass;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GatewayEvent {
    AttemptStarted {
        call_id: Uuid,
        attempt: u32,
        model: String,
        class: RequestClass,
    },
    AttemptFailed {
        call_id: Uuid,
        attempt: u32,
        model: String,
        reason: FailureReason,
        status: Option<u16>,
    },
    ModelSwitched {
        call_id: Uuid,
        from: String,
        to: String,
        reason: FailureReason,
    },
    Waiting {
        call_id: Uuid,
        before_attempt: u32,
        delay_ms: u64,
        reason: FailureReason,
    },
    Succeeded {
        call_id: Uuid,
        attempt: u32,
        model: String,
    },
    Failed {
        call_id: Uuid,
        attempts: u32,
        error: String,
    },
}

pub trait GatewayObserver: Send + Sync {
    fn on_event(&self, event: &GatewayEvent);
}

/// Forwards events to `tracing` with the attempt, model and reason as fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl GatewayObserver for TracingObserver {
    fn on_event(&self, event: &GatewayEvent) {
        match event {
            GatewayEvent::AttemptStarted {
                call_id,
                attempt,
                model,
                class,
            } => tracing::debug!(%call_id, attempt, model = %model, class = %class, "attempt started"),
            GatewayEvent::AttemptFailed {
                call_id,
                attempt,
                model,
                reason,
                status,
            } => tracing::warn!(
                %call_id,
                attempt,
                model = %model,
                reason = %reason,
                status = ?status,
                "attempt failed"
            ),
            GatewayEvent::ModelSwitched {
                call_id,
                from,
                to,
                reason,
            } => tracing::info!(%call_id, from = %from, to = %to, reason = %reason, "switching model"),
            GatewayEvent::Waiting {
                call_id,
                before_attempt,
                delay_ms,
                reason,
            } => tracing::info!(
                %call_id,
                before_attempt,
                delay_ms,
                reason = %reason,
                "backing off"
            ),
            GatewayEvent::Succeeded {
                call_id,
                attempt,
                model,
            } => tracing::info!(%call_id, attempt, model = %model, "completion succeeded"),
            // the dispatcher reports terminal failures at error level
            GatewayEvent::Failed {
                call_id,
                attempts,
                error,
            } => tracing::debug!(%call_id, attempts, error = %error, "completion failed"),
        }
    }
}

/// Keeps every event in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<GatewayEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Models in the order attempts were started.
    pub fn attempted_models(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                GatewayEvent::AttemptStarted { model, .. } => Some(model.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failure_reasons(&self) -> Vec<FailureReason> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                GatewayEvent::AttemptFailed { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect()
    }
}

impl GatewayObserver for RecordingObserver {
    fn on_event(&self, event: &GatewayEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_shares_buffer() {
        let observer = RecordingObserver::new();
        let handle = observer.clone();
        let call_id = Uuid::new_v4();

        observer.on_event(&GatewayEvent::AttemptStarted {
            call_id,
            attempt: 1,
            model: "m".to_string(),
            class: RequestClass::Text,
        });
        observer.on_event(&GatewayEvent::AttemptFailed {
            call_id,
            attempt: 1,
            model: "m".to_string(),
            reason: FailureReason::RateLimited,
            status: Some(429),
        });

        assert_eq!(handle.events().len(), 2);
        assert_eq!(handle.attempted_models(), vec!["m"]);
        assert_eq!(handle.failure_reasons(), vec![FailureReason::RateLimited]);
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let event = GatewayEvent::Waiting {
            call_id: Uuid::nil(),
            before_attempt: 2,
            delay_ms: 2000,
            reason: FailureReason::RateLimited,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "waiting");
        assert_eq!(json["reason"], "rate_limited");
        assert_eq!(json["delay_ms"], 2000);
    }
}
