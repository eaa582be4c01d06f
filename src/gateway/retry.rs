//! Bounded attempt loop, expressed as an explicit state machine:
//! `Idle -> Attempting -> Waiting -> Attempting -> ... -> Succeeded | Failed`.

use super::catalog::{ModelCandidate, ModelCatalog};
use super::classifier::{classify, FailureReason};
use super::events::{GatewayEvent, GatewayObserver};
use crate::ai::{CompletionTransport, TransportFailure};
use crate::error::GatewayError;
use crate::models::Request;
use rand::Rng;
use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, FixedInterval};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const MAX_ATTEMPTS: u32 = 3;
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);
pub const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_JITTER: Duration = Duration::from_millis(250);
pub const MAX_EXPONENTIAL_DELAY: Duration = Duration::from_secs(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay before every rate-limited retry.
    Fixed,
    /// Doubles from the base delay, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_backoff: Duration,
    pub backoff: BackoffStrategy,
    /// Upper bound of the random delay added to each rate-limit wait.
    pub max_jitter: Duration,
    pub network_retry_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            rate_limit_backoff: RATE_LIMIT_BACKOFF,
            backoff: BackoffStrategy::Fixed,
            max_jitter: MAX_JITTER,
            network_retry_delay: NETWORK_RETRY_DELAY,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    /// Fresh sequence of rate-limit delays for one dispatch.
    fn rate_limit_delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        match self.backoff {
            BackoffStrategy::Fixed => Box::new(FixedInterval::new(self.rate_limit_backoff)),
            BackoffStrategy::Exponential { max_delay } => {
                // base 2 scaled by half the configured delay: d, 2d, 4d, ...
                let half = (self.rate_limit_backoff.as_millis() as u64 / 2).max(1);
                Box::new(
                    ExponentialBackoff::from_millis(2)
                        .factor(half)
                        .max_delay(max_delay),
                )
            }
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    Retryable(FailureReason),
    Fatal(FailureReason),
}

/// Record of one network attempt within a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub model: ModelCandidate,
    pub index: u32,
    pub outcome: AttemptOutcome,
}

/// Successful dispatch: raw text plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub attempts: Vec<Attempt>,
}

#[derive(Debug)]
enum State {
    Idle,
    Attempting {
        attempt: u32,
        model: ModelCandidate,
    },
    Waiting {
        attempt: u32,
        model: ModelCandidate,
        delay: Duration,
        reason: FailureReason,
    },
    Succeeded {
        model: ModelCandidate,
        text: String,
    },
    Failed(GatewayError),
}

pub struct RetryController<'a> {
    pub catalog: &'a ModelCatalog,
    pub transport: &'a dyn CompletionTransport,
    pub policy: &'a RetryPolicy,
    pub observer: &'a dyn GatewayObserver,
    pub call_id: Uuid,
}

impl RetryController<'_> {
    pub async fn run(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Completion, GatewayError> {
        let class = request.class();
        let mut history: Vec<Attempt> = Vec::new();
        let mut rate_limit_delays = self.policy.rate_limit_delays();
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => State::Attempting {
                    attempt: 1,
                    model: self.catalog.initial_model(class),
                },

                State::Attempting { attempt, model } => {
                    self.emit(GatewayEvent::AttemptStarted {
                        call_id: self.call_id,
                        attempt,
                        model: model.id.clone(),
                        class,
                    });

                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = tokio::time::timeout(
                            self.policy.attempt_timeout,
                            self.transport.send(&model.id, request),
                        ) => Some(result.unwrap_or(Err(TransportFailure::Timeout))),
                    };

                    match sent {
                        None => State::Failed(GatewayError::Cancelled { attempts: attempt }),
                        Some(Ok(text)) => {
                            history.push(Attempt {
                                model: model.clone(),
                                index: attempt,
                                outcome: AttemptOutcome::Success(text.clone()),
                            });
                            self.emit(GatewayEvent::Succeeded {
                                call_id: self.call_id,
                                attempt,
                                model: model.id.clone(),
                            });
                            State::Succeeded { model, text }
                        }
                        Some(Err(failure)) => {
                            let reason = classify(&failure, class);
                            self.emit(GatewayEvent::AttemptFailed {
                                call_id: self.call_id,
                                attempt,
                                model: model.id.clone(),
                                reason,
                                status: failure.status(),
                            });
                            self.after_failure(
                                attempt,
                                model,
                                reason,
                                failure,
                                &mut history,
                                rate_limit_delays.as_mut(),
                            )
                        }
                    }
                }

                State::Waiting {
                    attempt,
                    model,
                    delay,
                    reason,
                } => {
                    self.emit(GatewayEvent::Waiting {
                        call_id: self.call_id,
                        before_attempt: attempt,
                        delay_ms: delay.as_millis() as u64,
                        reason,
                    });

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => State::Failed(GatewayError::Cancelled {
                            attempts: attempt - 1,
                        }),
                        _ = tokio::time::sleep(delay) => State::Attempting { attempt, model },
                    }
                }

                State::Succeeded { model, text } => {
                    return Ok(Completion {
                        text,
                        model: model.id,
                        attempts: history,
                    });
                }

                State::Failed(error) => {
                    self.emit(GatewayEvent::Failed {
                        call_id: self.call_id,
                        attempts: error.attempts(),
                        error: error.to_string(),
                    });
                    return Err(error);
                }
            };
        }
    }

    fn after_failure(
        &self,
        attempt: u32,
        model: ModelCandidate,
        reason: FailureReason,
        failure: TransportFailure,
        history: &mut Vec<Attempt>,
        rate_limit_delays: &mut (dyn Iterator<Item = Duration> + Send),
    ) -> State {
        if !reason.is_retryable() {
            history.push(Attempt {
                model: model.clone(),
                index: attempt,
                outcome: AttemptOutcome::Fatal(reason),
            });
            return State::Failed(GatewayError::Fatal {
                attempts: attempt,
                model: model.id,
                reason,
                detail: failure.to_string(),
            });
        }

        history.push(Attempt {
            model: model.clone(),
            index: attempt,
            outcome: AttemptOutcome::Retryable(reason),
        });

        let Some(next) = self.catalog.next_model(&model, model.class, reason) else {
            return State::Failed(GatewayError::CandidatesExhausted {
                attempts: attempt,
                last_model: model.id,
            });
        };

        if attempt >= self.policy.max_attempts {
            return State::Failed(GatewayError::AttemptsExhausted {
                attempts: attempt,
                last_reason: reason,
                last_model: model.id,
                detail: failure.to_string(),
            });
        }

        if next != model {
            self.emit(GatewayEvent::ModelSwitched {
                call_id: self.call_id,
                from: model.id.clone(),
                to: next.id.clone(),
                reason,
            });
        }

        let delay = match reason {
            r if r.is_capacity() => {
                let base = rate_limit_delays
                    .next()
                    .unwrap_or(self.policy.rate_limit_backoff);
                self.policy.jittered(base)
            }
            FailureReason::TransientNetwork => self.policy.network_retry_delay,
            _ => Duration::ZERO,
        };

        if delay.is_zero() {
            State::Attempting {
                attempt: attempt + 1,
                model: next,
            }
        } else {
            State::Waiting {
                attempt: attempt + 1,
                model: next,
                delay,
                reason,
            }
        }
    }

    fn emit(&self, event: GatewayEvent) {
        self.observer.on_event(&event);
    }
}
