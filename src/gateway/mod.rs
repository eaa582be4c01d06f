//! AI request gateway
//!
//! Turns a (prompt, optional image) pair into completion text from a
//! rate-limited, multi-model provider: classifies each failed attempt, walks
//! or toggles the model catalog, backs off, and gives up after a fixed
//! attempt budget with a single terminal error.

pub mod catalog;
pub mod classifier;
pub mod dispatcher;
pub mod events;
pub mod retry;

pub use catalog::{ModelCandidate, ModelCatalog, DEFAULT_TEXT_MODELS, DEFAULT_VISION_MODELS};
pub use classifier::{classify, FailureReason};
pub use dispatcher::Dispatcher;
pub use events::{GatewayEvent, GatewayObserver, RecordingObserver, TracingObserver};
pub use retry::{
    Attempt, AttemptOutcome, BackoffStrategy, Completion, RetryPolicy, ATTEMPT_TIMEOUT,
    MAX_ATTEMPTS, MAX_EXPONENTIAL_DELAY, MAX_JITTER, NETWORK_RETRY_DELAY, RATE_LIMIT_BACKOFF,
};
