//! AI request gateway for an educator-facing teaching platform
//!
//! Mediates every feature's calls to a rate-limited, multi-model LLM
//! provider: picks a text or vision model, retries and falls back across
//! models, and coerces free-form replies into structured data, with a
//! feature-specific fallback when the provider is unusable.

pub mod ai;
pub mod error;
pub mod features;
pub mod gateway;
pub mod models;
pub mod parser;
pub mod prompts;

pub use error::{Error, Result};
pub use gateway::Dispatcher;
