use super::catalog::{ModelCatalog, DEFAULT_TEXT_MODELS, DEFAULT_VISION_MODELS};
use super::events::{GatewayObserver, TracingObserver};
use super::retry::{
    BackoffStrategy, Completion, RetryController, RetryPolicy, MAX_EXPONENTIAL_DELAY,
};
use crate::ai::{CompletionTransport, GeminiProxyTransport, OpenAiTransport};
use crate::models::{Config, EncodedImage, ProviderKind, Request};
use crate::{parser, Error, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Single entry point feature code uses to reach the LLM provider.
///
/// Cheap to clone; clones share the read-only catalog, policy and transport.
/// Calls are independent of each other: nothing is cached or coalesced.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn CompletionTransport>,
    catalog: Arc<ModelCatalog>,
    policy: Arc<RetryPolicy>,
    observer: Arc<dyn GatewayObserver>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn CompletionTransport>) -> Self {
        Self {
            transport,
            catalog: Arc::new(ModelCatalog::default()),
            policy: Arc::new(RetryPolicy::default()),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn GatewayObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Build the provider transport, catalog and retry policy from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let transport: Arc<dyn CompletionTransport> = match config.provider {
            ProviderKind::OpenAi => {
                let api_key = config
                    .api_key
                    .clone()
                    .ok_or_else(|| Error::Config("LLM_API_KEY not set".to_string()))?;
                tracing::info!("AI provider: OpenAI-compatible ({})", config.base_url);
                Arc::new(
                    OpenAiTransport::new(api_key, timeout)?
                        .with_base_url(config.base_url.clone())
                        .with_sampling(config.temperature, config.max_tokens),
                )
            }
            ProviderKind::GeminiProxy => {
                let (api_key, host) = config
                    .rapidapi_key
                    .clone()
                    .zip(config.rapidapi_host.clone())
                    .ok_or_else(|| {
                        Error::Config("RAPIDAPI_KEY and RAPIDAPI_HOST not set".to_string())
                    })?;
                tracing::info!("AI provider: Gemini proxy ({})", host);
                Arc::new(GeminiProxyTransport::new(api_key, host, timeout)?)
            }
        };

        let catalog = ModelCatalog::new(
            config
                .text_models
                .clone()
                .unwrap_or_else(|| owned(DEFAULT_TEXT_MODELS)),
            config
                .vision_models
                .clone()
                .unwrap_or_else(|| owned(DEFAULT_VISION_MODELS)),
        )?;

        let policy = RetryPolicy {
            max_attempts: config.max_attempts,
            rate_limit_backoff: Duration::from_millis(config.backoff_ms),
            backoff: if config.exponential_backoff {
                BackoffStrategy::Exponential {
                    max_delay: MAX_EXPONENTIAL_DELAY,
                }
            } else {
                BackoffStrategy::Fixed
            },
            attempt_timeout: timeout,
            ..RetryPolicy::default()
        };

        Ok(Self::new(transport)
            .with_catalog(catalog)
            .with_policy(policy))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Raw completion text for `prompt` (and `image`, which selects a vision
    /// model).
    pub async fn complete(&self, prompt: &str, image: Option<EncodedImage>) -> Result<String> {
        self.complete_with_cancel(prompt, image, &CancellationToken::new())
            .await
    }

    pub async fn complete_with_cancel(
        &self,
        prompt: &str,
        image: Option<EncodedImage>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        Ok(self.complete_detailed(prompt, image, cancel).await?.text)
    }

    /// Like [`Dispatcher::complete_with_cancel`] but also reports the model
    /// that answered and every attempt made.
    pub async fn complete_detailed(
        &self,
        prompt: &str,
        image: Option<EncodedImage>,
        cancel: &CancellationToken,
    ) -> Result<Completion> {
        let request = Request::new(prompt, image)?;
        let call_id = Uuid::new_v4();
        let class = request.class();

        let controller = RetryController {
            catalog: &self.catalog,
            transport: self.transport.as_ref(),
            policy: &self.policy,
            observer: self.observer.as_ref(),
            call_id,
        };

        let span = tracing::info_span!(
            "ai_dispatch",
            %call_id,
            class = %class,
            provider = self.transport.name()
        );

        match controller.run(&request, cancel).instrument(span).await {
            Ok(completion) => {
                tracing::info!(
                    "Completion from {} after {} attempt(s) ({} chars)",
                    completion.model,
                    completion.attempts.len(),
                    completion.text.len()
                );
                Ok(completion)
            }
            Err(e) => {
                tracing::error!("AI request {} failed: {}", call_id, e);
                Err(e.into())
            }
        }
    }

    /// Dispatch, then decode the completion into `T`. A decode failure is an
    /// [`Error::Parse`] and never triggers another network call.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        image: Option<EncodedImage>,
    ) -> Result<T> {
        let raw = self.complete(prompt, image).await?;
        parser::parse_reply(&raw, prompt).map_err(|e| {
            tracing::warn!("Completion could not be parsed as structured data: {}", e);
            Error::Parse(e)
        })
    }

    pub async fn complete_value(
        &self,
        prompt: &str,
        image: Option<EncodedImage>,
    ) -> Result<serde_json::Value> {
        self.complete_structured(prompt, image).await
    }
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}
