use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, ImageUrl};
use crate::ai::{truncate, CompletionTransport, TransportFailure, TransportResult};
use crate::models::{Request, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI-compatible chat completion transport (Groq by default).
pub struct OpenAiTransport {
    client: Client,
    api_key: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiTransport {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new_with_client(api_key, client))
    }

    pub fn new_with_client(api_key: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, model: &str, request: &Request) -> ChatCompletionRequest {
        let mut content = vec![ContentPart::Text {
            text: request.prompt().to_string(),
        }];
        if let Some(image) = request.image() {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.to_data_url(),
                },
            });
        }

        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

pub(crate) fn network_failure(e: reqwest::Error) -> TransportFailure {
    if e.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Network(e.to_string())
    }
}

#[async_trait]
impl CompletionTransport for OpenAiTransport {
    async fn send(&self, model: &str, request: &Request) -> TransportResult {
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let body = self.build_request(model, request);
        tracing::debug!(
            "Sending chat completion request to {} (model: {}, class: {})",
            url,
            model,
            request.class()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send request to chat completions API: {}", e);
                network_failure(e)
            })?;

        let status = response.status();

        if !status.is_success() {
            // keep the status even if the body cannot be read
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Chat completions API error (status {}): {}",
                status,
                truncate(&text, 300)
            );
            return Err(TransportFailure::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let text = response.text().await.map_err(network_failure)?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                "Failed to parse chat completion envelope: {}\nBody: {}",
                e,
                truncate(&text, 500)
            );
            TransportFailure::Malformed(format!("invalid chat completion envelope: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TransportFailure::Malformed("no completion text in response".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedImage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_transport(server: &MockServer) -> OpenAiTransport {
        OpenAiTransport::new("test-key".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_send_returns_completion_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-primary",
                "messages": [{
                    "role": "user",
                    "content": [{ "type": "text", "text": "Plan a lesson" }]
                }],
                "max_tokens": DEFAULT_MAX_TOKENS
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sure thing")))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new("Plan a lesson", None).unwrap();
        let text = make_transport(&server)
            .send("text-primary", &request)
            .await
            .unwrap();
        assert_eq!(text, "Sure thing");
    }

    #[tokio::test]
    async fn test_send_includes_image_as_data_url() {
        let server = MockServer::start().await;
        let image = EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();
        let data_url = image.to_data_url();

        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .and(body_partial_json(serde_json::json!({
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "What is on the board?" },
                        { "type": "image_url", "image_url": { "url": data_url } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Fractions")))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new("What is on the board?", Some(image)).unwrap();
        let text = make_transport(&server)
            .send("vision-a", &request)
            .await
            .unwrap();
        assert_eq!(text, "Fractions");
    }

    #[tokio::test]
    async fn test_error_status_is_reported_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate_limit_exceeded"))
            .mount(&server)
            .await;

        let request = Request::new("hi", None).unwrap();
        let failure = make_transport(&server)
            .send("text-primary", &request)
            .await
            .unwrap_err();
        assert_eq!(
            failure,
            TransportFailure::Http {
                status: 429,
                body: "rate_limit_exceeded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_choices_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let request = Request::new("hi", None).unwrap();
        let failure = make_transport(&server)
            .send("text-primary", &request)
            .await
            .unwrap_err();
        assert!(matches!(failure, TransportFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn test_non_json_envelope_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(CHAT_COMPLETIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let request = Request::new("hi", None).unwrap();
        let failure = make_transport(&server)
            .send("text-primary", &request)
            .await
            .unwrap_err();
        assert!(matches!(failure, TransportFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_failure() {
        let transport = OpenAiTransport::new("key".to_string(), Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9".to_string());

        let request = Request::new("hi", None).unwrap();
        let failure = transport.send("text-primary", &request).await.unwrap_err();
        assert!(matches!(failure, TransportFailure::Network(_)));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() {
        let base_url = crate::ai::mock::truncated_response_server("HTTP/1.1 429 Too Many Requests").await;
        let transport = OpenAiTransport::new("key".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_base_url(base_url);

        let request = Request::new("hi", None).unwrap();
        let failure = transport.send("text-primary", &request).await.unwrap_err();
        assert_eq!(failure.status(), Some(429));
    }
}
