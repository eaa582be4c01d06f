use super::types::{Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part};
use crate::ai::openai::client::network_failure;
use crate::ai::{truncate, CompletionTransport, TransportFailure, TransportResult};
use crate::models::Request;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Gemini proxy hosted on RapidAPI, the alternate provider path.
///
/// The proxy picks its own Gemini model; the catalog's model id is only
/// recorded in logs.
pub struct GeminiProxyTransport {
    client: Client,
    api_key: String,
    host: String,
    base_url: String,
}

impl GeminiProxyTransport {
    pub fn new(api_key: String, host: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new_with_client(api_key, host, client))
    }

    pub fn new_with_client(api_key: String, host: String, client: Client) -> Self {
        let base_url = format!("https://{}", host);
        Self {
            client,
            api_key,
            host,
            base_url,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request(request: &Request) -> GenerateContentRequest {
        let mut parts = vec![Part::Text {
            text: request.prompt().to_string(),
        }];
        if let Some(image) = request.image() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: image.to_base64(),
                },
            });
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

#[async_trait]
impl CompletionTransport for GeminiProxyTransport {
    async fn send(&self, model: &str, request: &Request) -> TransportResult {
        let url = format!("{}/", self.base_url);
        tracing::debug!(
            "Sending generateContent request to Gemini proxy {} (catalog model: {})",
            self.host,
            model
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.api_key)
            .json(&Self::build_request(request))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to send request to Gemini proxy: {}", e);
                network_failure(e)
            })?;

        let status = response.status();

        if !status.is_success() {
            // keep the status even if the body cannot be read
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Gemini proxy error (status {}): {}",
                status,
                truncate(&text, 300)
            );
            return Err(TransportFailure::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let text = response.text().await.map_err(network_failure)?;

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                "Failed to parse Gemini proxy response: {}\nBody: {}",
                e,
                truncate(&text, 500)
            );
            TransportFailure::Malformed(format!("invalid Gemini proxy envelope: {}", e))
        })?;

        parsed.into_text().ok_or_else(|| {
            TransportFailure::Malformed("Unexpected response structure from AI proxy".to_string())
        })
    }

    fn name(&self) -> &str {
        "gemini-proxy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedImage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_transport(server: &MockServer) -> GeminiProxyTransport {
        GeminiProxyTransport::new(
            "rapid-key".to_string(),
            "gemini-pro.p.rapidapi.com".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_send_uses_rapidapi_headers_and_candidates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("x-rapidapi-host", "gemini-pro.p.rapidapi.com"))
            .and(header("x-rapidapi-key", "rapid-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Summarize" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Summary" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new("Summarize", None).unwrap();
        let text = make_transport(&server)
            .send("ignored", &request)
            .await
            .unwrap();
        assert_eq!(text, "Summary");
    }

    #[tokio::test]
    async fn test_send_inlines_image() {
        let server = MockServer::start().await;
        let image = EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE1]).unwrap();
        let encoded = image.to_base64();

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "parts": [
                        { "text": "Look" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": encoded } }
                    ]
                }]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "Seen" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new("Look", Some(image)).unwrap();
        let text = make_transport(&server).send("v", &request).await.unwrap();
        assert_eq!(text, "Seen");
    }

    #[tokio::test]
    async fn test_unexpected_structure_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })),
            )
            .mount(&server)
            .await;

        let request = Request::new("hi", None).unwrap();
        let failure = make_transport(&server)
            .send("m", &request)
            .await
            .unwrap_err();
        assert!(matches!(failure, TransportFailure::Malformed(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(403).set_body_string("not subscribed"))
            .mount(&server)
            .await;

        let request = Request::new("hi", None).unwrap();
        let failure = make_transport(&server)
            .send("m", &request)
            .await
            .unwrap_err();
        assert_eq!(failure.status(), Some(403));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() {
        let base_url =
            crate::ai::mock::truncated_response_server("HTTP/1.1 503 Service Unavailable").await;
        let transport = GeminiProxyTransport::new(
            "rapid-key".to_string(),
            "gemini-pro.p.rapidapi.com".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(base_url);

        let request = Request::new("hi", None).unwrap();
        let failure = transport.send("m", &request).await.unwrap_err();
        assert_eq!(failure.status(), Some(503));
    }
}
