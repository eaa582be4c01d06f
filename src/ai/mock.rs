use super::{CompletionTransport, TransportFailure, TransportResult};
use crate::models::{Request, RequestClass};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted outcome for [`MockTransport`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Status(u16, String),
    NetworkError(String),
    Malformed,
    /// Sleep before answering with the inner reply.
    Delayed(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        ScriptedReply::Status(status, body.into())
    }
}

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub class: RequestClass,
    pub prompt: String,
}

/// In-memory transport replaying scripted replies in order. Once the script
/// runs dry every further call succeeds with a canned completion.
#[derive(Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, reply: ScriptedReply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(ScriptedReply::text(text))
    }

    pub fn with_status(self, status: u16, body: impl Into<String>) -> Self {
        self.with_reply(ScriptedReply::status(status, body))
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.model.clone())
            .collect()
    }

    async fn play(reply: ScriptedReply) -> TransportResult {
        let mut reply = reply;
        loop {
            match reply {
                ScriptedReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                ScriptedReply::Text(text) => return Ok(text),
                ScriptedReply::Status(status, body) => {
                    return Err(TransportFailure::Http { status, body })
                }
                ScriptedReply::NetworkError(msg) => return Err(TransportFailure::Network(msg)),
                ScriptedReply::Malformed => {
                    return Err(TransportFailure::Malformed(
                        "no completion text in response".to_string(),
                    ))
                }
            }
        }
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn send(&self, model: &str, request: &Request) -> TransportResult {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            class: request.class(),
            prompt: request.prompt().to_string(),
        });

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => Self::play(reply).await,
            None => Ok(format!("Mock completion for: {}", request.prompt())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Serve one response whose body is cut short of its declared length.
#[cfg(test)]
pub(crate) async fn truncated_response_server(status_line: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            received.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&received).to_ascii_lowercase();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let body_len = text
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if received.len() >= header_end + 4 + body_len || n == 0 {
                    break;
                }
            }
        }
        let response = format!("{}\r\ncontent-length: 100\r\n\r\nshort", status_line);
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{}", addr)
}
