//! Chat-completion wire types and the HTTP transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Why a dispatch did not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("service rejected the credential (HTTP {0})")]
    Authentication(u16),
    #[error("service rate limit reached (HTTP 429)")]
    RateLimited,
    #[error("service error (HTTP {status}): {body}")]
    Service { status: u16, body: String },
    #[error("request timed out")]
    Timeout,
    #[error("transport: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl DispatchError {
    /// Maps a non-OK status to its kind.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => DispatchError::Authentication(status),
            429 => DispatchError::RateLimited,
            _ => DispatchError::Service { status, body },
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DispatchError::Timeout
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

/// Extracts `choices[0].message.content` from a response body.
pub fn parse_answer(body: &str) -> Result<String, DispatchError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| DispatchError::Malformed(e.to_string()))?;
    parsed
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| DispatchError::Malformed("no choices[0].message.content".to_string()))
}

/// One round trip to a chat-completion service.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, api_key: &str, request: &ChatRequest)
        -> Result<String, DispatchError>;
}

/// reqwest-backed transport with a whole-request timeout.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<String, DispatchError> {
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(DispatchError::from_reqwest)?;

        let status = res.status();
        let text = res.text().await.map_err(DispatchError::from_reqwest)?;

        if !status.is_success() {
            return Err(DispatchError::from_status(status.as_u16(), text));
        }
        parse_answer(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            DispatchError::from_status(401, String::new()),
            DispatchError::Authentication(401)
        );
        assert_eq!(
            DispatchError::from_status(403, String::new()),
            DispatchError::Authentication(403)
        );
        assert_eq!(
            DispatchError::from_status(429, String::new()),
            DispatchError::RateLimited
        );
        assert_eq!(
            DispatchError::from_status(502, "bad gateway".into()),
            DispatchError::Service {
                status: 502,
                body: "bad gateway".into()
            }
        );
    }

    #[test]
    fn parse_answer_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Plants eat light."}}]}"#;
        assert_eq!(parse_answer(body).unwrap(), "Plants eat light.");
    }

    #[test]
    fn parse_answer_rejects_empty_choices() {
        assert!(matches!(
            parse_answer(r#"{"choices":[]}"#),
            Err(DispatchError::Malformed(_))
        ));
        assert!(matches!(
            parse_answer("<html>"),
            Err(DispatchError::Malformed(_))
        ));
    }

    #[test]
    fn request_omits_top_p_when_unset() {
        let req = ChatRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: 10,
            top_p: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("top_p").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
