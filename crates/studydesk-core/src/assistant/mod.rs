//! Study assistant: explains a topic in plain language through an external chat-completion
//! service, one throttled round trip per question, with canned answers when no credential
//! is configured.
//!
//! [`Assistant::ask`] never fails. Every failure kind in [`AskError`] is folded into a
//! readable answer so the web layer can always reply with a normal payload.

pub mod throttle;
pub mod transport;

pub use throttle::{Throttle, ThrottlePermit};
pub use transport::{ChatMessage, ChatRequest, CompletionTransport, DispatchError, HttpTransport};

use crate::config::AssistantConfig;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Returned for empty or too-short questions.
pub const CLARIFY_MESSAGE: &str = "Please ask a more specific question.";

/// Questions shorter than this (after trimming) are not sent.
pub const MIN_QUESTION_CHARS: usize = 3;

pub const SYSTEM_PROMPT: &str = "You are a smart helper for students and pupils. \
Your job is to explain complex topics in simple, clear words. \
Use analogies, real-life examples and a friendly tone. \
If a topic is very complex, break the explanation into several simple steps. \
Be supportive and encouraging.";

const USER_PROMPT_PREFIX: &str =
    "Please explain the following in simple words, as if you were explaining it to a friend: ";

/// Wraps a question in the fixed user template.
pub fn user_prompt(question: &str) -> String {
    format!("{}{}", USER_PROMPT_PREFIX, question)
}

/// Canned answers used in demo mode.
pub fn demo_answers(question: &str) -> [String; 4] {
    [
        format!(
            "Great question! '{}' is a really interesting topic. Normally I would explain it in detail, but the API key is not configured right now.",
            question
        ),
        format!(
            "The question '{}' is important for understanding the subject. To get a full answer, configure the DeepSeek API key.",
            question
        ),
        format!(
            "I would gladly explain '{}', but authentication with an API key has to be set up first.",
            question
        ),
        format!(
            "There is a lot to say about '{}'. Please configure the API key to unlock the full study assistant.",
            question
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AskError {
    #[error("question too short")]
    Validation,
    #[error("no API credential configured")]
    NotConfigured,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl AskError {
    /// The user-facing answer for this failure. Demo mode picks one canned answer at random.
    pub fn answer(&self, question: &str) -> String {
        match self {
            AskError::Validation => CLARIFY_MESSAGE.to_string(),
            AskError::NotConfigured => {
                let answers = demo_answers(question);
                answers
                    .choose(&mut rand::thread_rng())
                    .cloned()
                    .unwrap_or_else(|| CLARIFY_MESSAGE.to_string())
            }
            AskError::Dispatch(DispatchError::Authentication(status)) => format!(
                "API error: {}. The API key was rejected; please check it and try again.",
                status
            ),
            AskError::Dispatch(DispatchError::RateLimited) => {
                "API error: 429. Too many requests right now; please try again in a moment."
                    .to_string()
            }
            AskError::Dispatch(DispatchError::Service { status, .. }) => format!(
                "API error: {}. Please check the API key and try again.",
                status
            ),
            AskError::Dispatch(DispatchError::Timeout) => {
                "Connection error: the assistant took too long to answer.".to_string()
            }
            AskError::Dispatch(DispatchError::Transport(detail))
            | AskError::Dispatch(DispatchError::Malformed(detail)) => {
                format!("Connection error: {}", detail)
            }
        }
    }
}

pub struct Assistant {
    config: AssistantConfig,
    api_key: Option<String>,
    throttle: Throttle,
    transport: Arc<dyn CompletionTransport>,
}

impl Assistant {
    /// Assistant over HTTP. `api_key` of `None` (or blank) selects demo mode.
    pub fn new(config: AssistantConfig, api_key: Option<String>) -> Self {
        let transport = Arc::new(HttpTransport::new(config.api_url.clone(), config.timeout()));
        Self::with_transport(config, api_key, transport)
    }

    pub fn with_transport(
        config: AssistantConfig,
        api_key: Option<String>,
        transport: Arc<dyn CompletionTransport>,
    ) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self {
            throttle: Throttle::new(config.min_interval()),
            config,
            api_key,
            transport,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn build_request(&self, question: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt(question)),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: self.config.top_p,
        }
    }

    /// One validated, throttled round trip. The throttle timestamp only moves on success
    /// (and on demo answers when `demo_marks_throttle` is set).
    pub async fn try_ask(&self, question: &str) -> Result<String, AskError> {
        if question.trim().chars().count() < MIN_QUESTION_CHARS {
            return Err(AskError::Validation);
        }

        let mut permit = self.throttle.acquire().await;

        let Some(api_key) = self.api_key.as_deref() else {
            if self.config.demo_marks_throttle {
                permit.mark_dispatched();
            }
            return Err(AskError::NotConfigured);
        };

        let request = self.build_request(question);
        let answer = self.transport.complete(api_key, &request).await?;
        permit.mark_dispatched();
        Ok(answer)
    }

    /// Answers `question`, folding every failure into a readable message.
    pub async fn ask(&self, question: &str) -> String {
        match self.try_ask(question).await {
            Ok(answer) => answer,
            Err(AskError::Validation) => CLARIFY_MESSAGE.to_string(),
            Err(AskError::NotConfigured) => {
                tracing::info!("[ASSISTANT] No API key configured; answering in demo mode.");
                AskError::NotConfigured.answer(question)
            }
            Err(err) => {
                tracing::warn!("[ASSISTANT] Request failed: {}", err);
                err.answer(question)
            }
        }
    }
}
