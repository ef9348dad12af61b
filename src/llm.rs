use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::{ConversationTurn, Role};
use crate::config::ModelConfig;

pub(crate) const FREEMAN_SYSTEM_PROMPT: &str = "당신은 친절한 해커이자 Freeman입니다. 영국 스타일 억양으로 반말을 구사하고, 친근하고 유머러스하게 해 주세요. 직장 동료처럼! 하지만, NO Emoji. 채팅하듯이 string만 넣어서 해 주세요";

const EMPTY_REPLY: &str = "응답 없음";

#[derive(Debug, Error)]
pub(crate) enum RequestError {
    #[error("inference endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("inference response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Chat-completion seam. Implementations never touch chat state.
pub(crate) trait CompletionModel: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
        api_key: &str,
        history: &[ConversationTurn],
    ) -> std::result::Result<String, RequestError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, PartialEq, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Persona prompt first, then history oldest-first, then the new prompt.
fn build_messages<'a>(prompt: &'a str, history: &'a [ConversationTurn]) -> Vec<WireMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(WireMessage {
        role: "system",
        content: FREEMAN_SYSTEM_PROMPT,
    });
    messages.extend(history.iter().map(|turn| WireMessage {
        role: role_name(turn.role),
        content: &turn.content,
    }));
    messages.push(WireMessage {
        role: "user",
        content: prompt,
    });
    messages
}

fn parse_reply(body: &str) -> std::result::Result<String, RequestError> {
    let response: CompletionResponse = serde_json::from_str(body)?;
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty());
    Ok(text.unwrap_or_else(|| EMPTY_REPLY.to_string()))
}

pub(crate) struct OpenAiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    pub(crate) fn new(config: &ModelConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build inference http client")?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

impl CompletionModel for OpenAiClient {
    fn complete(
        &self,
        prompt: &str,
        api_key: &str,
        history: &[ConversationTurn],
    ) -> std::result::Result<String, RequestError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: build_messages(prompt, history),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        tracing::debug!(
            model = %self.model,
            history = history.len(),
            "sending chat completion"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "chat completion rejected");
            return Err(RequestError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_wrap_history_between_persona_and_prompt() {
        let history = vec![
            ConversationTurn {
                role: Role::User,
                content: "hi".to_string(),
            },
            ConversationTurn {
                role: Role::Assistant,
                content: "alright mate".to_string(),
            },
        ];

        let messages = build_messages("what time is it", &history);

        let roles = messages.iter().map(|m| m.role).collect::<Vec<_>>();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, FREEMAN_SYSTEM_PROMPT);
        assert_eq!(messages[3].content, "what time is it");
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let request = CompletionRequest {
            model: "gpt-4o",
            messages: build_messages("ping", &[]),
            max_tokens: 4000,
            temperature: 0.5,
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["model"], json!("gpt-4o"));
        assert_eq!(value["max_tokens"], json!(4000));
        assert_eq!(value["temperature"], json!(0.5));
        assert_eq!(value["messages"][1], json!({"role": "user", "content": "ping"}));
    }

    #[test]
    fn reply_text_is_trimmed() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  cheers  \n"}}]}"#;
        assert_eq!(parse_reply(body).expect("reply"), "cheers");
    }

    #[test]
    fn missing_content_falls_back_to_placeholder() {
        assert_eq!(parse_reply(r#"{"choices":[]}"#).expect("reply"), EMPTY_REPLY);
        assert_eq!(
            parse_reply(r#"{"choices":[{"message":{"content":"   "}}]}"#).expect("reply"),
            EMPTY_REPLY
        );
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(parse_reply("<html>"), Err(RequestError::Decode(_))));
    }

    #[test]
    fn status_error_carries_status_and_body() {
        let err = RequestError::Status {
            status: 401,
            body: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "inference endpoint returned 401: bad key");
    }
}
