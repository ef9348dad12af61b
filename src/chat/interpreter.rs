use std::sync::Arc;

use super::command::{parse_command, ParsedCommand};
use super::types::{ConversationTurn, FREEMAN, SYSTEM};
use crate::keys::KeyProvider;
use crate::llm::CompletionModel;
use crate::store::MessageStore;

pub(crate) const ASK_FOR_QUESTION: &str = "질문을 입력해주세요";
pub(crate) const REQUESTING_NOTICE: &str = "Freeman에게 요청 중...";
pub(crate) const MISSING_KEY: &str = "GPT API 키를 가져오지 못했습니다.";

pub(crate) const HELP_TEXT: &str = "사용 가능한 명령어:
/help            명령어 목록
/me <행동>        행동 메시지 (나에게만 보임)
/bot <질문>       Freeman에게 질문
/clear           화면 지우기 (저장된 메시지는 유지)
메시지에 Freeman/프리먼/프리맨을 넣으면 Freeman이 대화 맥락과 함께 답합니다.";

/// Chat-visible outcome of a command, applied in order by the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Hide everything currently on screen. The store is untouched.
    ClearView,
    /// Write to the shared store; later effects are skipped if this fails.
    Persist { user: String, text: String },
    /// Show only in this session.
    Local { user: String, text: String },
    AskModel(ModelJob),
}

fn local(user: &str, text: impl Into<String>) -> Effect {
    Effect::Local {
        user: user.to_string(),
        text: text.into(),
    }
}

/// Runs `raw` as a slash command for `identity`. Non-command input yields
/// no effects.
pub(crate) fn handle_command(raw: &str, identity: Option<&str>) -> Vec<Effect> {
    match parse_command(raw.trim()) {
        Some(parsed) => interpret(&parsed, identity),
        None => Vec::new(),
    }
}

pub(crate) fn interpret(cmd: &ParsedCommand, identity: Option<&str>) -> Vec<Effect> {
    match cmd.command.to_lowercase().as_str() {
        "clear" => vec![Effect::ClearView],
        "me" => match identity {
            Some(identity) => {
                let action = format!("* {identity} {}", cmd.rest());
                vec![local(identity, action.trim_end())]
            }
            None => Vec::new(),
        },
        "help" => vec![local(SYSTEM, HELP_TEXT)],
        "bot" => ask_freeman(cmd.rest(), identity),
        _ => vec![local(SYSTEM, format!("unknown command: /{}", cmd.command))],
    }
}

fn ask_freeman(question: String, identity: Option<&str>) -> Vec<Effect> {
    if question.trim().is_empty() {
        return vec![local(FREEMAN, ASK_FOR_QUESTION)];
    }
    let Some(identity) = identity else {
        return Vec::new();
    };
    vec![
        Effect::Persist {
            user: identity.to_string(),
            text: question.clone(),
        },
        local(SYSTEM, REQUESTING_NOTICE),
        Effect::AskModel(ModelJob {
            prompt: question,
            history: Vec::new(),
        }),
    ]
}

/// Everything a model round trip needs, cheap to clone into a worker.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) store: Arc<dyn MessageStore>,
    pub(crate) keys: KeyProvider,
    pub(crate) model: Arc<dyn CompletionModel>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ModelJob {
    pub(crate) prompt: String,
    pub(crate) history: Vec<ConversationTurn>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    /// The reply is in the store and will arrive through the feed.
    Replied,
    /// Text for a local-only error message.
    Failed(String),
}

impl ModelJob {
    /// Key lookup, model call and reply write. Exactly one of "reply
    /// persisted" or "failure reported" happens.
    pub(crate) fn run(&self, services: &Services) -> JobOutcome {
        let Some(api_key) = services.keys.fetch_key() else {
            return JobOutcome::Failed(MISSING_KEY.to_string());
        };

        let reply = match services
            .model
            .complete(&self.prompt, &api_key, &self.history)
        {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(error = %err, "freeman request failed");
                return JobOutcome::Failed(format!("Freeman 요청 실패: {err}"));
            }
        };

        match services.store.append(FREEMAN, &reply) {
            Ok(id) => {
                tracing::debug!(%id, "freeman reply stored");
                JobOutcome::Replied
            }
            Err(err) => {
                tracing::error!(error = %err, "freeman reply write failed");
                JobOutcome::Failed(format!("Freeman 응답 저장 실패: {err:#}"))
            }
        }
    }
}
