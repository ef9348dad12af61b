use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) const FREEMAN: &str = "Freeman";
pub(crate) const SYSTEM: &str = "System";

/// Ids carrying this prefix were minted by the session, never by the store.
pub(crate) const LOCAL_ID_PREFIX: &str = "local-";

/// How many prior turns ride along with a mention-triggered model call.
pub(crate) const CONTEXT_TURNS: usize = 6;

const MENTION_NAMES: [&str; 3] = ["freeman", "프리먼", "프리맨"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub(crate) id: String,
    /// Assigned by the store; `None` while the write is pending.
    #[serde(default)]
    pub(crate) timestamp: Option<DateTime<Utc>>,
    pub(crate) user: String,
    pub(crate) text: String,
}

impl ChatMessage {
    pub(crate) fn local(seq: u64, user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: format!("{LOCAL_ID_PREFIX}{seq}"),
            timestamp: Some(Utc::now()),
            user: user.into(),
            text: text.into(),
        }
    }

    pub(crate) fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ConversationTurn {
    pub(crate) role: Role,
    pub(crate) content: String,
}

/// Builds the rolling model context: persisted messages from `identity` or the
/// Freeman persona, oldest first, keeping only the last `limit`.
pub(crate) fn conversation_turns(
    messages: &[ChatMessage],
    identity: &str,
    limit: usize,
) -> Vec<ConversationTurn> {
    let mut turns = messages
        .iter()
        .filter(|msg| !msg.is_local())
        .filter_map(|msg| {
            let role = if msg.user == FREEMAN {
                Role::Assistant
            } else if msg.user == identity {
                Role::User
            } else {
                return None;
            };
            Some(ConversationTurn {
                role,
                content: msg.text.clone(),
            })
        })
        .collect::<Vec<_>>();
    let overflow = turns.len().saturating_sub(limit);
    turns.drain(..overflow);
    turns
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum MentionMatch {
    /// Case-insensitive substring match; `freemanship` counts.
    #[default]
    Substring,
    /// The name must not touch a letter or digit on either side.
    Word,
}

pub(crate) fn mentions_assistant(text: &str, mode: MentionMatch) -> bool {
    let lowered = text.to_lowercase();
    MENTION_NAMES.iter().any(|name| match mode {
        MentionMatch::Substring => lowered.contains(name),
        MentionMatch::Word => lowered
            .match_indices(name)
            .any(|(start, found)| is_word_at(&lowered, start, start + found.len())),
    })
}

fn is_word_at(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(id: usize, user: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            timestamp: None,
            user: user.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn context_keeps_last_six_turns_in_order() {
        let messages = (0..10)
            .map(|i| {
                let user = if i % 2 == 0 { "a@b.com" } else { FREEMAN };
                persisted(i, user, &format!("turn {i}"))
            })
            .collect::<Vec<_>>();

        let turns = conversation_turns(&messages, "a@b.com", CONTEXT_TURNS);

        assert_eq!(turns.len(), 6);
        let contents = turns.iter().map(|t| t.content.as_str()).collect::<Vec<_>>();
        assert_eq!(
            contents,
            ["turn 4", "turn 5", "turn 6", "turn 7", "turn 8", "turn 9"]
        );
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn context_skips_other_users_and_local_messages() {
        let messages = vec![
            persisted(1, "other@b.com", "not mine"),
            persisted(2, "a@b.com", "mine"),
            ChatMessage::local(1, FREEMAN, "질문을 입력해주세요"),
            persisted(3, SYSTEM, "system"),
        ];

        let turns = conversation_turns(&messages, "a@b.com", CONTEXT_TURNS);

        assert_eq!(
            turns,
            vec![ConversationTurn {
                role: Role::User,
                content: "mine".to_string(),
            }]
        );
    }

    #[test]
    fn substring_mentions_match_all_spellings() {
        for text in [
            "hey freeman are you there",
            "프리먼 안녕",
            "프리맨?",
            "FreeMan!",
            "freemanship",
        ] {
            assert!(mentions_assistant(text, MentionMatch::Substring), "{text}");
        }
        assert!(!mentions_assistant("free man", MentionMatch::Substring));
    }

    #[test]
    fn word_mentions_reject_embedded_names() {
        assert!(mentions_assistant("hey freeman!", MentionMatch::Word));
        assert!(mentions_assistant("프리먼 안녕", MentionMatch::Word));
        assert!(!mentions_assistant("freemanship", MentionMatch::Word));
        assert!(!mentions_assistant("프리먼아", MentionMatch::Word));
    }

    #[test]
    fn local_ids_are_recognised() {
        assert!(ChatMessage::local(3, SYSTEM, "x").is_local());
        assert!(!persisted(3, SYSTEM, "x").is_local());
    }
}
