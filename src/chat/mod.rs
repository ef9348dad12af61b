//! Chat core: parsing composer input, interpreting slash commands and owning
//! the session state the screen renders from.

mod command;
mod controller;
mod interpreter;
mod types;

pub(crate) use controller::{AuthState, ChatSession, FeedState, IdentityEvent, JobMode};
pub(crate) use interpreter::Services;
pub(crate) use types::{ChatMessage, ConversationTurn, MentionMatch, Role, FREEMAN, SYSTEM};
