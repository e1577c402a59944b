//! Replay bookkeeping.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::handler::HandlerId;
use crate::message::ChatId;

/// The most recent successfully dispatched command in a chat.
#[derive(Debug, Clone)]
pub struct LastCommand {
    pub handler: HandlerId,
    pub argument: String,
    pub at: DateTime<Utc>,
}

/// Per-chat record of the last successful dispatch, overwrite semantics.
///
/// Whole records are written and read atomically per key, so a reader
/// never observes a handler paired with another write's argument.
#[derive(Debug, Default)]
pub struct LastCommandStore {
    entries: DashMap<ChatId, LastCommand>,
}

impl LastCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, chat: ChatId, handler: HandlerId, argument: impl Into<String>) {
        self.entries.insert(
            chat,
            LastCommand {
                handler,
                argument: argument.into(),
                at: Utc::now(),
            },
        );
        debug!("last command for chat {} -> {}", chat, handler);
    }

    pub fn get(&self, chat: ChatId) -> Option<LastCommand> {
        self.entries.get(&chat).map(|entry| entry.value().clone())
    }
}
