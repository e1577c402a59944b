//! Pending-wait tracking.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::handler::HandlerId;
use crate::message::{ChatId, UserId};

#[derive(Debug, Clone, Copy)]
struct PendingWait {
    handler: HandlerId,
    created: Instant,
}

/// Single-slot store of pending waits per (chat, user).
///
/// A wait marks the next free-form message from that chat/user as the
/// argument of a specific handler. Per-key operations are atomic, which
/// makes the slot a single-consumption continuation even when two
/// messages from the same user race: at most one dispatch observes it.
pub struct PendingWaitStore {
    entries: DashMap<(ChatId, UserId), PendingWait>,
    ttl: Duration,
}

impl PendingWaitStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Open the wait slot for a chat/user pair, replacing any open one.
    pub fn put(&self, chat: ChatId, user: UserId, handler: HandlerId) {
        self.entries.insert(
            (chat, user),
            PendingWait {
                handler,
                created: Instant::now(),
            },
        );
        debug!("pending wait for user {} in chat {} -> {}", user, chat, handler);
    }

    /// Atomically consume the wait slot, if one is open.
    ///
    /// An entry older than the TTL reports absent; the read itself removes
    /// it, so a stale wait can never be matched by a later message.
    pub fn take_if_present(&self, chat: ChatId, user: UserId) -> Option<HandlerId> {
        let (_, wait) = self.entries.remove(&(chat, user))?;
        if wait.created.elapsed() > self.ttl {
            debug!("pending wait for user {} in chat {} expired", user, chat);
            return None;
        }
        Some(wait.handler)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
