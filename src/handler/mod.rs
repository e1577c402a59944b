//! Handler capability and the startup handler registry.
//!
//! Every command is backed by a `Handler` instance constructed at startup
//! and registered under a stable `HandlerId`. The dispatcher looks handlers
//! up by id, so replay and continuations work across the whole handler set
//! without knowing concrete types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::access::AccessContext;
use crate::message::{Attachment, ChatId, InboundMessage, MessageRef, OutgoingResponse, UserId};

/// Stable identifier a handler is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub &'static str);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Classified failure a handler may signal.
///
/// Handlers never send messages on the error path; the dispatcher alone
/// decides what becomes user-visible.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The argument was understood but rejected.
    #[error("{0}")]
    InvalidArgument(String),

    /// A third-party service the handler depends on failed.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Unexpected failure. Full detail is logged, never shown to the chat.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Per-request context passed to a handler.
pub struct HandlerContext<'a> {
    /// The inbound message being dispatched.
    pub message: &'a InboundMessage,

    /// Resolved access levels for the request.
    pub access: AccessContext,

    handler: HandlerId,
    followup: Mutex<Option<HandlerId>>,
}

impl<'a> HandlerContext<'a> {
    pub fn new(message: &'a InboundMessage, access: AccessContext, handler: HandlerId) -> Self {
        Self {
            message,
            access,
            handler,
            followup: Mutex::new(None),
        }
    }

    pub fn chat(&self) -> ChatId {
        self.message.chat
    }

    pub fn user(&self) -> UserId {
        self.message.user
    }

    pub fn reply_to(&self) -> Option<MessageRef> {
        self.message.reply_to
    }

    #[allow(dead_code)]
    pub fn attachment(&self) -> Option<&Attachment> {
        self.message.attachment.as_ref()
    }

    /// Ask for the next free-form message from this chat/user.
    ///
    /// The wait is committed by the dispatcher only when the handler
    /// returns success, so an execution that fails or is cancelled midway
    /// leaves no slot behind.
    pub fn request_followup(&self) {
        *self.followup.lock() = Some(self.handler);
    }

    /// Handler the follow-up should route to, if one was requested.
    pub fn requested_followup(&self) -> Option<HandlerId> {
        *self.followup.lock()
    }
}

/// A unit of logic producing responses for one command.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn execute(
        &self,
        ctx: &HandlerContext<'_>,
        argument: &str,
    ) -> Result<Vec<OutgoingResponse>, HandlerError>;
}

/// Registering the same handler id twice is a startup configuration error.
#[derive(Debug, Error)]
#[error("handler '{0}' registered twice")]
pub struct DuplicateHandler(pub HandlerId);

/// Startup registry mapping handler ids to constructed instances.
#[derive(Default)]
pub struct HandlerSet {
    handlers: HashMap<HandlerId, Arc<dyn Handler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler instance under its id.
    pub fn insert(
        &mut self,
        id: HandlerId,
        handler: Arc<dyn Handler>,
    ) -> Result<(), DuplicateHandler> {
        if self.handlers.contains_key(&id) {
            return Err(DuplicateHandler(id));
        }
        self.handlers.insert(id, handler);
        Ok(())
    }

    pub fn get(&self, id: HandlerId) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&id).cloned()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
