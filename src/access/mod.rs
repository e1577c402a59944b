//! Access control.
//!
//! Chats and users each carry a configured access level; the effective
//! level of a request is the higher of the two, so a privileged user keeps
//! privilege in an unprivileged chat and vice versa.
//!
//! `authorize` is a pure function of the resolved context and the command
//! descriptor. Denied requests never reach a handler and never touch the
//! dispatch stores.

pub mod resolver;

use std::fmt;

use serde::Deserialize;

use crate::commands::CommandDescriptor;
use crate::message::{ChatId, UserId};

/// Ordered permission tier of a chat or user.
///
/// Levels compare numerically: `Guest < User < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    Guest,
    User,
    Admin,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessLevel::Guest => "guest",
            AccessLevel::User => "user",
            AccessLevel::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Resolved access levels for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
    pub chat: ChatId,
    pub chat_level: AccessLevel,
    pub user: UserId,
    pub user_level: AccessLevel,
}

impl AccessContext {
    /// The level the request is judged at: max of chat and user level.
    pub fn effective_level(&self) -> AccessLevel {
        self.chat_level.max(self.user_level)
    }
}

/// Denied outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub required: AccessLevel,
    pub effective: AccessLevel,
}

/// Check whether the request may invoke the command.
pub fn authorize(ctx: &AccessContext, descriptor: &CommandDescriptor) -> Result<(), AccessDenied> {
    let effective = ctx.effective_level();
    if effective >= descriptor.min_level() {
        Ok(())
    } else {
        Err(AccessDenied {
            required: descriptor.min_level(),
            effective,
        })
    }
}
