//! Access-level lookup with caching.
//!
//! Level sources may sit behind a database or a remote API, so the
//! resolver fronts them with short-lived caches keyed by chat and user id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{AccessContext, AccessLevel};
use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::message::{ChatId, UserId};

/// Source of configured access levels for chats and users.
#[async_trait]
pub trait LevelSource: Send + Sync {
    async fn chat_level(&self, chat: ChatId) -> anyhow::Result<AccessLevel>;
    async fn user_level(&self, user: UserId) -> anyhow::Result<AccessLevel>;
}

/// Level source backed by static configuration.
///
/// Anything not listed resolves to `Guest`.
#[derive(Debug, Clone, Default)]
pub struct StaticLevels {
    chats: HashMap<i64, AccessLevel>,
    users: HashMap<u64, AccessLevel>,
}

impl StaticLevels {
    pub fn new(chats: HashMap<i64, AccessLevel>, users: HashMap<u64, AccessLevel>) -> Self {
        Self { chats, users }
    }

    /// Grant a user a level, keeping the higher one if already listed.
    pub fn grant_user(&mut self, user: u64, level: AccessLevel) {
        let entry = self.users.entry(user).or_default();
        *entry = (*entry).max(level);
    }

    /// Grant a chat a level, keeping the higher one if already listed.
    #[allow(dead_code)]
    pub fn grant_chat(&mut self, chat: i64, level: AccessLevel) {
        let entry = self.chats.entry(chat).or_default();
        *entry = (*entry).max(level);
    }
}

#[async_trait]
impl LevelSource for StaticLevels {
    async fn chat_level(&self, chat: ChatId) -> anyhow::Result<AccessLevel> {
        Ok(self.chats.get(&chat.0).copied().unwrap_or_default())
    }

    async fn user_level(&self, user: UserId) -> anyhow::Result<AccessLevel> {
        Ok(self.users.get(&user.0).copied().unwrap_or_default())
    }
}

/// Caching front for a level source.
#[derive(Clone)]
pub struct LevelResolver {
    source: Arc<dyn LevelSource>,
    chats: TypedCache<i64, AccessLevel>,
    users: TypedCache<u64, AccessLevel>,
}

impl LevelResolver {
    pub fn new(source: Arc<dyn LevelSource>, caches: &CacheRegistry) -> Self {
        let config = CacheConfig::with_capacity(10_000)
            .ttl(Duration::from_secs(300)) // 5 minutes
            .tti(Duration::from_secs(120)); // 2 minutes idle

        Self {
            source,
            chats: caches.get_or_create("chat_levels", config.clone()),
            users: caches.get_or_create("user_levels", config),
        }
    }

    pub async fn chat_level(&self, chat: ChatId) -> anyhow::Result<AccessLevel> {
        if let Some(level) = self.chats.get(&chat.0) {
            debug!("level cache hit for chat {}", chat);
            return Ok(level);
        }
        let level = self.source.chat_level(chat).await?;
        self.chats.insert(chat.0, level);
        Ok(level)
    }

    pub async fn user_level(&self, user: UserId) -> anyhow::Result<AccessLevel> {
        if let Some(level) = self.users.get(&user.0) {
            debug!("level cache hit for user {}", user);
            return Ok(level);
        }
        let level = self.source.user_level(user).await?;
        self.users.insert(user.0, level);
        Ok(level)
    }

    /// Build the access context for one request.
    pub async fn context(&self, chat: ChatId, user: UserId) -> anyhow::Result<AccessContext> {
        Ok(AccessContext {
            chat,
            chat_level: self.chat_level(chat).await?,
            user,
            user_level: self.user_level(user).await?,
        })
    }
}
