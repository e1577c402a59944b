//! Configuration module.
//!
//! Loads configuration from environment variables, plus an optional JSON
//! access map assigning per-chat and per-user levels.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use serde::Deserialize;

use crate::access::resolver::StaticLevels;
use crate::access::AccessLevel;
use crate::dispatch::DispatchConfig;

/// Per-chat and per-user levels loaded from the ACCESS_MAP file.
///
/// ```json
/// { "chats": { "-100123": "user" }, "users": { "4567": "admin" } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessMap {
    #[serde(default)]
    pub chats: HashMap<i64, AccessLevel>,

    #[serde(default)]
    pub users: HashMap<u64, AccessLevel>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,

    /// Owner user IDs (comma-separated) - granted Admin everywhere.
    pub owner_ids: Vec<u64>,

    /// Configured chat/user access levels.
    pub access: AccessMap,

    /// Platform text limit in characters.
    pub text_limit: usize,

    /// How long a pending wait stays consumable.
    pub wait_ttl: Duration,

    /// Bare token that replays the chat's last command.
    pub repeat_token: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set or the access
    /// map file is unreadable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let owner_ids = env::var("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        let access = match env::var("ACCESS_MAP") {
            Ok(path) => {
                let raw = fs::read_to_string(&path)
                    .unwrap_or_else(|e| panic!("cannot read ACCESS_MAP {path}: {e}"));
                serde_json::from_str(&raw)
                    .unwrap_or_else(|e| panic!("invalid ACCESS_MAP {path}: {e}"))
            }
            Err(_) => AccessMap::default(),
        };

        let text_limit = env::var("TEXT_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4096);

        let wait_ttl = env::var("WAIT_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let repeat_token = env::var("REPEAT_TOKEN").unwrap_or_else(|_| "!!".to_string());

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            owner_ids,
            access,
            text_limit,
            wait_ttl,
            repeat_token,
        }
    }

    /// Static level source combining the access map and the owner list.
    pub fn static_levels(&self) -> StaticLevels {
        let mut levels = StaticLevels::new(self.access.chats.clone(), self.access.users.clone());
        for &owner in &self.owner_ids {
            levels.grant_user(owner, AccessLevel::Admin);
        }
        levels
    }

    /// Dispatch tuning derived from this config.
    pub fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            text_limit: self.text_limit,
            repeat_token: self.repeat_token.clone(),
        }
    }
}
