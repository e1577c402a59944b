//! Hermes - Command-Dispatch Telegram Bot Backend
//!
//! Receives inbound messages, resolves each to exactly one registered
//! command handler, and returns the handler's responses.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `cache` - LRU-based caching with Moka
//! - `access` - Access levels, authorization, cached level lookups
//! - `commands` - Command registry (token -> handler metadata)
//! - `handler` - Handler capability and handler registry
//! - `state` - Pending waits and replay bookkeeping
//! - `dispatch` - The per-request dispatch pipeline
//! - `texts` - User-visible message catalog
//! - `plugins` - Built-in command handlers (extensible)
//! - `bot` - Telegram transport (polling, with Throttle for rate limiting)

mod access;
mod bot;
mod cache;
mod commands;
mod config;
mod dispatch;
mod handler;
mod message;
mod plugins;
mod state;
mod texts;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use access::resolver::LevelResolver;
use cache::CacheRegistry;
use config::Config;
use state::{LastCommandStore, PendingWaitStore};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // Initialize logging with sensible defaults
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hermes=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Hermes bot...");

    let config = Config::from_env();
    info!("Configuration loaded successfully");

    texts::init();

    let caches = Arc::new(CacheRegistry::new());
    info!("Cache registry initialized");

    // Build the command registry and handler set; token or id overlap
    // aborts startup here rather than shadowing silently.
    let (command_registry, handler_set) = plugins::register_all()?;
    info!("Registered {} command(s)", command_registry.len());

    let levels = LevelResolver::new(Arc::new(config.static_levels()), &caches);
    let waits = Arc::new(PendingWaitStore::new(config.wait_ttl));
    let last = Arc::new(LastCommandStore::new());

    let dispatcher = Arc::new(dispatch::Dispatcher::new(
        Arc::new(command_registry),
        Arc::new(handler_set),
        levels,
        waits,
        last,
        config.dispatch(),
    ));

    // Throttle respects Telegram's rate limits:
    // - 30 messages per second globally
    // - 1 message per second to the same chat
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let telegram = bot::build(bot, dispatcher);
    bot::run(telegram).await;

    Ok(())
}
