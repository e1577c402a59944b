//! Request dispatch.
//!
//! Runs one inbound message through resolution, authorization, execution
//! and recording, then normalizes the handler's responses for delivery.
//!
//! Resolution order:
//! 1. a bare repeat token replays the chat's last successful command;
//! 2. an open pending wait routes the whole text to the waiting handler,
//!    even when the text looks like a new command;
//! 3. otherwise the leading `/token` is looked up in the registry, and
//!    anything else is silently ignored (most chat messages are not
//!    commands at all).

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::access::{self, resolver::LevelResolver};
use crate::commands::{CommandDescriptor, CommandRegistry};
use crate::handler::{HandlerContext, HandlerError, HandlerSet};
use crate::message::{InboundMessage, OutgoingResponse, TextResponse};
use crate::state::{LastCommandStore, PendingWaitStore};
use crate::texts::get_text;
use crate::utils::chunk_segments;

/// Dispatch tuning supplied by configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Platform text limit in characters.
    pub text_limit: usize,

    /// Bare token that replays the chat's last command.
    pub repeat_token: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            text_limit: 4096,
            repeat_token: "!!".to_string(),
        }
    }
}

/// How an inbound message resolved to a handler.
struct Resolution<'a> {
    descriptor: &'a CommandDescriptor,
    argument: String,
    replay: bool,
}

/// Orchestrates one request from inbound message to outbound responses.
///
/// All collaborators are injected at construction; the dispatcher itself
/// holds no mutable state and is shared freely between request tasks.
pub struct Dispatcher {
    commands: Arc<CommandRegistry>,
    handlers: Arc<HandlerSet>,
    levels: LevelResolver,
    waits: Arc<PendingWaitStore>,
    last: Arc<LastCommandStore>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        commands: Arc<CommandRegistry>,
        handlers: Arc<HandlerSet>,
        levels: LevelResolver,
        waits: Arc<PendingWaitStore>,
        last: Arc<LastCommandStore>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            commands,
            handlers,
            levels,
            waits,
            last,
            config,
        }
    }

    /// Dispatch one inbound message.
    pub async fn dispatch(&self, message: &InboundMessage) -> Vec<OutgoingResponse> {
        let Some(resolution) = self.resolve(message) else {
            trace!("no command in message from {} in chat {}", message.user, message.chat);
            return Vec::new();
        };
        let descriptor = resolution.descriptor;

        let access = match self.levels.context(message.chat, message.user).await {
            Ok(access) => access,
            Err(err) => {
                error!(
                    "level lookup failed for user {} in chat {}: {err:#}",
                    message.user, message.chat
                );
                return vec![OutgoingResponse::text(get_text("dispatch.internal"))];
            }
        };

        if let Err(denied) = access::authorize(&access, descriptor) {
            info!(
                "denied /{} for user {} in chat {}: requires {}, has {}",
                descriptor.name(),
                message.user,
                message.chat,
                denied.required,
                denied.effective
            );
            let body = get_text("dispatch.denied")
                .replace("{required}", &denied.required.to_string())
                .replace("{effective}", &denied.effective.to_string());
            return vec![OutgoingResponse::text(body)];
        }

        let Some(handler) = self.handlers.get(descriptor.handler()) else {
            error!("no handler registered for {}", descriptor.handler());
            return vec![OutgoingResponse::text(get_text("dispatch.internal"))];
        };

        let ctx = HandlerContext::new(message, access, descriptor.handler());
        match handler.execute(&ctx, &resolution.argument).await {
            Ok(responses) => {
                // State is written only after a normal completion, so a
                // failed or cancelled execution leaves no trace behind.
                if let Some(pending) = ctx.requested_followup() {
                    self.waits.put(message.chat, message.user, pending);
                }
                if !resolution.replay {
                    self.last
                        .record(message.chat, descriptor.handler(), resolution.argument);
                }
                debug!(
                    "dispatched /{} for user {} in chat {}",
                    descriptor.name(),
                    message.user,
                    message.chat
                );
                self.normalize(responses)
            }
            Err(err) => failure_responses(descriptor, err),
        }
    }

    fn resolve(&self, message: &InboundMessage) -> Option<Resolution<'_>> {
        let text = message.text.trim();

        if text == self.config.repeat_token {
            let last = self.last.get(message.chat)?;
            let Some(descriptor) = self.commands.by_handler_id(last.handler) else {
                warn!("replay target {} is no longer registered", last.handler);
                return None;
            };
            debug!("replaying /{} in chat {}", descriptor.name(), message.chat);
            return Some(Resolution {
                descriptor,
                argument: last.argument,
                replay: true,
            });
        }

        if let Some(pending) = self.waits.take_if_present(message.chat, message.user) {
            let Some(descriptor) = self.commands.by_handler_id(pending) else {
                warn!("pending wait points at unregistered handler {}", pending);
                return None;
            };
            debug!(
                "continuing /{} for user {} in chat {}",
                descriptor.name(),
                message.user,
                message.chat
            );
            // The whole text is the answer, even if it looks like a command.
            return Some(Resolution {
                descriptor,
                argument: message.text.clone(),
                replay: false,
            });
        }

        let (token, argument) = parse_command(text)?;
        let descriptor = self.commands.resolve(token)?;
        Some(Resolution {
            descriptor,
            argument: argument.to_string(),
            replay: false,
        })
    }

    /// Expand oversized text responses into size-bounded chunks.
    fn normalize(&self, responses: Vec<OutgoingResponse>) -> Vec<OutgoingResponse> {
        let limit = self.config.text_limit;
        let mut out = Vec::with_capacity(responses.len());
        for response in responses {
            match response {
                OutgoingResponse::Text(text) if text.char_len() > limit => {
                    let style = text.style;
                    for chunk in chunk_segments(text.segments, limit) {
                        out.push(OutgoingResponse::Text(TextResponse::from_segments(
                            vec![chunk],
                            style,
                        )));
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}

/// Map a classified handler failure to its user-visible form. Only this
/// function decides what an error looks like in the chat.
fn failure_responses(descriptor: &CommandDescriptor, err: HandlerError) -> Vec<OutgoingResponse> {
    match err {
        HandlerError::InvalidArgument(reason) => {
            debug!("/{} rejected its argument: {}", descriptor.name(), reason);
            vec![OutgoingResponse::text(
                get_text("dispatch.invalid").replace("{reason}", &reason),
            )]
        }
        HandlerError::UpstreamUnavailable(detail) => {
            warn!("/{} upstream unavailable: {}", descriptor.name(), detail);
            vec![OutgoingResponse::text(get_text("dispatch.unavailable"))]
        }
        HandlerError::Internal(err) => {
            error!("/{} failed: {err:#}", descriptor.name());
            vec![OutgoingResponse::text(get_text("dispatch.internal"))]
        }
    }
}

/// Split `/token rest` into token and trimmed argument. The bot-name
/// suffix Telegram appends in groups (`/cmd@botname`) is stripped.
fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let (token, argument) = match rest.split_once(char::is_whitespace) {
        Some((token, argument)) => (token, argument.trim()),
        None => (rest, ""),
    };
    let token = token.split('@').next().unwrap_or(token);
    if token.is_empty() {
        return None;
    }
    Some((token, argument))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::access::resolver::StaticLevels;
    use crate::access::AccessLevel;
    use crate::cache::CacheRegistry;
    use crate::handler::{Handler, HandlerId};
    use crate::message::{ChatId, TextStyle, UserId};
    use crate::texts;

    const ADMIN_USER: UserId = UserId(100);
    const GUEST_USER: UserId = UserId(200);
    const CHAT: ChatId = ChatId(-1);

    const SAY: HandlerId = HandlerId("say");
    const ASK: HandlerId = HandlerId("ask");
    const SECRET: HandlerId = HandlerId("secret");
    const BROKEN: HandlerId = HandlerId("broken");
    const FLAKY: HandlerId = HandlerId("flaky");
    const WALL: HandlerId = HandlerId("wall");
    const MIXED: HandlerId = HandlerId("mixed");

    /// Echoes its argument back, prefixed so tests can tell replies apart.
    struct Say;

    #[async_trait]
    impl Handler for Say {
        async fn execute(
            &self,
            _ctx: &HandlerContext<'_>,
            argument: &str,
        ) -> Result<Vec<OutgoingResponse>, HandlerError> {
            Ok(vec![OutgoingResponse::text(format!("say:{argument}"))])
        }
    }

    /// Prompts for input when called bare, echoes the follow-up otherwise.
    struct Ask;

    #[async_trait]
    impl Handler for Ask {
        async fn execute(
            &self,
            ctx: &HandlerContext<'_>,
            argument: &str,
        ) -> Result<Vec<OutgoingResponse>, HandlerError> {
            if argument.trim().is_empty() {
                ctx.request_followup();
                return Ok(vec![OutgoingResponse::text("ask:?")]);
            }
            Ok(vec![OutgoingResponse::text(format!("ask:{argument}"))])
        }
    }

    /// Always fails with the configured error.
    struct Broken;

    #[async_trait]
    impl Handler for Broken {
        async fn execute(
            &self,
            _ctx: &HandlerContext<'_>,
            argument: &str,
        ) -> Result<Vec<OutgoingResponse>, HandlerError> {
            match argument {
                "upstream" => Err(HandlerError::UpstreamUnavailable("api down".into())),
                "internal" => Err(HandlerError::Internal(anyhow::anyhow!("boom"))),
                _ => Err(HandlerError::InvalidArgument("bad input".into())),
            }
        }
    }

    /// Requests a follow-up and then fails anyway.
    struct Flaky;

    #[async_trait]
    impl Handler for Flaky {
        async fn execute(
            &self,
            ctx: &HandlerContext<'_>,
            _argument: &str,
        ) -> Result<Vec<OutgoingResponse>, HandlerError> {
            ctx.request_followup();
            Err(HandlerError::Internal(anyhow::anyhow!("gave up")))
        }
    }

    /// Produces a long text followed by non-text payloads.
    struct Mixed;

    #[async_trait]
    impl Handler for Mixed {
        async fn execute(
            &self,
            _ctx: &HandlerContext<'_>,
            _argument: &str,
        ) -> Result<Vec<OutgoingResponse>, HandlerError> {
            use crate::message::{FileKind, FileSource, MessageRef};

            Ok(vec![
                OutgoingResponse::Text(TextResponse::from_segments(
                    vec!["a".repeat(10), "b".repeat(10)],
                    TextStyle::Plain,
                )),
                OutgoingResponse::Location {
                    latitude: 52.52,
                    longitude: 13.405,
                },
                OutgoingResponse::File {
                    kind: FileKind::Image,
                    source: FileSource::Url(url::Url::parse("https://example.com/cat.png").unwrap()),
                },
                OutgoingResponse::Delete {
                    target: MessageRef(7),
                },
            ])
        }
    }

    /// Produces a multi-segment wall of text.
    struct Wall;

    #[async_trait]
    impl Handler for Wall {
        async fn execute(
            &self,
            _ctx: &HandlerContext<'_>,
            _argument: &str,
        ) -> Result<Vec<OutgoingResponse>, HandlerError> {
            let segments = (0..6).map(|i| format!("line {i}\n")).collect();
            Ok(vec![OutgoingResponse::Text(TextResponse::from_segments(
                segments,
                TextStyle::Plain,
            ))])
        }
    }

    fn dispatcher() -> Dispatcher {
        dispatcher_with(DispatchConfig::default(), Duration::from_secs(60))
    }

    fn dispatcher_with(config: DispatchConfig, wait_ttl: Duration) -> Dispatcher {
        texts::init();

        let mut commands = CommandRegistry::new();
        let mut handlers = HandlerSet::new();
        let table: Vec<(CommandDescriptor, Arc<dyn Handler>)> = vec![
            (
                CommandDescriptor::new("say", &["s"], SAY, AccessLevel::Guest),
                Arc::new(Say),
            ),
            (
                CommandDescriptor::new("ask", &[], ASK, AccessLevel::Guest),
                Arc::new(Ask),
            ),
            (
                CommandDescriptor::new("secret", &[], SECRET, AccessLevel::Admin),
                Arc::new(Say),
            ),
            (
                CommandDescriptor::new("broken", &[], BROKEN, AccessLevel::Guest),
                Arc::new(Broken),
            ),
            (
                CommandDescriptor::new("flaky", &[], FLAKY, AccessLevel::Guest),
                Arc::new(Flaky),
            ),
            (
                CommandDescriptor::new("wall", &[], WALL, AccessLevel::Guest),
                Arc::new(Wall),
            ),
            (
                CommandDescriptor::new("mixed", &[], MIXED, AccessLevel::Guest),
                Arc::new(Mixed),
            ),
        ];
        for (descriptor, handler) in table {
            let id = descriptor.handler();
            commands.register(descriptor).unwrap();
            handlers.insert(id, handler).unwrap();
        }

        let levels = StaticLevels::new(
            HashMap::new(),
            HashMap::from([(ADMIN_USER.0, AccessLevel::Admin)]),
        );
        let resolver = LevelResolver::new(Arc::new(levels), &CacheRegistry::new());

        Dispatcher::new(
            Arc::new(commands),
            Arc::new(handlers),
            resolver,
            Arc::new(PendingWaitStore::new(wait_ttl)),
            Arc::new(LastCommandStore::new()),
            config,
        )
    }

    fn msg(user: UserId, text: &str) -> InboundMessage {
        InboundMessage {
            chat: CHAT,
            user,
            text: text.to_string(),
            reply_to: None,
            attachment: None,
            at: Utc::now(),
        }
    }

    fn bodies(responses: &[OutgoingResponse]) -> Vec<String> {
        responses
            .iter()
            .map(|r| match r {
                OutgoingResponse::Text(t) => t.body(),
                other => panic!("expected text response, got {other:?}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn unknown_commands_and_plain_chatter_are_silent() {
        let dispatcher = dispatcher();

        for text in ["/nope", "/nope args", "just chatting", "", "/"] {
            let responses = dispatcher.dispatch(&msg(GUEST_USER, text)).await;
            assert!(responses.is_empty(), "{text:?} should be silent");
        }
    }

    #[tokio::test]
    async fn resolves_aliases_and_bot_name_suffix() {
        let dispatcher = dispatcher();

        let responses = dispatcher.dispatch(&msg(GUEST_USER, "/S hello")).await;
        assert_eq!(bodies(&responses), ["say:hello"]);

        let responses = dispatcher
            .dispatch(&msg(GUEST_USER, "/say@hermes_bot hi there"))
            .await;
        assert_eq!(bodies(&responses), ["say:hi there"]);
    }

    #[tokio::test]
    async fn denies_below_minimum_level_without_recording() {
        let dispatcher = dispatcher();

        let responses = dispatcher.dispatch(&msg(GUEST_USER, "/secret x")).await;
        assert_eq!(responses.len(), 1);
        assert!(bodies(&responses)[0].contains("admin"));

        // the denied dispatch must not have become the replay target
        let responses = dispatcher.dispatch(&msg(GUEST_USER, "!!")).await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn admin_user_passes_in_guest_chat() {
        let dispatcher = dispatcher();

        let responses = dispatcher.dispatch(&msg(ADMIN_USER, "/secret x")).await;
        assert_eq!(bodies(&responses), ["say:x"]);
    }

    #[tokio::test]
    async fn replay_reruns_last_command_without_retargeting() {
        let dispatcher = dispatcher();

        dispatcher.dispatch(&msg(GUEST_USER, "/say first")).await;

        let replayed = dispatcher.dispatch(&msg(GUEST_USER, "!!")).await;
        assert_eq!(bodies(&replayed), ["say:first"]);

        // the replay itself was not recorded, so a second replay still
        // reruns the original command
        let replayed = dispatcher.dispatch(&msg(GUEST_USER, "!!")).await;
        assert_eq!(bodies(&replayed), ["say:first"]);
    }

    #[tokio::test]
    async fn replay_with_no_history_is_silent() {
        let dispatcher = dispatcher();
        let responses = dispatcher.dispatch(&msg(GUEST_USER, "!!")).await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_never_becomes_the_replay_target() {
        let dispatcher = dispatcher();

        dispatcher.dispatch(&msg(GUEST_USER, "/say kept")).await;
        let failed = dispatcher.dispatch(&msg(GUEST_USER, "/broken x")).await;
        assert_eq!(failed.len(), 1);

        let replayed = dispatcher.dispatch(&msg(GUEST_USER, "!!")).await;
        assert_eq!(bodies(&replayed), ["say:kept"]);
    }

    #[tokio::test]
    async fn pending_wait_routes_the_next_message() {
        let dispatcher = dispatcher();

        let prompt = dispatcher.dispatch(&msg(GUEST_USER, "/ask")).await;
        assert_eq!(bodies(&prompt), ["ask:?"]);

        let answered = dispatcher.dispatch(&msg(GUEST_USER, "blue")).await;
        assert_eq!(bodies(&answered), ["ask:blue"]);

        // the slot was consumed, plain text is silent again
        let after = dispatcher.dispatch(&msg(GUEST_USER, "blue")).await;
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn pending_wait_wins_over_command_like_text() {
        let dispatcher = dispatcher();

        dispatcher.dispatch(&msg(GUEST_USER, "/ask")).await;
        let answered = dispatcher.dispatch(&msg(GUEST_USER, "/say hijack")).await;
        assert_eq!(bodies(&answered), ["ask:/say hijack"]);
    }

    #[tokio::test]
    async fn pending_wait_is_per_user_and_per_chat() {
        let dispatcher = dispatcher();

        dispatcher.dispatch(&msg(GUEST_USER, "/ask")).await;

        // a different user in the same chat is not captured by the wait
        let other = dispatcher.dispatch(&msg(ADMIN_USER, "hello")).await;
        assert!(other.is_empty());

        let answered = dispatcher.dispatch(&msg(GUEST_USER, "hello")).await;
        assert_eq!(bodies(&answered), ["ask:hello"]);
    }

    #[tokio::test]
    async fn expired_wait_falls_back_to_command_parsing() {
        let dispatcher = dispatcher_with(DispatchConfig::default(), Duration::from_millis(5));

        dispatcher.dispatch(&msg(GUEST_USER, "/ask")).await;
        tokio::time::sleep(Duration::from_millis(25)).await;

        let responses = dispatcher.dispatch(&msg(GUEST_USER, "/say back")).await;
        assert_eq!(bodies(&responses), ["say:back"]);
    }

    #[tokio::test]
    async fn no_wait_is_left_behind_when_the_handler_fails() {
        let dispatcher = dispatcher();

        let failed = dispatcher.dispatch(&msg(GUEST_USER, "/flaky")).await;
        assert_eq!(failed.len(), 1);

        // the follow-up request was not committed
        let after = dispatcher.dispatch(&msg(GUEST_USER, "anything")).await;
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn handler_failures_map_to_their_user_visible_forms() {
        let dispatcher = dispatcher();

        let invalid = dispatcher.dispatch(&msg(GUEST_USER, "/broken arg")).await;
        assert!(bodies(&invalid)[0].contains("bad input"));

        let upstream = dispatcher.dispatch(&msg(GUEST_USER, "/broken upstream")).await;
        assert_eq!(upstream.len(), 1);
        assert!(!bodies(&upstream)[0].contains("api down"));

        let internal = dispatcher.dispatch(&msg(GUEST_USER, "/broken internal")).await;
        assert_eq!(internal.len(), 1);
        assert!(!bodies(&internal)[0].contains("boom"));
    }

    #[tokio::test]
    async fn oversized_text_is_chunked_between_segments() {
        let config = DispatchConfig {
            text_limit: 16,
            ..Default::default()
        };
        let dispatcher = dispatcher_with(config, Duration::from_secs(60));

        let responses = dispatcher.dispatch(&msg(GUEST_USER, "/wall")).await;
        assert!(responses.len() > 1);

        let joined = bodies(&responses).concat();
        assert_eq!(joined, (0..6).map(|i| format!("line {i}\n")).collect::<String>());
        for body in bodies(&responses) {
            assert!(body.chars().count() <= 16);
        }
    }

    #[tokio::test]
    async fn short_text_passes_through_unchunked() {
        let dispatcher = dispatcher();
        let responses = dispatcher.dispatch(&msg(GUEST_USER, "/wall")).await;
        assert_eq!(responses.len(), 1);
    }

    #[tokio::test]
    async fn non_text_payloads_pass_through_normalization_in_order() {
        let config = DispatchConfig {
            text_limit: 16,
            ..Default::default()
        };
        let dispatcher = dispatcher_with(config, Duration::from_secs(60));

        let responses = dispatcher.dispatch(&msg(GUEST_USER, "/mixed")).await;

        // 20 characters over a 16-character limit splits into its two
        // segments; everything else is untouched and keeps its position
        assert_eq!(responses.len(), 5);
        assert!(matches!(&responses[0], OutgoingResponse::Text(t) if t.body() == "a".repeat(10)));
        assert!(matches!(&responses[1], OutgoingResponse::Text(t) if t.body() == "b".repeat(10)));
        assert!(matches!(responses[2], OutgoingResponse::Location { .. }));
        assert!(matches!(responses[3], OutgoingResponse::File { .. }));
        assert!(matches!(responses[4], OutgoingResponse::Delete { .. }));
    }
}
