//! Polling runtime.
//!
//! One endpoint: every message update is reduced to an `InboundMessage`,
//! dispatched, and the responses delivered back to the originating chat.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::info;

use super::{outbound, ThrottledBot};
use crate::message::{Attachment, ChatId, InboundMessage, MessageRef, UserId};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<crate::dispatch::Dispatcher>,
}

/// Build the Telegram dispatcher around the command core.
pub fn build(
    bot: ThrottledBot,
    dispatcher: Arc<crate::dispatch::Dispatcher>,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    let state = AppState { dispatcher };

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Run the bot in polling mode.
pub async fn run(
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>,
) {
    info!("Starting bot in polling mode...");
    dispatcher.dispatch().await;
}

fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    Update::filter_message().endpoint(on_message)
}

async fn on_message(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(inbound) = to_inbound(&msg) else {
        return Ok(());
    };

    let responses = state.dispatcher.dispatch(&inbound).await;
    outbound::deliver(&bot, inbound.chat, responses).await
}

/// Reduce a platform message to the fields the core dispatches on.
///
/// Messages without a sender (channel posts) and messages from other bots
/// are ignored.
fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from.as_ref()?;
    if user.is_bot {
        return None;
    }

    let text = msg
        .text()
        .or_else(|| msg.caption())
        .unwrap_or_default()
        .to_string();

    Some(InboundMessage {
        chat: ChatId(msg.chat.id.0),
        user: UserId(user.id.0),
        text,
        reply_to: msg.reply_to_message().map(|reply| MessageRef(reply.id.0)),
        attachment: attachment_of(msg),
        at: msg.date,
    })
}

fn attachment_of(msg: &Message) -> Option<Attachment> {
    if let Some(sizes) = msg.photo() {
        return sizes.last().map(|photo| Attachment {
            file_id: photo.file.id.clone(),
        });
    }
    msg.document().map(|doc| Attachment {
        file_id: doc.file.id.clone(),
    })
}
