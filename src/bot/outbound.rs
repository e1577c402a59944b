//! Outbound delivery.

use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use tracing::debug;

use super::ThrottledBot;
use crate::message::{ChatId, FileKind, FileSource, OutgoingResponse, TextStyle};

/// Deliver the dispatcher's responses to a chat, in order.
pub async fn deliver(
    bot: &ThrottledBot,
    chat: ChatId,
    responses: Vec<OutgoingResponse>,
) -> anyhow::Result<()> {
    let chat = teloxide::types::ChatId(chat.0);
    debug!("delivering {} response(s) to chat {}", responses.len(), chat);

    for response in responses {
        match response {
            OutgoingResponse::Text(text) => {
                let request = bot.send_message(chat, text.body());
                match text.style {
                    TextStyle::Plain => request.await?,
                    TextStyle::Html => request.parse_mode(ParseMode::Html).await?,
                    TextStyle::Markdown => request.parse_mode(ParseMode::MarkdownV2).await?,
                };
            }
            OutgoingResponse::File { kind, source } => {
                let input = match source {
                    FileSource::Url(url) => InputFile::url(url),
                    FileSource::PlatformId(id) => InputFile::file_id(id),
                };
                match kind {
                    FileKind::Image => {
                        bot.send_photo(chat, input).await?;
                    }
                    FileKind::Document => {
                        bot.send_document(chat, input).await?;
                    }
                }
            }
            OutgoingResponse::Location {
                latitude,
                longitude,
            } => {
                bot.send_location(chat, latitude, longitude).await?;
            }
            OutgoingResponse::Delete { target } => {
                bot.delete_message(chat, MessageId(target.0)).await?;
            }
        }
    }

    Ok(())
}
