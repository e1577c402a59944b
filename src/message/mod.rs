//! Message model shared by the dispatch core and the transport.
//!
//! Inbound messages arrive already reduced to the fields the core
//! dispatches on; outbound responses are tagged variants the transport
//! knows how to deliver.

use std::fmt;

use chrono::{DateTime, Utc};
use url::Url;

/// Chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// User identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub u64);

/// Reference to a platform message, used for replies and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub i32);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attachment carried by an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Platform file identifier.
    pub file_id: String,
}

/// One inbound message as the dispatcher sees it.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat: ChatId,
    pub user: UserId,

    /// Raw text (or caption) of the message; empty when absent.
    pub text: String,

    /// Message this one replied to, if any.
    pub reply_to: Option<MessageRef>,

    /// Attachment reference, if any.
    pub attachment: Option<Attachment>,

    pub at: DateTime<Utc>,
}

/// Formatting style of a text response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    #[default]
    Plain,
    Html,
    #[allow(dead_code)]
    Markdown,
}

/// A text response built from ordered segments.
///
/// Segments are the indivisible units the chunker may split between. A
/// handler that emits one formatted block per segment gets size-bounded
/// messages with the markup intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub segments: Vec<String>,
    pub style: TextStyle,
}

impl TextResponse {
    /// Single-segment plain text.
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            segments: vec![body.into()],
            style: TextStyle::Plain,
        }
    }

    /// Single-segment HTML text.
    #[allow(dead_code)]
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            segments: vec![body.into()],
            style: TextStyle::Html,
        }
    }

    pub fn from_segments(segments: Vec<String>, style: TextStyle) -> Self {
        Self { segments, style }
    }

    /// Full body, segments concatenated in order.
    pub fn body(&self) -> String {
        self.segments.concat()
    }

    /// Total character count across all segments.
    pub fn char_len(&self) -> usize {
        self.segments.iter().map(|s| s.chars().count()).sum()
    }
}

/// Kind of file a handler wants delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum FileKind {
    Image,
    Document,
}

/// Where an outgoing file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum FileSource {
    /// Remote URL the platform fetches itself.
    Url(Url),
    /// File already known to the platform.
    PlatformId(String),
}

/// One outbound response produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingResponse {
    Text(TextResponse),
    File { kind: FileKind, source: FileSource },
    Location { latitude: f64, longitude: f64 },
    Delete { target: MessageRef },
}

impl OutgoingResponse {
    /// Single plain-text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(TextResponse::plain(body))
    }

    /// Single HTML response.
    #[allow(dead_code)]
    pub fn html(body: impl Into<String>) -> Self {
        Self::Text(TextResponse::html(body))
    }
}
