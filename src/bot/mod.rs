//! Telegram transport.
//!
//! Converts platform updates into the core's inbound form, feeds them to
//! the command dispatcher, and delivers the resulting responses. Delivery
//! retries and platform quirks beyond text length live here, not in the
//! core.

mod outbound;
mod runtime;

use teloxide::adaptors::Throttle;
use teloxide::Bot;

pub use runtime::{build, run};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;
