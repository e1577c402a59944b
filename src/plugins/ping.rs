//! Ping command handler.
//!
//! The cheapest way to see the bot is alive and dispatching.

use async_trait::async_trait;

use crate::handler::{Handler, HandlerContext, HandlerError};
use crate::message::OutgoingResponse;
use crate::texts::get_text;

pub struct Ping;

#[async_trait]
impl Handler for Ping {
    async fn execute(
        &self,
        _ctx: &HandlerContext<'_>,
        _argument: &str,
    ) -> Result<Vec<OutgoingResponse>, HandlerError> {
        Ok(vec![OutgoingResponse::text(get_text("ping.pong"))])
    }
}
