//! Echo command handler.
//!
//! With an argument the text is sent straight back. Without one the
//! handler asks for it and waits for the next message from the same
//! chat/user.

use async_trait::async_trait;

use crate::handler::{Handler, HandlerContext, HandlerError};
use crate::message::OutgoingResponse;
use crate::texts::get_text;

pub struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn execute(
        &self,
        ctx: &HandlerContext<'_>,
        argument: &str,
    ) -> Result<Vec<OutgoingResponse>, HandlerError> {
        let argument = argument.trim();
        if argument.is_empty() {
            ctx.request_followup();
            return Ok(vec![OutgoingResponse::text(get_text("echo.prompt"))]);
        }
        Ok(vec![OutgoingResponse::text(argument)])
    }
}
