//! Delete command handler.
//!
//! Deletes the message the command replied to.

use async_trait::async_trait;

use crate::handler::{Handler, HandlerContext, HandlerError};
use crate::message::OutgoingResponse;
use crate::texts::get_text;

pub struct Del;

#[async_trait]
impl Handler for Del {
    async fn execute(
        &self,
        ctx: &HandlerContext<'_>,
        _argument: &str,
    ) -> Result<Vec<OutgoingResponse>, HandlerError> {
        let Some(target) = ctx.reply_to() else {
            return Err(HandlerError::InvalidArgument(get_text("del.no_reply")));
        };
        Ok(vec![OutgoingResponse::Delete { target }])
    }
}
