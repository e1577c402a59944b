//! Help command handler.
//!
//! Lists the commands the requester can actually run at their effective
//! access level. One segment per command keeps long lists chunkable.

use async_trait::async_trait;

use crate::access::AccessLevel;
use crate::commands::CommandDescriptor;
use crate::handler::{Handler, HandlerContext, HandlerError};
use crate::message::{OutgoingResponse, TextResponse, TextStyle};
use crate::texts::get_text;

/// What help shows about one command.
pub struct CommandSummary {
    name: &'static str,
    min_level: AccessLevel,
}

impl From<&CommandDescriptor> for CommandSummary {
    fn from(descriptor: &CommandDescriptor) -> Self {
        Self {
            name: descriptor.name(),
            min_level: descriptor.min_level(),
        }
    }
}

pub struct Help {
    commands: Vec<CommandSummary>,
}

impl Help {
    pub fn new(commands: Vec<CommandSummary>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl Handler for Help {
    async fn execute(
        &self,
        ctx: &HandlerContext<'_>,
        _argument: &str,
    ) -> Result<Vec<OutgoingResponse>, HandlerError> {
        let level = ctx.access.effective_level();

        let mut segments = vec![format!("{}\n", get_text("help.header"))];
        for command in self.commands.iter().filter(|c| c.min_level <= level) {
            segments.push(format!("/{}\n", command.name));
        }

        Ok(vec![OutgoingResponse::Text(TextResponse::from_segments(
            segments,
            TextStyle::Html,
        ))])
    }
}
