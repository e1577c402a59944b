//! Built-in command handlers.
//!
//! Add new commands by:
//! 1. Creating a handler file in this directory
//! 2. Adding `pub mod your_handler;` below
//! 3. Adding a descriptor and handler to `register_all`

pub mod del;
pub mod echo;
pub mod help;
pub mod ping;

use std::sync::Arc;

use crate::access::AccessLevel;
use crate::commands::{CommandDescriptor, CommandRegistry};
use crate::handler::{HandlerId, HandlerSet};

pub const PING: HandlerId = HandlerId("ping");
pub const ECHO: HandlerId = HandlerId("echo");
pub const HELP: HandlerId = HandlerId("help");
pub const DEL: HandlerId = HandlerId("del");

/// Build the command registry and handler set for all built-ins.
///
/// Any overlap in tokens or handler ids is a configuration error and
/// aborts startup.
pub fn register_all() -> anyhow::Result<(CommandRegistry, HandlerSet)> {
    let descriptors = [
        CommandDescriptor::new("help", &["start"], HELP, AccessLevel::Guest),
        CommandDescriptor::new("ping", &[], PING, AccessLevel::Guest),
        CommandDescriptor::new("echo", &["say"], ECHO, AccessLevel::User),
        CommandDescriptor::new("del", &["rm"], DEL, AccessLevel::Admin),
    ];

    let summaries = descriptors.iter().map(help::CommandSummary::from).collect();

    let mut commands = CommandRegistry::new();
    for descriptor in descriptors {
        commands.register(descriptor)?;
    }

    let mut handlers = HandlerSet::new();
    handlers.insert(HELP, Arc::new(help::Help::new(summaries)))?;
    handlers.insert(PING, Arc::new(ping::Ping))?;
    handlers.insert(ECHO, Arc::new(echo::Echo))?;
    handlers.insert(DEL, Arc::new(del::Del))?;

    Ok((commands, handlers))
}
