//! Command registry.
//!
//! Static mapping from command tokens to handler metadata, built once at
//! startup from the registration table and read-only afterwards. Token
//! matching is case-insensitive exact match against the canonical name or
//! any alias; there is no prefix or fuzzy matching.

use std::collections::HashMap;

use thiserror::Error;

use crate::access::AccessLevel;
use crate::handler::HandlerId;

/// Immutable metadata for one registered command.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: HandlerId,
    min_level: AccessLevel,
}

impl CommandDescriptor {
    pub const fn new(
        name: &'static str,
        aliases: &'static [&'static str],
        handler: HandlerId,
        min_level: AccessLevel,
    ) -> Self {
        Self {
            name,
            aliases,
            handler,
            min_level,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[allow(dead_code)]
    pub fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    pub fn min_level(&self) -> AccessLevel {
        self.min_level
    }
}

/// Startup configuration errors. Overlapping tokens must fail fast rather
/// than silently shadow each other.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command token '{token}' registered by both '{existing}' and '{new}'")]
    DuplicateToken {
        token: String,
        existing: &'static str,
        new: &'static str,
    },

    #[error("handler '{0}' already bound to a command")]
    DuplicateHandler(HandlerId),
}

/// Registry resolving command tokens to descriptors.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    descriptors: Vec<CommandDescriptor>,
    by_token: HashMap<String, usize>,
    by_handler: HashMap<HandlerId, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its name and all aliases.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        if self.by_handler.contains_key(&descriptor.handler) {
            return Err(RegistryError::DuplicateHandler(descriptor.handler));
        }

        // Validate every token before touching the maps so a failed
        // registration leaves the registry unchanged.
        let mut tokens = Vec::with_capacity(1 + descriptor.aliases.len());
        for token in std::iter::once(descriptor.name).chain(descriptor.aliases.iter().copied()) {
            let token = token.to_ascii_lowercase();
            let existing = self
                .by_token
                .get(&token)
                .map(|&i| self.descriptors[i].name)
                .or_else(|| tokens.contains(&token).then_some(descriptor.name));
            if let Some(existing) = existing {
                return Err(RegistryError::DuplicateToken {
                    token,
                    existing,
                    new: descriptor.name,
                });
            }
            tokens.push(token);
        }

        let index = self.descriptors.len();
        for token in tokens {
            self.by_token.insert(token, index);
        }
        self.by_handler.insert(descriptor.handler, index);
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Case-insensitive exact match against canonical name or alias.
    pub fn resolve(&self, token: &str) -> Option<&CommandDescriptor> {
        self.by_token
            .get(&token.to_ascii_lowercase())
            .map(|&i| &self.descriptors[i])
    }

    /// Descriptor a handler id is bound to. Used by replay, which stores
    /// handler identity rather than command text.
    pub fn by_handler_id(&self, id: HandlerId) -> Option<&CommandDescriptor> {
        self.by_handler.get(&id).map(|&i| &self.descriptors[i])
    }

    /// Registered descriptors in registration order.
    #[allow(dead_code)]
    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
