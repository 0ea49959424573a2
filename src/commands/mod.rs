//! Command catalog - typed application command definitions.
//!
//! This module holds everything the registry knows about a command before it ever
//! reaches Discord: the shared metadata every command carries, the up-to-three level
//! chat command tree, the single level user/message context menu commands, and the
//! request/record shapes used to compare local definitions against remote ones.

/// Chat input (slash) command tree
pub mod chat;
/// User and message context menu commands
pub mod context_menu;
/// Shared command metadata
pub mod definition;
/// Request and remote record shapes plus structural equality
pub mod request;

pub use chat::{ChatCommand, ChatKind};
pub use context_menu::{ContextMenuCommand, MessageCommand, UserCommand};
pub use definition::CommandMeta;
pub use request::{
    CommandOption, CommandRequest, OptionChoice, RemoteCommand, command_data_equals_request,
    default_permission_equals,
};

use poise::serenity_prelude::CommandId;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The three Discord application command kinds.
///
/// Discord treats each kind as an independent namespace, so a chat command and a
/// user command may share a name within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    /// `CHAT_INPUT`, a slash command
    Chat,
    /// `USER`, a user context menu command
    User,
    /// `MESSAGE`, a message context menu command
    Message,
}

impl CommandType {
    /// All command types, in the order they are reconciled.
    pub const ALL: [Self; 3] = [Self::Chat, Self::User, Self::Message];

    /// The raw value Discord uses for this type.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Chat => 1,
            Self::User => 2,
            Self::Message => 3,
        }
    }

    /// Maps a raw Discord value back to a known type.
    #[must_use]
    pub const fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Chat),
            2 => Some(Self::User),
            3 => Some(Self::Message),
            _ => None,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Chat => "CHAT_INPUT",
            Self::User => "USER",
            Self::Message => "MESSAGE",
        };
        f.write_str(label)
    }
}

impl Serialize for CommandType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

/// The remote identifier of a registered command.
///
/// Unset until reconciliation creates or confirms the command server side. Writes are
/// idempotent: concurrent assignments of the same id converge.
#[derive(Debug, Default)]
pub struct RemoteId(AtomicU64);

impl RemoteId {
    /// Returns the assigned id, if any.
    #[must_use]
    pub fn get(&self) -> Option<CommandId> {
        let raw = self.0.load(Ordering::Acquire);
        (raw != 0).then(|| CommandId::new(raw))
    }

    /// Records the id assigned by Discord.
    pub fn assign(&self, id: CommandId) {
        self.0.store(id.get(), Ordering::Release);
    }
}
