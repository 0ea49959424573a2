//! Guild command entitlements.
//!
//! Which guild-eligible commands a particular guild may have is decided outside this
//! crate (feature flags, subscriptions, ...). Reconciliation asks a
//! [`GuildCommandStateProvider`] once per guild and command type and never writes back.

use crate::commands::CommandType;
use crate::errors::Result;
use async_trait::async_trait;
use poise::serenity_prelude::GuildId;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Answers which guild-eligible commands a guild is entitled to.
#[async_trait]
pub trait GuildCommandStateProvider: Send + Sync {
    /// Names of the chat commands the guild may have.
    async fn guild_chat_commands(&self, guild_id: GuildId) -> Result<HashSet<String>>;

    /// Names of the user commands the guild may have.
    async fn guild_user_commands(&self, guild_id: GuildId) -> Result<HashSet<String>>;

    /// Names of the message commands the guild may have.
    async fn guild_message_commands(&self, guild_id: GuildId) -> Result<HashSet<String>>;
}

/// Queries the provider for one command type.
pub async fn allowed_commands(
    provider: &dyn GuildCommandStateProvider,
    guild_id: GuildId,
    kind: CommandType,
) -> Result<HashSet<String>> {
    match kind {
        CommandType::Chat => provider.guild_chat_commands(guild_id).await,
        CommandType::User => provider.guild_user_commands(guild_id).await,
        CommandType::Message => provider.guild_message_commands(guild_id).await,
    }
}

/// Allowed command names for each command type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AllowedCommands {
    /// Chat command names
    #[serde(default)]
    pub chat: HashSet<String>,
    /// User command names
    #[serde(default)]
    pub user: HashSet<String>,
    /// Message command names
    #[serde(default)]
    pub message: HashSet<String>,
}

impl AllowedCommands {
    /// The names allowed for one command type.
    #[must_use]
    pub const fn get(&self, kind: CommandType) -> &HashSet<String> {
        match kind {
            CommandType::Chat => &self.chat,
            CommandType::User => &self.user,
            CommandType::Message => &self.message,
        }
    }
}

/// A fixed entitlement table, typically loaded from configuration.
///
/// Guilds without an entry get the default set.
#[derive(Debug, Clone, Default)]
pub struct StaticGuildCommandState {
    default: AllowedCommands,
    guilds: HashMap<GuildId, AllowedCommands>,
}

impl StaticGuildCommandState {
    /// Creates a table from a default and per-guild overrides.
    #[must_use]
    pub const fn new(default: AllowedCommands, guilds: HashMap<GuildId, AllowedCommands>) -> Self {
        Self { default, guilds }
    }

    fn allowed(&self, guild_id: GuildId, kind: CommandType) -> HashSet<String> {
        self.guilds
            .get(&guild_id)
            .unwrap_or(&self.default)
            .get(kind)
            .clone()
    }
}

#[async_trait]
impl GuildCommandStateProvider for StaticGuildCommandState {
    async fn guild_chat_commands(&self, guild_id: GuildId) -> Result<HashSet<String>> {
        Ok(self.allowed(guild_id, CommandType::Chat))
    }

    async fn guild_user_commands(&self, guild_id: GuildId) -> Result<HashSet<String>> {
        Ok(self.allowed(guild_id, CommandType::User))
    }

    async fn guild_message_commands(&self, guild_id: GuildId) -> Result<HashSet<String>> {
        Ok(self.allowed(guild_id, CommandType::Message))
    }
}
