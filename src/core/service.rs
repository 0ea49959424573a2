//! The remote command catalog capability.

use crate::commands::{CommandRequest, RemoteCommand};
use crate::errors::Result;
use async_trait::async_trait;
use poise::serenity_prelude::{ApplicationId, CommandId, GuildId};
use std::fmt;

/// Where a set of commands is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandScope {
    /// Application wide
    Global,
    /// A single guild
    Guild(GuildId),
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("Global"),
            Self::Guild(guild_id) => write!(f, "Guild ({guild_id})"),
        }
    }
}

/// Lists and mutates the commands registered with Discord.
///
/// Implementations perform one HTTP call per method; failures propagate unchanged and
/// retrying is left to the caller.
#[async_trait]
pub trait CommandService: Send + Sync {
    /// Lists every global command of the application.
    async fn list_global_commands(&self, application_id: ApplicationId) -> Result<Vec<RemoteCommand>>;

    /// Lists every command registered in one guild.
    async fn list_guild_commands(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
    ) -> Result<Vec<RemoteCommand>>;

    /// Creates a global command.
    async fn create_global_command(
        &self,
        application_id: ApplicationId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand>;

    /// Replaces a global command's definition.
    async fn modify_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand>;

    /// Deletes a global command.
    async fn delete_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
    ) -> Result<()>;

    /// Creates a command in one guild.
    async fn create_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand>;

    /// Replaces a guild command's definition.
    async fn modify_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand>;

    /// Deletes a guild command.
    async fn delete_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> Result<()>;
}

/// Lists the commands of one scope.
pub async fn list_commands(
    service: &dyn CommandService,
    application_id: ApplicationId,
    scope: CommandScope,
) -> Result<Vec<RemoteCommand>> {
    match scope {
        CommandScope::Global => service.list_global_commands(application_id).await,
        CommandScope::Guild(guild_id) => service.list_guild_commands(application_id, guild_id).await,
    }
}

pub(crate) async fn create_command(
    service: &dyn CommandService,
    application_id: ApplicationId,
    scope: CommandScope,
    request: &CommandRequest,
) -> Result<RemoteCommand> {
    match scope {
        CommandScope::Global => service.create_global_command(application_id, request).await,
        CommandScope::Guild(guild_id) => {
            service
                .create_guild_command(application_id, guild_id, request)
                .await
        }
    }
}

pub(crate) async fn modify_command(
    service: &dyn CommandService,
    application_id: ApplicationId,
    scope: CommandScope,
    command_id: CommandId,
    request: &CommandRequest,
) -> Result<RemoteCommand> {
    match scope {
        CommandScope::Global => {
            service
                .modify_global_command(application_id, command_id, request)
                .await
        }
        CommandScope::Guild(guild_id) => {
            service
                .modify_guild_command(application_id, guild_id, command_id, request)
                .await
        }
    }
}

pub(crate) async fn delete_command(
    service: &dyn CommandService,
    application_id: ApplicationId,
    scope: CommandScope,
    command_id: CommandId,
) -> Result<()> {
    match scope {
        CommandScope::Global => service.delete_global_command(application_id, command_id).await,
        CommandScope::Guild(guild_id) => {
            service
                .delete_guild_command(application_id, guild_id, command_id)
                .await
        }
    }
}
