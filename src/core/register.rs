//! Reconciliation of the local command structure with Discord's catalogs.
//!
//! For every command type the remote catalog is compared with the local one. Missing
//! commands are created, differing commands are modified, and remote commands that have
//! no local counterpart are deleted. Each remote call is awaited before the next one is
//! issued, so a failure aborts the pass with the earlier changes already applied.

use super::guild_state::{GuildCommandStateProvider, allowed_commands};
use super::service::{
    CommandScope, CommandService, create_command, delete_command, list_commands, modify_command,
};
use super::structure::{Catalog, CommandRef, CommandStructure};
use crate::commands::{
    ChatCommand, CommandType, MessageCommand, RemoteCommand, UserCommand,
    command_data_equals_request,
};
use crate::errors::Result;
use poise::serenity_prelude::{ApplicationId, GuildId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The commands a bot starts with, one list per catalog and type.
#[derive(Debug, Default)]
pub struct CommandLists {
    /// Global chat commands
    pub global_chat: Vec<ChatCommand>,
    /// Global user commands
    pub global_user: Vec<UserCommand>,
    /// Global message commands
    pub global_message: Vec<MessageCommand>,
    /// Guild-eligible chat commands
    pub guild_chat: Vec<ChatCommand>,
    /// Guild-eligible user commands
    pub guild_user: Vec<UserCommand>,
    /// Guild-eligible message commands
    pub guild_message: Vec<MessageCommand>,
}

impl CommandLists {
    /// Builds a structure from the lists.
    ///
    /// # Errors
    /// Fails on the first duplicate name or misplaced chat command.
    pub fn into_structure(self) -> Result<CommandStructure> {
        let mut structure = CommandStructure::new();
        for command in self.global_chat {
            structure.add_global_chat_command(command)?;
        }
        for command in self.global_user {
            structure.add_global_user_command(command)?;
        }
        for command in self.global_message {
            structure.add_global_message_command(command)?;
        }
        for command in self.guild_chat {
            structure.add_guild_chat_command(command)?;
        }
        for command in self.guild_user {
            structure.add_guild_user_command(command)?;
        }
        for command in self.guild_message {
            structure.add_guild_message_command(command)?;
        }
        Ok(structure)
    }
}

/// Keeps Discord's global and guild catalogs in line with a [`CommandStructure`].
#[derive(Clone)]
pub struct CommandRegister {
    structure: Arc<CommandStructure>,
    guild_state: Arc<dyn GuildCommandStateProvider>,
}

impl std::fmt::Debug for CommandRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegister")
            .field("structure", &self.structure)
            .finish_non_exhaustive()
    }
}

impl CommandRegister {
    /// Wraps an existing structure.
    #[must_use]
    pub fn new(structure: Arc<CommandStructure>, guild_state: Arc<dyn GuildCommandStateProvider>) -> Self {
        Self {
            structure,
            guild_state,
        }
    }

    /// Builds the structure from command lists and wraps it.
    ///
    /// # Errors
    /// Fails on the first duplicate name or misplaced chat command.
    pub fn create(lists: CommandLists, guild_state: Arc<dyn GuildCommandStateProvider>) -> Result<Self> {
        let structure = lists.into_structure()?;
        Ok(Self::new(Arc::new(structure), guild_state))
    }

    /// The structure this register reconciles; dispatch shares it.
    #[must_use]
    pub const fn structure(&self) -> &Arc<CommandStructure> {
        &self.structure
    }

    /// Reconciles the global catalog and records the remote id of every global command.
    ///
    /// Returns the number of create, modify and delete calls made.
    ///
    /// # Errors
    /// Fails on the first remote error, or when Discord lists a command with a missing or
    /// unknown type. Changes applied before the failure stay applied.
    #[instrument(skip(self, service))]
    pub async fn register_global_commands(
        &self,
        service: &dyn CommandService,
        application_id: ApplicationId,
    ) -> Result<usize> {
        debug!("Registering global application commands with Discord");
        let scope = CommandScope::Global;
        let mut registered = partition(list_commands(service, application_id, scope).await?)?;

        let mut changes = 0;
        for kind in CommandType::ALL {
            let local = self.structure.commands(Catalog::Global, kind);
            changes += self
                .validate(
                    service,
                    application_id,
                    scope,
                    registered.remove(&kind).unwrap_or_default(),
                    &local,
                    None,
                )
                .await?;
        }

        info!("Created/Updated/Deleted {changes} global application commands");
        Ok(changes)
    }

    /// Reconciles the catalog of every listed guild against its entitlements.
    ///
    /// Returns the number of guilds in which at least one change was made.
    ///
    /// # Errors
    /// Fails on the first remote or entitlement lookup error, or when Discord lists a
    /// command with a missing or unknown type.
    #[instrument(skip(self, service, guild_ids), fields(guilds = guild_ids.len()))]
    pub async fn register_guild_commands(
        &self,
        service: &dyn CommandService,
        application_id: ApplicationId,
        guild_ids: &[GuildId],
    ) -> Result<usize> {
        debug!(
            "Registering guild application commands with Discord for {} guilds",
            guild_ids.len()
        );

        let mut changed_guilds = 0;
        for &guild_id in guild_ids {
            if self.register_guild(service, application_id, guild_id).await? > 0 {
                changed_guilds += 1;
            }
        }

        info!("Created/Updated/Deleted application commands in {changed_guilds} guilds");
        Ok(changed_guilds)
    }

    /// Reconciles a single guild and returns the number of changes made there.
    ///
    /// Guild commands never receive a remote id; dispatch resolves them by name.
    ///
    /// # Errors
    /// See [`Self::register_guild_commands`].
    pub async fn register_guild(
        &self,
        service: &dyn CommandService,
        application_id: ApplicationId,
        guild_id: GuildId,
    ) -> Result<usize> {
        let scope = CommandScope::Guild(guild_id);
        let mut registered = partition(list_commands(service, application_id, scope).await?)?;

        let mut changes = 0;
        for kind in CommandType::ALL {
            let allowed = allowed_commands(self.guild_state.as_ref(), guild_id, kind).await?;
            let local = self.structure.commands(Catalog::Guild, kind);
            changes += self
                .validate(
                    service,
                    application_id,
                    scope,
                    registered.remove(&kind).unwrap_or_default(),
                    &local,
                    Some(&allowed),
                )
                .await?;
        }

        debug!("Created/Updated/Deleted {changes} application commands in guild {guild_id}");
        Ok(changes)
    }

    async fn validate(
        &self,
        service: &dyn CommandService,
        application_id: ApplicationId,
        scope: CommandScope,
        registered: HashMap<String, RemoteCommand>,
        local: &HashMap<&str, CommandRef<'_>>,
        allowed: Option<&HashSet<String>>,
    ) -> Result<usize> {
        let is_allowed = |name: &str| allowed.is_none_or(|names| names.contains(name));
        let mut changes = 0;

        let mut local_commands: Vec<CommandRef<'_>> = local.values().copied().collect();
        local_commands.sort_by(|a, b| a.name().cmp(b.name()));
        for command in local_commands {
            if !is_allowed(command.name()) {
                continue;
            }
            let request = command.as_request();
            match registered.get(&request.name) {
                None => {
                    info!("Creating {scope} {} Command: {}", request.kind, request.name);
                    let created = create_command(service, application_id, scope, &request).await?;
                    self.record_id(scope, command, &created);
                    changes += 1;
                }
                Some(existing) if !command_data_equals_request(existing, &request) => {
                    info!("Updating {scope} {} Command: {}", request.kind, request.name);
                    let modified =
                        modify_command(service, application_id, scope, existing.id, &request).await?;
                    self.record_id(scope, command, &modified);
                    changes += 1;
                }
                Some(existing) => self.record_id(scope, command, existing),
            }
        }

        let mut stale: Vec<&RemoteCommand> = registered
            .values()
            .filter(|remote| !local.contains_key(remote.name.as_str()) || !is_allowed(&remote.name))
            .collect();
        stale.sort_by(|a, b| a.name.cmp(&b.name));
        for remote in stale {
            info!("Deleting {scope} Command: {}", remote.name);
            delete_command(service, application_id, scope, remote.id).await?;
            changes += 1;
        }

        Ok(changes)
    }

    fn record_id(&self, scope: CommandScope, command: CommandRef<'_>, remote: &RemoteCommand) {
        if scope == CommandScope::Global {
            self.structure.assign_command_id(command, remote.id);
        }
    }
}

/// Splits a remote listing by command type, keyed by name.
fn partition(remote: Vec<RemoteCommand>) -> Result<HashMap<CommandType, HashMap<String, RemoteCommand>>> {
    let mut partitioned: HashMap<CommandType, HashMap<String, RemoteCommand>> = HashMap::new();
    for command in remote {
        let kind = command.command_type()?;
        partitioned
            .entry(kind)
            .or_default()
            .insert(command.name.clone(), command);
    }
    Ok(partitioned)
}
