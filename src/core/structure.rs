//! The command structure - the registry store both reconciliation and dispatch read.
//!
//! Six mappings keyed by command name: global and guild-eligible catalogs for each
//! command type. The mappings are filled once during startup through `&mut self`;
//! afterwards the structure is shared behind an `Arc` and only the per-command remote
//! ids change, through atomic writes, so dispatch can read while reconciliation runs.

use crate::bot::{ChannelContext, ChatInputEvent, InteractionOption, MessageEvent, UserEvent};
use crate::commands::{
    ChatCommand, CommandMeta, CommandRequest, CommandType, MessageCommand, UserCommand,
};
use crate::errors::{Error, Result};
use poise::serenity_prelude::CommandId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

/// Which of the two catalogs a command lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    /// Registered once for the whole application
    Global,
    /// Registered per guild, subject to the guild's entitlements
    Guild,
}

/// A borrowed command of any type.
///
/// Reconciliation is written once for all three types; carrying the variant alongside
/// the generic request lets the remote id be assigned without inspecting types at runtime.
#[derive(Debug, Clone, Copy)]
pub enum CommandRef<'a> {
    /// A chat input command
    Chat(&'a ChatCommand),
    /// A user command
    User(&'a UserCommand),
    /// A message command
    Message(&'a MessageCommand),
}

impl CommandRef<'_> {
    /// Shared metadata
    #[must_use]
    pub const fn meta(&self) -> &CommandMeta {
        match self {
            Self::Chat(command) => command.meta(),
            Self::User(command) => command.meta(),
            Self::Message(command) => command.meta(),
        }
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        self.meta().name()
    }

    /// Command type
    #[must_use]
    pub const fn kind(&self) -> CommandType {
        match self {
            Self::Chat(_) => CommandType::Chat,
            Self::User(_) => CommandType::User,
            Self::Message(_) => CommandType::Message,
        }
    }

    /// The shape registered with Discord
    #[must_use]
    pub fn as_request(&self) -> CommandRequest {
        match self {
            Self::Chat(command) => command.as_request(),
            Self::User(command) => command.as_request(),
            Self::Message(command) => command.as_request(),
        }
    }

    /// The remote id, once assigned
    #[must_use]
    pub fn remote_id(&self) -> Option<CommandId> {
        match self {
            Self::Chat(command) => command.remote_id(),
            Self::User(command) => command.remote_id(),
            Self::Message(command) => command.remote_id(),
        }
    }
}

/// The registry of every command the bot knows about.
#[derive(Debug, Default)]
pub struct CommandStructure {
    global_chat: HashMap<String, ChatCommand>,
    global_user: HashMap<String, UserCommand>,
    global_message: HashMap<String, MessageCommand>,
    guild_chat: HashMap<String, ChatCommand>,
    guild_user: HashMap<String, UserCommand>,
    guild_message: HashMap<String, MessageCommand>,
}

fn insert<C>(map: &mut HashMap<String, C>, kind: CommandType, name: &str, command: C) -> Result<()> {
    match map.entry(name.to_string()) {
        Entry::Occupied(_) => Err(Error::DuplicateCommand {
            kind,
            name: name.to_string(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(command);
            Ok(())
        }
    }
}

fn top_level(command: &ChatCommand) -> Result<()> {
    if command.kind().is_top_level() {
        Ok(())
    } else {
        Err(Error::InvalidCommandLocation {
            command: command.name().to_string(),
            parent: "<root>".to_string(),
            expected: "a top command or top group",
        })
    }
}

impl CommandStructure {
    /// An empty structure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global chat command.
    ///
    /// # Errors
    /// [`Error::DuplicateCommand`] on a name collision among global chat commands,
    /// [`Error::InvalidCommandLocation`] for a mid group or sub command.
    pub fn add_global_chat_command(&mut self, command: ChatCommand) -> Result<()> {
        top_level(&command)?;
        debug!("Adding Global Chat Command: {}", command.name());
        let name = command.name().to_string();
        insert(&mut self.global_chat, CommandType::Chat, &name, command)
    }

    /// Adds a global user command.
    ///
    /// # Errors
    /// [`Error::DuplicateCommand`] on a name collision among global user commands.
    pub fn add_global_user_command(&mut self, command: UserCommand) -> Result<()> {
        debug!("Adding Global User Command: {}", command.name());
        let name = command.name().to_string();
        insert(&mut self.global_user, CommandType::User, &name, command)
    }

    /// Adds a global message command.
    ///
    /// # Errors
    /// [`Error::DuplicateCommand`] on a name collision among global message commands.
    pub fn add_global_message_command(&mut self, command: MessageCommand) -> Result<()> {
        debug!("Adding Global Message Command: {}", command.name());
        let name = command.name().to_string();
        insert(&mut self.global_message, CommandType::Message, &name, command)
    }

    /// Adds a guild-eligible chat command.
    ///
    /// # Errors
    /// [`Error::DuplicateCommand`] on a name collision among guild chat commands,
    /// [`Error::InvalidCommandLocation`] for a mid group or sub command.
    pub fn add_guild_chat_command(&mut self, command: ChatCommand) -> Result<()> {
        top_level(&command)?;
        debug!("Adding Guild Chat Command: {}", command.name());
        let name = command.name().to_string();
        insert(&mut self.guild_chat, CommandType::Chat, &name, command)
    }

    /// Adds a guild-eligible user command.
    ///
    /// # Errors
    /// [`Error::DuplicateCommand`] on a name collision among guild user commands.
    pub fn add_guild_user_command(&mut self, command: UserCommand) -> Result<()> {
        debug!("Adding Guild User Command: {}", command.name());
        let name = command.name().to_string();
        insert(&mut self.guild_user, CommandType::User, &name, command)
    }

    /// Adds a guild-eligible message command.
    ///
    /// # Errors
    /// [`Error::DuplicateCommand`] on a name collision among guild message commands.
    pub fn add_guild_message_command(&mut self, command: MessageCommand) -> Result<()> {
        debug!("Adding Guild Message Command: {}", command.name());
        let name = command.name().to_string();
        insert(&mut self.guild_message, CommandType::Message, &name, command)
    }

    /// Records the remote id Discord assigned to a command.
    pub fn assign_command_id(&self, command: CommandRef<'_>, id: CommandId) {
        match command {
            CommandRef::Chat(chat) => chat.assign_remote_id(id),
            CommandRef::User(user) => user.assign_remote_id(id),
            CommandRef::Message(message) => message.assign_remote_id(id),
        }
        debug!("Assigned id {} to {} command {}", id, command.kind(), command.name());
    }

    /// Every command of one type in one catalog, keyed by name.
    #[must_use]
    pub fn commands(&self, catalog: Catalog, kind: CommandType) -> HashMap<&str, CommandRef<'_>> {
        match (catalog, kind) {
            (Catalog::Global, CommandType::Chat) => Self::refs(&self.global_chat, CommandRef::Chat),
            (Catalog::Global, CommandType::User) => Self::refs(&self.global_user, CommandRef::User),
            (Catalog::Global, CommandType::Message) => {
                Self::refs(&self.global_message, CommandRef::Message)
            }
            (Catalog::Guild, CommandType::Chat) => Self::refs(&self.guild_chat, CommandRef::Chat),
            (Catalog::Guild, CommandType::User) => Self::refs(&self.guild_user, CommandRef::User),
            (Catalog::Guild, CommandType::Message) => {
                Self::refs(&self.guild_message, CommandRef::Message)
            }
        }
    }

    fn refs<'a, C>(
        map: &'a HashMap<String, C>,
        wrap: fn(&'a C) -> CommandRef<'a>,
    ) -> HashMap<&'a str, CommandRef<'a>> {
        map.iter().map(|(name, command)| (name.as_str(), wrap(command))).collect()
    }

    /// The global command registered under a remote id.
    #[must_use]
    pub fn find_global_by_id(&self, id: CommandId) -> Option<CommandRef<'_>> {
        CommandType::ALL
            .into_iter()
            .flat_map(|kind| self.commands(Catalog::Global, kind).into_values())
            .find(|command| command.remote_id() == Some(id))
    }

    fn lookup<'a, C>(
        global: &'a HashMap<String, C>,
        guild: &'a HashMap<String, C>,
        channel: &ChannelContext,
        name: &str,
    ) -> Option<&'a C> {
        global
            .get(name)
            .or_else(|| channel.guild_id().and_then(|_| guild.get(name)))
    }

    /// Resolves a chat interaction down to its leaf command and the options supplied there.
    ///
    /// Direct messages only resolve against global commands; guild interactions try the
    /// global catalog first, then the guild catalog.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when the payload does not match the catalog, which means
    /// the remote catalog is out of sync.
    pub fn search_for_chat_command<'a>(
        &'a self,
        event: &'a ChatInputEvent,
    ) -> Result<(&'a ChatCommand, &'a [InteractionOption])> {
        Self::lookup(
            &self.global_chat,
            &self.guild_chat,
            &event.base.channel,
            &event.command_name,
        )
        .and_then(|top| top.resolve(&event.options))
        .ok_or_else(|| Error::UnknownCommand {
            kind: CommandType::Chat,
            path: event.command_path(),
        })
    }

    /// Resolves a user interaction to its command.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when no command has the interaction's name.
    pub fn search_for_user_command(&self, event: &UserEvent) -> Result<&UserCommand> {
        Self::lookup(
            &self.global_user,
            &self.guild_user,
            &event.base.channel,
            &event.command_name,
        )
        .ok_or_else(|| Error::UnknownCommand {
            kind: CommandType::User,
            path: event.command_name.clone(),
        })
    }

    /// Resolves a message interaction to its command.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when no command has the interaction's name.
    pub fn search_for_message_command(&self, event: &MessageEvent) -> Result<&MessageCommand> {
        Self::lookup(
            &self.global_message,
            &self.guild_message,
            &event.base.channel,
            &event.command_name,
        )
        .ok_or_else(|| Error::UnknownCommand {
            kind: CommandType::Message,
            path: event.command_name.clone(),
        })
    }

    /// Global chat commands
    #[must_use]
    pub const fn global_chat_commands(&self) -> &HashMap<String, ChatCommand> {
        &self.global_chat
    }

    /// Global user commands
    #[must_use]
    pub const fn global_user_commands(&self) -> &HashMap<String, UserCommand> {
        &self.global_user
    }

    /// Global message commands
    #[must_use]
    pub const fn global_message_commands(&self) -> &HashMap<String, MessageCommand> {
        &self.global_message
    }

    /// Guild-eligible chat commands
    #[must_use]
    pub const fn guild_chat_commands(&self) -> &HashMap<String, ChatCommand> {
        &self.guild_chat
    }

    /// Guild-eligible user commands
    #[must_use]
    pub const fn guild_user_commands(&self) -> &HashMap<String, UserCommand> {
        &self.guild_user
    }

    /// Guild-eligible message commands
    #[must_use]
    pub const fn guild_message_commands(&self) -> &HashMap<String, MessageCommand> {
        &self.guild_message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{ChannelContext, InteractionOption, OptionValue};
    use crate::test_utils::{CountingHandler, chat_event, user_event};
    use poise::serenity_prelude::{ChannelId, GuildId, UserId};

    fn guild_channel() -> ChannelContext {
        ChannelContext::guild(GuildId::new(1), ChannelId::new(2))
    }

    #[test]
    fn test_names_are_independent_across_types() -> Result<()> {
        let mut structure = CommandStructure::new();
        structure.add_global_chat_command(ChatCommand::top("info", "info", CountingHandler::default()))?;
        structure.add_global_user_command(UserCommand::new("info", CountingHandler::default()))?;
        structure.add_global_message_command(MessageCommand::new("info", CountingHandler::default()))?;
        assert_eq!(structure.global_chat_commands().len(), 1);
        assert_eq!(structure.global_user_commands().len(), 1);
        assert_eq!(structure.global_message_commands().len(), 1);
        Ok(())
    }

    #[test]
    fn test_same_type_collision_fails() -> Result<()> {
        let mut structure = CommandStructure::new();
        structure.add_global_chat_command(ChatCommand::top("info", "info", CountingHandler::default()))?;
        let result =
            structure.add_global_chat_command(ChatCommand::top("info", "other", CountingHandler::default()));
        assert!(matches!(
            result,
            Err(Error::DuplicateCommand {
                kind: CommandType::Chat,
                ..
            })
        ));

        // The same name in the guild catalog is a separate mapping.
        structure.add_guild_chat_command(ChatCommand::top("info", "info", CountingHandler::default()))?;
        Ok(())
    }

    #[test]
    fn test_nested_kinds_cannot_be_top_level() {
        let mut structure = CommandStructure::new();
        let result = structure.add_global_chat_command(ChatCommand::mid_group("roles", "roles"));
        assert!(matches!(result, Err(Error::InvalidCommandLocation { .. })));
    }

    #[test]
    fn test_dm_only_resolves_global() -> Result<()> {
        let mut structure = CommandStructure::new();
        structure.add_guild_chat_command(ChatCommand::top("admin", "admin", CountingHandler::default()))?;
        structure.add_global_chat_command(ChatCommand::top("ping", "ping", CountingHandler::default()))?;

        let dm = ChannelContext::private(ChannelId::new(3));
        assert!(structure.search_for_chat_command(&chat_event(dm.clone(), "ping", vec![])).is_ok());
        assert!(matches!(
            structure.search_for_chat_command(&chat_event(dm, "admin", vec![])),
            Err(Error::UnknownCommand { .. })
        ));

        let admin = chat_event(guild_channel(), "admin", vec![]);
        let (command, _) = structure.search_for_chat_command(&admin)?;
        assert_eq!(command.name(), "admin");
        Ok(())
    }

    #[test]
    fn test_multi_level_resolution() -> Result<()> {
        let mut structure = CommandStructure::new();
        let roles = ChatCommand::mid_group("roles", "role settings").with_sub_command(ChatCommand::sub(
            "add",
            "add a role",
            CountingHandler::default(),
        ))?;
        structure.add_guild_chat_command(ChatCommand::top_group("config", "configure").with_sub_command(roles)?)?;

        let leaf_options = vec![InteractionOption::new("reason", OptionValue::String("because".to_string()))];
        let event = chat_event(
            guild_channel(),
            "config",
            vec![InteractionOption::sub_command_group(
                "roles",
                vec![InteractionOption::sub_command("add", leaf_options.clone())],
            )],
        );
        let (command, residual) = structure.search_for_chat_command(&event)?;
        assert_eq!(command.name(), "add");
        assert_eq!(residual, leaf_options.as_slice());

        let wrong = chat_event(
            guild_channel(),
            "config",
            vec![InteractionOption::sub_command_group(
                "roles",
                vec![InteractionOption::sub_command("remove", vec![])],
            )],
        );
        match structure.search_for_chat_command(&wrong) {
            Err(Error::UnknownCommand { path, .. }) => assert_eq!(path, "config roles remove"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_user_command_lookup_prefers_global() -> Result<()> {
        let mut structure = CommandStructure::new();
        structure.add_global_user_command(UserCommand::new("inspect", CountingHandler::default()).usable_in_dms())?;
        structure.add_guild_user_command(UserCommand::new("inspect", CountingHandler::default()))?;

        let command = structure.search_for_user_command(&user_event(guild_channel(), "inspect", UserId::new(8)))?;
        assert!(command.meta().usable_in_dms());
        Ok(())
    }

    #[test]
    fn test_assign_and_find_by_id() -> Result<()> {
        let mut structure = CommandStructure::new();
        structure.add_global_message_command(MessageCommand::new("quote", CountingHandler::default()))?;

        let commands = structure.commands(Catalog::Global, CommandType::Message);
        let quote = commands.get("quote").copied().ok_or_else(|| Error::UnknownCommand {
            kind: CommandType::Message,
            path: "quote".to_string(),
        })?;
        structure.assign_command_id(quote, CommandId::new(99));

        let found = structure.find_global_by_id(CommandId::new(99));
        assert_eq!(found.map(|command| command.name().to_string()), Some("quote".to_string()));
        assert!(structure.find_global_by_id(CommandId::new(100)).is_none());
        Ok(())
    }
}
