//! Inbound interaction events.
//!
//! These are transport independent snapshots of what Discord sent: who invoked what,
//! where, and with which options. The serenity adapter builds them from gateway
//! payloads; tests build them by hand.

use crate::commands::CommandType;
use poise::serenity_prelude::{
    ApplicationId, AttachmentId, ChannelId, CommandOptionType, GuildId, InteractionId, MessageId,
    Permissions, RoleId, UserId,
};
use std::collections::HashMap;

/// Where an interaction was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// A channel inside a guild
    Guild(GuildId),
    /// A direct message channel
    Private,
    /// Anything else (group DMs and channel types this crate does not handle)
    Other,
}

/// The channel an interaction came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelContext {
    /// Channel id
    pub channel_id: ChannelId,
    /// Channel kind
    pub kind: ChannelKind,
    /// Effective permissions Discord resolved into the payload, keyed by user
    pub resolved_permissions: HashMap<UserId, Permissions>,
}

impl ChannelContext {
    /// A guild channel without any resolved permissions.
    #[must_use]
    pub fn guild(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            kind: ChannelKind::Guild(guild_id),
            resolved_permissions: HashMap::new(),
        }
    }

    /// A direct message channel.
    #[must_use]
    pub fn private(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            kind: ChannelKind::Private,
            resolved_permissions: HashMap::new(),
        }
    }

    /// The guild the channel belongs to, if any.
    #[must_use]
    pub const fn guild_id(&self) -> Option<GuildId> {
        match self.kind {
            ChannelKind::Guild(guild_id) => Some(guild_id),
            ChannelKind::Private | ChannelKind::Other => None,
        }
    }

    /// Records a permission set resolved for a user.
    #[must_use]
    pub fn with_permissions(mut self, user_id: UserId, permissions: Permissions) -> Self {
        self.resolved_permissions.insert(user_id, permissions);
        self
    }
}

/// Fields every interaction carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionBase {
    /// Interaction id, used to respond
    pub id: InteractionId,
    /// Interaction token, used to respond
    pub token: String,
    /// The application the interaction targets
    pub application_id: ApplicationId,
    /// Where the interaction was invoked
    pub channel: ChannelContext,
    /// The invoking user
    pub user_id: UserId,
}

/// The value of an option supplied with a chat interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A sub command and the options supplied to it
    SubCommand(Vec<InteractionOption>),
    /// A sub command group and the sub command chosen within it
    SubCommandGroup(Vec<InteractionOption>),
    /// String argument
    String(String),
    /// Integer argument
    Integer(i64),
    /// Floating point argument
    Number(f64),
    /// Boolean argument
    Boolean(bool),
    /// User argument
    User(UserId),
    /// Channel argument
    Channel(ChannelId),
    /// Role argument
    Role(RoleId),
    /// User or role argument, by raw id
    Mentionable(u64),
    /// Attachment argument
    Attachment(AttachmentId),
    /// The option currently being typed during autocomplete
    Autocomplete {
        /// Declared option type
        kind: CommandOptionType,
        /// Partial input
        value: String,
    },
}

/// A named option supplied with a chat interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOption {
    /// Option name
    pub name: String,
    /// Supplied value
    pub value: OptionValue,
}

impl InteractionOption {
    /// Creates an option.
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Creates a sub command option wrapping its own options.
    pub fn sub_command(name: impl Into<String>, options: Vec<Self>) -> Self {
        Self::new(name, OptionValue::SubCommand(options))
    }

    /// Creates a sub command group option wrapping the chosen sub command.
    pub fn sub_command_group(name: impl Into<String>, options: Vec<Self>) -> Self {
        Self::new(name, OptionValue::SubCommandGroup(options))
    }

    /// If this option selects a sub command or group, its name and nested options.
    #[must_use]
    pub fn as_branch(&self) -> Option<(&str, &[Self])> {
        match &self.value {
            OptionValue::SubCommand(options) | OptionValue::SubCommandGroup(options) => {
                Some((self.name.as_str(), options.as_slice()))
            }
            _ => None,
        }
    }
}

/// Common behaviour of the three command interaction shapes.
pub trait InteractionEvent: Send + Sync + 'static {
    /// The command type this event invokes
    const KIND: CommandType;

    /// Shared interaction fields
    fn base(&self) -> &InteractionBase;

    /// Name of the invoked top level command
    fn command_name(&self) -> &str;

    /// The user a user command was invoked on
    fn target_user(&self) -> Option<UserId> {
        None
    }

    /// The message a message command was invoked on
    fn target_message(&self) -> Option<MessageId> {
        None
    }
}

/// A chat input (slash command) or autocomplete interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatInputEvent {
    /// Shared interaction fields
    pub base: InteractionBase,
    /// Top level command name
    pub command_name: String,
    /// Options as sent by Discord, including sub command and group wrappers
    pub options: Vec<InteractionOption>,
}

impl ChatInputEvent {
    /// The space separated command path (`top group sub`) carried by the payload.
    #[must_use]
    pub fn command_path(&self) -> String {
        let mut path = self.command_name.clone();
        let mut options = self.options.as_slice();
        while let Some((name, nested)) = options.iter().find_map(InteractionOption::as_branch) {
            path.push(' ');
            path.push_str(name);
            options = nested;
        }
        path
    }
}

impl InteractionEvent for ChatInputEvent {
    const KIND: CommandType = CommandType::Chat;

    fn base(&self) -> &InteractionBase {
        &self.base
    }

    fn command_name(&self) -> &str {
        &self.command_name
    }
}

/// A user context menu interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    /// Shared interaction fields
    pub base: InteractionBase,
    /// Command name
    pub command_name: String,
    /// The user the command was invoked on
    pub target_id: UserId,
}

impl InteractionEvent for UserEvent {
    const KIND: CommandType = CommandType::User;

    fn base(&self) -> &InteractionBase {
        &self.base
    }

    fn command_name(&self) -> &str {
        &self.command_name
    }

    fn target_user(&self) -> Option<UserId> {
        Some(self.target_id)
    }
}

/// A message context menu interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Shared interaction fields
    pub base: InteractionBase,
    /// Command name
    pub command_name: String,
    /// The message the command was invoked on
    pub target_id: MessageId,
}

impl InteractionEvent for MessageEvent {
    const KIND: CommandType = CommandType::Message;

    fn base(&self) -> &InteractionBase {
        &self.base
    }

    fn command_name(&self) -> &str {
        &self.command_name
    }

    fn target_message(&self) -> Option<MessageId> {
        Some(self.target_id)
    }
}
