//! Context builders - the declarative request/collect protocol.
//!
//! A handler marks which pieces of contextual data it wants on a [`ContextBuilder`]
//! (see [`CommandHandler::set_request_data`](super::CommandHandler::set_request_data)).
//! The dispatcher then collects exactly those pieces from a [`DataSource`] and builds
//! an immutable [`Context`] for the handler to execute with.
//!
//! A piece can be *requested* or *required*. Requested data that cannot be obtained is
//! simply absent from the context; required data that cannot be obtained fails the
//! dispatch with [`Error::DataMissing`].

use super::events::{ChatInputEvent, InteractionEvent, InteractionOption, MessageEvent, OptionValue, UserEvent};
use super::reply::{InteractionResponder, Reply};
use crate::commands::OptionChoice;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A piece of contextual data a handler can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    /// The bot's own user
    BotUser,
    /// The bot's member record in the invoking guild
    BotMember,
    /// The invoking guild
    Guild,
    /// The invoking channel
    Channel,
    /// The invoking user's member record
    InvokerMember,
    /// The target of a user command
    TargetUser,
    /// The target of a user command as a member of the invoking guild
    TargetMember,
    /// The target of a message command
    TargetMessage,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BotUser => "bot user",
            Self::BotMember => "bot member",
            Self::Guild => "guild",
            Self::Channel => "channel",
            Self::InvokerMember => "invoking member",
            Self::TargetUser => "target user",
            Self::TargetMember => "target member",
            Self::TargetMessage => "target message",
        };
        f.write_str(label)
    }
}

/// The set of data pieces a handler asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRequest {
    requested: BTreeSet<DataKind>,
    required: BTreeSet<DataKind>,
}

impl DataRequest {
    /// Whether the piece was requested or required.
    #[must_use]
    pub fn is_requested(&self, kind: DataKind) -> bool {
        self.requested.contains(&kind)
    }

    /// Whether the piece was required.
    #[must_use]
    pub fn is_required(&self, kind: DataKind) -> bool {
        self.required.contains(&kind)
    }

    /// Every requested piece, required ones included, in a stable order.
    pub fn requested(&self) -> impl Iterator<Item = DataKind> + '_ {
        self.requested.iter().copied()
    }
}

/// A user snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// User id
    pub id: UserId,
    /// Username
    pub name: String,
    /// Whether the account is a bot
    pub bot: bool,
    /// Avatar URL, if the user has one
    pub avatar_url: Option<String>,
}

/// A guild member snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// The guild the membership belongs to
    pub guild_id: GuildId,
    /// The member's user id
    pub user_id: UserId,
    /// Guild nickname
    pub nick: Option<String>,
    /// When the member joined the guild
    pub joined_at: Option<DateTime<Utc>>,
}

/// A guild snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    /// Guild id
    pub id: GuildId,
    /// Guild name
    pub name: String,
}

/// A channel snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel id
    pub id: ChannelId,
    /// Channel name, absent for direct messages
    pub name: Option<String>,
    /// Owning guild, absent for direct messages
    pub guild_id: Option<GuildId>,
}

/// A message snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInfo {
    /// Message id
    pub id: MessageId,
    /// Channel the message lives in
    pub channel_id: ChannelId,
    /// Author id
    pub author_id: UserId,
    /// Text content
    pub content: String,
}

/// Fetches contextual data for context builders.
///
/// Every call may hit the network; the builder calls each method at most once per
/// requested piece.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The bot's own user.
    async fn current_user(&self) -> Result<UserInfo>;

    /// A member of a guild.
    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<MemberInfo>;

    /// A guild.
    async fn guild(&self, guild_id: GuildId) -> Result<GuildInfo>;

    /// A channel.
    async fn channel(&self, channel_id: ChannelId) -> Result<ChannelInfo>;

    /// Any user.
    async fn user(&self, user_id: UserId) -> Result<UserInfo>;

    /// A message in a channel.
    async fn message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<MessageInfo>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CollectedData {
    bot_user: Option<UserInfo>,
    bot_member: Option<MemberInfo>,
    guild: Option<GuildInfo>,
    channel: Option<ChannelInfo>,
    invoker_member: Option<MemberInfo>,
    target_user: Option<UserInfo>,
    target_member: Option<MemberInfo>,
    target_message: Option<MessageInfo>,
}

impl CollectedData {
    const fn contains(&self, kind: DataKind) -> bool {
        match kind {
            DataKind::BotUser => self.bot_user.is_some(),
            DataKind::BotMember => self.bot_member.is_some(),
            DataKind::Guild => self.guild.is_some(),
            DataKind::Channel => self.channel.is_some(),
            DataKind::InvokerMember => self.invoker_member.is_some(),
            DataKind::TargetUser => self.target_user.is_some(),
            DataKind::TargetMember => self.target_member.is_some(),
            DataKind::TargetMessage => self.target_message.is_some(),
        }
    }
}

fn unavailable(kind: DataKind, reason: &str) -> Error {
    Error::DataMissing {
        data: kind,
        reason: reason.to_string(),
    }
}

/// Collects the data a handler asked for before it executes.
pub struct ContextBuilder<E: InteractionEvent> {
    event: E,
    options: Vec<InteractionOption>,
    bot_id: UserId,
    request: DataRequest,
    data: CollectedData,
}

/// Builder for chat input commands
pub type ChatContextBuilder = ContextBuilder<ChatInputEvent>;
/// Builder for user commands
pub type UserContextBuilder = ContextBuilder<UserEvent>;
/// Builder for message commands
pub type MessageContextBuilder = ContextBuilder<MessageEvent>;

impl<E: InteractionEvent> ContextBuilder<E> {
    /// Binds a builder to an event and the options supplied at the resolved command.
    pub fn new(event: E, options: Vec<InteractionOption>, bot_id: UserId) -> Self {
        Self {
            event,
            options,
            bot_id,
            request: DataRequest::default(),
            data: CollectedData::default(),
        }
    }

    /// The event being handled
    pub const fn event(&self) -> &E {
        &self.event
    }

    /// Options supplied at the resolved command
    pub fn options(&self) -> &[InteractionOption] {
        &self.options
    }

    /// What has been asked for so far
    pub const fn data_request(&self) -> &DataRequest {
        &self.request
    }

    /// Asks for a piece of data; it is absent from the context if it cannot be collected.
    pub fn request(&mut self, kind: DataKind) -> &mut Self {
        self.request.requested.insert(kind);
        self
    }

    /// Asks for a piece of data that must be present for the handler to run.
    pub fn require(&mut self, kind: DataKind) -> &mut Self {
        self.request.requested.insert(kind);
        self.request.required.insert(kind);
        self
    }

    /// Fetches every requested piece.
    ///
    /// # Errors
    /// [`Error::DataMissing`] when a required piece cannot be obtained.
    pub async fn collect_data(mut self, source: &dyn DataSource) -> Result<Self> {
        let kinds: Vec<DataKind> = self.request.requested().collect();
        for kind in kinds {
            match self.fetch(kind, source).await {
                Ok(()) => {}
                Err(error) if self.request.is_required(kind) => {
                    return Err(match error {
                        missing @ Error::DataMissing { .. } => missing,
                        other => unavailable(kind, &other.to_string()),
                    });
                }
                Err(error) => {
                    debug!(%kind, %error, "Requested data unavailable, leaving it absent");
                }
            }
        }
        Ok(self)
    }

    async fn fetch(&mut self, kind: DataKind, source: &dyn DataSource) -> Result<()> {
        let base = self.event.base();
        let guild_id = base.channel.guild_id();
        match kind {
            DataKind::BotUser => {
                self.data.bot_user = Some(source.current_user().await?);
            }
            DataKind::BotMember => {
                let guild_id =
                    guild_id.ok_or_else(|| unavailable(kind, "interaction was not sent from a guild"))?;
                self.data.bot_member = Some(source.member(guild_id, self.bot_id).await?);
            }
            DataKind::Guild => {
                let guild_id =
                    guild_id.ok_or_else(|| unavailable(kind, "interaction was not sent from a guild"))?;
                self.data.guild = Some(source.guild(guild_id).await?);
            }
            DataKind::Channel => {
                self.data.channel = Some(source.channel(base.channel.channel_id).await?);
            }
            DataKind::InvokerMember => {
                let guild_id =
                    guild_id.ok_or_else(|| unavailable(kind, "interaction was not sent from a guild"))?;
                self.data.invoker_member = Some(source.member(guild_id, base.user_id).await?);
            }
            DataKind::TargetUser => {
                let target = self
                    .event
                    .target_user()
                    .ok_or_else(|| unavailable(kind, "interaction has no target user"))?;
                self.data.target_user = Some(source.user(target).await?);
            }
            DataKind::TargetMember => {
                let guild_id =
                    guild_id.ok_or_else(|| unavailable(kind, "interaction was not sent from a guild"))?;
                let target = self
                    .event
                    .target_user()
                    .ok_or_else(|| unavailable(kind, "interaction has no target user"))?;
                self.data.target_member = Some(source.member(guild_id, target).await?);
            }
            DataKind::TargetMessage => {
                let target = self
                    .event
                    .target_message()
                    .ok_or_else(|| unavailable(kind, "interaction has no target message"))?;
                self.data.target_message =
                    Some(source.message(base.channel.channel_id, target).await?);
            }
        }
        Ok(())
    }

    /// Freezes the collected data into the context handed to the handler.
    pub fn build(self, responder: Arc<dyn InteractionResponder>) -> Context<E> {
        Context {
            event: self.event,
            options: self.options,
            request: self.request,
            data: self.data,
            responder,
        }
    }
}

/// Everything a handler sees when it executes.
pub struct Context<E: InteractionEvent> {
    event: E,
    options: Vec<InteractionOption>,
    request: DataRequest,
    data: CollectedData,
    responder: Arc<dyn InteractionResponder>,
}

/// Context for chat input commands
pub type ChatContext = Context<ChatInputEvent>;
/// Context for user commands
pub type UserContext = Context<UserEvent>;
/// Context for message commands
pub type MessageContext = Context<MessageEvent>;

impl<E: InteractionEvent> Context<E> {
    /// The event being handled
    pub const fn event(&self) -> &E {
        &self.event
    }

    /// Options supplied at the resolved command
    pub fn options(&self) -> &[InteractionOption] {
        &self.options
    }

    /// Looks up a supplied option by name.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.value)
    }

    /// The bot's user, if collected
    pub const fn bot_user(&self) -> Option<&UserInfo> {
        self.data.bot_user.as_ref()
    }

    /// The bot's member record, if collected
    pub const fn bot_member(&self) -> Option<&MemberInfo> {
        self.data.bot_member.as_ref()
    }

    /// The invoking guild, if collected
    pub const fn guild(&self) -> Option<&GuildInfo> {
        self.data.guild.as_ref()
    }

    /// The invoking channel, if collected
    pub const fn channel(&self) -> Option<&ChannelInfo> {
        self.data.channel.as_ref()
    }

    /// The invoking user's member record, if collected
    pub const fn invoker_member(&self) -> Option<&MemberInfo> {
        self.data.invoker_member.as_ref()
    }

    /// The targeted user, if collected
    pub const fn target_user(&self) -> Option<&UserInfo> {
        self.data.target_user.as_ref()
    }

    /// The targeted user's member record, if collected
    pub const fn target_member(&self) -> Option<&MemberInfo> {
        self.data.target_member.as_ref()
    }

    /// The targeted message, if collected
    pub const fn target_message(&self) -> Option<&MessageInfo> {
        self.data.target_message.as_ref()
    }

    /// Whether every requested piece of data was collected.
    pub fn all_requested_data_exists(&self) -> bool {
        self.request.requested().all(|kind| self.data.contains(kind))
    }

    /// Responds to the interaction.
    pub async fn reply(&self, reply: Reply) -> Result<()> {
        self.responder.reply(self.event.base(), reply).await
    }
}

/// Context handed to autocomplete hooks.
pub struct AutocompleteContext {
    event: ChatInputEvent,
    options: Vec<InteractionOption>,
    responder: Arc<dyn InteractionResponder>,
}

impl AutocompleteContext {
    /// Binds the event and the options supplied at the resolved command.
    pub fn new(
        event: ChatInputEvent,
        options: Vec<InteractionOption>,
        responder: Arc<dyn InteractionResponder>,
    ) -> Self {
        Self {
            event,
            options,
            responder,
        }
    }

    /// The event being handled
    pub const fn event(&self) -> &ChatInputEvent {
        &self.event
    }

    /// Options supplied at the resolved command
    pub fn options(&self) -> &[InteractionOption] {
        &self.options
    }

    /// The option being typed and its partial input.
    pub fn focused(&self) -> Option<(&str, &str)> {
        self.options.iter().find_map(|option| match &option.value {
            OptionValue::Autocomplete { value, .. } => Some((option.name.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Sends suggestions back to the user.
    pub async fn respond(&self, choices: Vec<OptionChoice>) -> Result<()> {
        self.responder.autocomplete(&self.event.base, choices).await
    }
}
