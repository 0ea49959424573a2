//! Shared test utilities for `slashlib`.
//!
//! This module provides in-memory fakes for every capability the registry, reconciler
//! and dispatcher depend on, plus helpers for building interaction events with
//! sensible defaults.

use crate::{
    bot::{
        AutocompleteContext, ChannelContext, ChannelInfo, ChatInputEvent, CommandHandler, Context,
        ContextBuilder, DataKind, DataSource, GuildInfo, InteractionBase, InteractionEvent,
        InteractionOption, InteractionResponder, MemberInfo, MessageEvent, MessageInfo,
        PermissionOracle, Reply, UserEvent, UserInfo,
    },
    commands::{CommandRequest, CommandType, OptionChoice, RemoteCommand},
    core::CommandService,
    errors::{Error, Result},
};
use async_trait::async_trait;
use poise::serenity_prelude::{
    ApplicationId, ChannelId, CommandId, GuildId, InteractionId, MessageId, Permissions, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// The bot's own user id in tests.
pub fn bot_id() -> UserId {
    UserId::new(100)
}

/// The id of the user invoking test interactions.
pub fn invoker_id() -> UserId {
    UserId::new(500)
}

fn base(channel: ChannelContext) -> InteractionBase {
    InteractionBase {
        id: InteractionId::new(1),
        token: "token".to_string(),
        application_id: ApplicationId::new(42),
        channel,
        user_id: invoker_id(),
    }
}

/// Creates a chat input event invoked by [`invoker_id`].
pub fn chat_event(channel: ChannelContext, name: &str, options: Vec<InteractionOption>) -> ChatInputEvent {
    ChatInputEvent {
        base: base(channel),
        command_name: name.to_string(),
        options,
    }
}

/// Creates a user command event invoked by [`invoker_id`].
pub fn user_event(channel: ChannelContext, name: &str, target: UserId) -> UserEvent {
    UserEvent {
        base: base(channel),
        command_name: name.to_string(),
        target_id: target,
    }
}

/// Creates a message command event invoked by [`invoker_id`].
pub fn message_event(channel: ChannelContext, name: &str, target: MessageId) -> MessageEvent {
    MessageEvent {
        base: base(channel),
        command_name: name.to_string(),
        target_id: target,
    }
}

/// Creates a remote command without options or default permission.
pub fn remote_command(id: u64, kind: CommandType, name: &str, description: &str) -> RemoteCommand {
    RemoteCommand {
        id: CommandId::new(id),
        kind: Some(kind.value()),
        name: name.to_string(),
        description: description.to_string(),
        default_permission: None,
        options: None,
    }
}

/// A handler that counts invocations and remembers the options it last ran with.
///
/// Clones share their counters, so a test can keep one clone and hand the other to a
/// command.
#[derive(Clone, Default)]
pub struct CountingHandler {
    executions: Arc<AtomicUsize>,
    autocompletes: Arc<AtomicUsize>,
    last_options: Arc<Mutex<Option<Vec<InteractionOption>>>>,
    requested: Vec<DataKind>,
    required: Vec<DataKind>,
}

impl CountingHandler {
    /// Requests a piece of data on every invocation.
    #[must_use]
    pub fn requesting(mut self, kind: DataKind) -> Self {
        self.requested.push(kind);
        self
    }

    /// Requires a piece of data on every invocation.
    #[must_use]
    pub fn requiring(mut self, kind: DataKind) -> Self {
        self.required.push(kind);
        self
    }

    /// How many times `execute` ran.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// How many times `autocomplete` ran.
    pub fn autocompletes(&self) -> usize {
        self.autocompletes.load(Ordering::SeqCst)
    }

    /// The options of the most recent execution.
    pub fn last_options(&self) -> Option<Vec<InteractionOption>> {
        self.last_options.lock().expect("options lock poisoned").clone()
    }
}

#[async_trait]
impl<E: InteractionEvent> CommandHandler<E> for CountingHandler {
    fn set_request_data(&self, builder: &mut ContextBuilder<E>) {
        for &kind in &self.requested {
            builder.request(kind);
        }
        for &kind in &self.required {
            builder.require(kind);
        }
    }

    async fn execute(&self, context: Context<E>) -> Result<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().expect("options lock poisoned") = Some(context.options().to_vec());
        Ok(())
    }

    async fn autocomplete(&self, _context: AutocompleteContext) -> Result<()> {
        self.autocompletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A permission oracle granting the same permissions to everyone.
#[derive(Debug, Clone, Copy)]
pub struct FixedPermissions(pub Permissions);

#[async_trait]
impl PermissionOracle for FixedPermissions {
    async fn effective_permissions(&self, _channel: &ChannelContext, _user_id: UserId) -> Result<Permissions> {
        Ok(self.0)
    }
}

/// A responder that records everything sent through it.
#[derive(Debug, Default)]
pub struct RecordingResponder {
    replies: Mutex<Vec<Reply>>,
    suggestions: Mutex<Vec<Vec<OptionChoice>>>,
}

impl RecordingResponder {
    /// Every reply sent so far.
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().expect("replies lock poisoned").clone()
    }

    /// Every autocomplete response sent so far.
    pub fn suggestions(&self) -> Vec<Vec<OptionChoice>> {
        self.suggestions.lock().expect("suggestions lock poisoned").clone()
    }
}

#[async_trait]
impl InteractionResponder for RecordingResponder {
    async fn reply(&self, _interaction: &InteractionBase, reply: Reply) -> Result<()> {
        self.replies.lock().expect("replies lock poisoned").push(reply);
        Ok(())
    }

    async fn autocomplete(&self, _interaction: &InteractionBase, choices: Vec<OptionChoice>) -> Result<()> {
        self.suggestions.lock().expect("suggestions lock poisoned").push(choices);
        Ok(())
    }
}

/// A data source answering every lookup with fixed records, or failing every lookup.
///
/// Each call is recorded as the [`DataKind`] it serves. Member lookups are told apart by
/// user: [`bot_id`] is the bot member, [`invoker_id`] the invoking member, anyone else a
/// target member.
#[derive(Debug, Default)]
pub struct StaticDataSource {
    fail: bool,
    calls: Mutex<Vec<DataKind>>,
}

impl StaticDataSource {
    /// A source whose every lookup fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// The lookups made so far.
    pub fn calls(&self) -> Vec<DataKind> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn record(&self, kind: DataKind) -> Result<()> {
        self.calls.lock().expect("calls lock poisoned").push(kind);
        if self.fail {
            return Err(Error::Remote {
                message: format!("{kind} lookup failed"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn current_user(&self) -> Result<UserInfo> {
        self.record(DataKind::BotUser)?;
        Ok(UserInfo {
            id: bot_id(),
            name: "slashlib".to_string(),
            bot: true,
            avatar_url: None,
        })
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<MemberInfo> {
        let kind = if user_id == bot_id() {
            DataKind::BotMember
        } else if user_id == invoker_id() {
            DataKind::InvokerMember
        } else {
            DataKind::TargetMember
        };
        self.record(kind)?;
        Ok(MemberInfo {
            guild_id,
            user_id,
            nick: None,
            joined_at: None,
        })
    }

    async fn guild(&self, guild_id: GuildId) -> Result<GuildInfo> {
        self.record(DataKind::Guild)?;
        Ok(GuildInfo {
            id: guild_id,
            name: "Test Guild".to_string(),
        })
    }

    async fn channel(&self, channel_id: ChannelId) -> Result<ChannelInfo> {
        self.record(DataKind::Channel)?;
        Ok(ChannelInfo {
            id: channel_id,
            name: Some("general".to_string()),
            guild_id: None,
        })
    }

    async fn user(&self, user_id: UserId) -> Result<UserInfo> {
        self.record(DataKind::TargetUser)?;
        Ok(UserInfo {
            id: user_id,
            name: format!("user-{user_id}"),
            bot: false,
            avatar_url: None,
        })
    }

    async fn message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<MessageInfo> {
        self.record(DataKind::TargetMessage)?;
        Ok(MessageInfo {
            id: message_id,
            channel_id,
            author_id: invoker_id(),
            content: "hello".to_string(),
        })
    }
}

/// A mutation made against [`InMemoryCommandService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A command was created
    Create {
        /// `None` for the global catalog
        guild: Option<GuildId>,
        /// Name of the created command
        name: String,
    },
    /// A command was modified
    Modify {
        /// `None` for the global catalog
        guild: Option<GuildId>,
        /// Id of the modified command
        id: CommandId,
        /// Name sent with the modification
        name: String,
    },
    /// A command was deleted
    Delete {
        /// `None` for the global catalog
        guild: Option<GuildId>,
        /// Id of the deleted command
        id: CommandId,
    },
}

/// An in-memory stand-in for Discord's command catalogs.
#[derive(Debug)]
pub struct InMemoryCommandService {
    catalogs: Mutex<HashMap<Option<GuildId>, Vec<RemoteCommand>>>,
    mutations: Mutex<Vec<Mutation>>,
    next_id: AtomicU64,
    fail: bool,
}

impl Default for InMemoryCommandService {
    fn default() -> Self {
        Self {
            catalogs: Mutex::new(HashMap::new()),
            mutations: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
            fail: false,
        }
    }
}

impl InMemoryCommandService {
    /// A service whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Registers a command without recording a mutation.
    pub fn seed(&self, guild: Option<GuildId>, command: RemoteCommand) {
        self.catalogs
            .lock()
            .expect("catalog lock poisoned")
            .entry(guild)
            .or_default()
            .push(command);
    }

    /// Every mutation made so far, in call order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().expect("mutation lock poisoned").clone()
    }

    /// Forgets the recorded mutations, keeping the catalogs.
    pub fn clear_mutations(&self) {
        self.mutations.lock().expect("mutation lock poisoned").clear();
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(Error::Remote {
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn list(&self, guild: Option<GuildId>) -> Result<Vec<RemoteCommand>> {
        self.check()?;
        Ok(self
            .catalogs
            .lock()
            .expect("catalog lock poisoned")
            .get(&guild)
            .cloned()
            .unwrap_or_default())
    }

    fn create(&self, guild: Option<GuildId>, request: &CommandRequest) -> Result<RemoteCommand> {
        self.check()?;
        let command = RemoteCommand {
            id: CommandId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            kind: Some(request.kind.value()),
            name: request.name.clone(),
            description: request.description.clone(),
            default_permission: request.default_permission,
            options: request.options.clone(),
        };
        self.seed(guild, command.clone());
        self.mutations.lock().expect("mutation lock poisoned").push(Mutation::Create {
            guild,
            name: request.name.clone(),
        });
        Ok(command)
    }

    fn modify(&self, guild: Option<GuildId>, id: CommandId, request: &CommandRequest) -> Result<RemoteCommand> {
        self.check()?;
        let command = RemoteCommand {
            id,
            kind: Some(request.kind.value()),
            name: request.name.clone(),
            description: request.description.clone(),
            default_permission: request.default_permission,
            options: request.options.clone(),
        };
        let mut catalogs = self.catalogs.lock().expect("catalog lock poisoned");
        let catalog = catalogs.entry(guild).or_default();
        catalog.retain(|existing| existing.id != id);
        catalog.push(command.clone());
        self.mutations.lock().expect("mutation lock poisoned").push(Mutation::Modify {
            guild,
            id,
            name: request.name.clone(),
        });
        Ok(command)
    }

    fn delete(&self, guild: Option<GuildId>, id: CommandId) -> Result<()> {
        self.check()?;
        if let Some(catalog) = self.catalogs.lock().expect("catalog lock poisoned").get_mut(&guild) {
            catalog.retain(|existing| existing.id != id);
        }
        self.mutations
            .lock()
            .expect("mutation lock poisoned")
            .push(Mutation::Delete { guild, id });
        Ok(())
    }
}

#[async_trait]
impl CommandService for InMemoryCommandService {
    async fn list_global_commands(&self, _application_id: ApplicationId) -> Result<Vec<RemoteCommand>> {
        self.list(None)
    }

    async fn list_guild_commands(
        &self,
        _application_id: ApplicationId,
        guild_id: GuildId,
    ) -> Result<Vec<RemoteCommand>> {
        self.list(Some(guild_id))
    }

    async fn create_global_command(
        &self,
        _application_id: ApplicationId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        self.create(None, request)
    }

    async fn modify_global_command(
        &self,
        _application_id: ApplicationId,
        command_id: CommandId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        self.modify(None, command_id, request)
    }

    async fn delete_global_command(&self, _application_id: ApplicationId, command_id: CommandId) -> Result<()> {
        self.delete(None, command_id)
    }

    async fn create_guild_command(
        &self,
        _application_id: ApplicationId,
        guild_id: GuildId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        self.create(Some(guild_id), request)
    }

    async fn modify_guild_command(
        &self,
        _application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        self.modify(Some(guild_id), command_id, request)
    }

    async fn delete_guild_command(
        &self,
        _application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> Result<()> {
        self.delete(Some(guild_id), command_id)
    }
}
