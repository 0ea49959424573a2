//! Serenity adapters for the registry, reconciler and dispatcher capabilities.
//!
//! Everything Discord specific lives here: gateway payloads are turned into the
//! transport independent events of [`super::events`], and the capability traits are
//! implemented on top of serenity's HTTP client.

use super::context::{ChannelInfo, DataSource, GuildInfo, MemberInfo, MessageInfo, UserInfo};
use super::events::{
    ChannelContext, ChannelKind, ChatInputEvent, InteractionBase, InteractionOption, MessageEvent, OptionValue,
    UserEvent,
};
use super::receiver::{DispatchOutcome, EventReceiver};
use super::reply::{Embed, InteractionResponder, Reply};
use crate::commands::{CommandRequest, OptionChoice, RemoteCommand};
use crate::core::CommandService;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    self as serenity, ApplicationId, ChannelId, ChannelType, CommandDataOption, CommandDataOptionValue,
    CommandId, CommandInteraction, CreateAutocompleteResponse, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, GuildId, Http, Interaction, LightMethod, MessageId, Permissions,
    Request, Route, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// [`CommandService`] backed by Discord's REST API.
///
/// Command records are decoded straight from the response bodies rather than through
/// serenity's `Command` model, which drops `default_permission`.
#[derive(Clone)]
pub struct HttpCommandService {
    http: Arc<Http>,
}

impl HttpCommandService {
    /// Wraps a serenity HTTP client.
    pub const fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn fetch_commands(&self, route: Route<'_>) -> Result<Vec<RemoteCommand>> {
        let commands: Vec<RemoteCommand> = self.http.fire(Request::new(route, LightMethod::Get)).await?;
        Ok(commands.into_iter().map(normalize_remote).collect())
    }

    async fn send_command(
        &self,
        route: Route<'_>,
        method: LightMethod,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        let body = serde_json::to_vec(request)?;
        let command: RemoteCommand = self
            .http
            .fire(Request::new(route, method).body(Some(body)))
            .await?;
        Ok(normalize_remote(command))
    }

    async fn remove_command(&self, route: Route<'_>) -> Result<()> {
        self.http.request(Request::new(route, LightMethod::Delete)).await?;
        Ok(())
    }
}

/// Discord lists option-less commands with an empty array; requests omit the field.
fn normalize_remote(mut remote: RemoteCommand) -> RemoteCommand {
    if remote.options.as_ref().is_some_and(Vec::is_empty) {
        remote.options = None;
    }
    remote
}

#[async_trait]
impl CommandService for HttpCommandService {
    async fn list_global_commands(&self, application_id: ApplicationId) -> Result<Vec<RemoteCommand>> {
        self.fetch_commands(Route::Commands { application_id }).await
    }

    async fn list_guild_commands(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
    ) -> Result<Vec<RemoteCommand>> {
        self.fetch_commands(Route::GuildCommands {
            application_id,
            guild_id,
        })
        .await
    }

    async fn create_global_command(
        &self,
        application_id: ApplicationId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        self.send_command(Route::Commands { application_id }, LightMethod::Post, request)
            .await
    }

    async fn modify_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        let route = Route::Command {
            application_id,
            command_id,
        };
        self.send_command(route, LightMethod::Patch, request).await
    }

    async fn delete_global_command(
        &self,
        application_id: ApplicationId,
        command_id: CommandId,
    ) -> Result<()> {
        self.remove_command(Route::Command {
            application_id,
            command_id,
        })
        .await
    }

    async fn create_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        let route = Route::GuildCommands {
            application_id,
            guild_id,
        };
        self.send_command(route, LightMethod::Post, request).await
    }

    async fn modify_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
        request: &CommandRequest,
    ) -> Result<RemoteCommand> {
        let route = Route::GuildCommand {
            application_id,
            guild_id,
            command_id,
        };
        self.send_command(route, LightMethod::Patch, request).await
    }

    async fn delete_guild_command(
        &self,
        application_id: ApplicationId,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> Result<()> {
        self.remove_command(Route::GuildCommand {
            application_id,
            guild_id,
            command_id,
        })
        .await
    }
}

/// [`InteractionResponder`] that answers through the interaction callback endpoint.
#[derive(Clone)]
pub struct SerenityResponder {
    http: Arc<Http>,
}

impl SerenityResponder {
    /// Wraps a serenity HTTP client.
    pub const fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn build_embed(embed: Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new();
    if let Some(title) = embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = embed.description {
        builder = builder.description(description);
    }
    if let Some(colour) = embed.colour {
        builder = builder.colour(colour);
    }
    for field in embed.fields {
        builder = builder.field(field.name, field.value, field.inline);
    }
    builder
}

fn build_choices(choices: Vec<OptionChoice>) -> CreateAutocompleteResponse {
    let mut response = CreateAutocompleteResponse::new();
    for choice in choices {
        response = match choice.value {
            serde_json::Value::String(value) => response.add_string_choice(choice.name, value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => response.add_int_choice(choice.name, value),
                None => response.add_number_choice(choice.name, number.as_f64().unwrap_or_default()),
            },
            other => response.add_string_choice(choice.name, other.to_string()),
        };
    }
    response
}

#[async_trait]
impl InteractionResponder for SerenityResponder {
    async fn reply(&self, interaction: &InteractionBase, reply: Reply) -> Result<()> {
        let mut message = CreateInteractionResponseMessage::new().ephemeral(reply.ephemeral);
        if let Some(content) = reply.content {
            message = message.content(content);
        }
        if !reply.embeds.is_empty() {
            message = message.embeds(reply.embeds.into_iter().map(build_embed).collect());
        }

        let response = CreateInteractionResponse::Message(message);
        self.http
            .create_interaction_response(interaction.id, &interaction.token, &response, Vec::new())
            .await?;
        Ok(())
    }

    async fn autocomplete(&self, interaction: &InteractionBase, choices: Vec<OptionChoice>) -> Result<()> {
        let response = CreateInteractionResponse::Autocomplete(build_choices(choices));
        self.http
            .create_interaction_response(interaction.id, &interaction.token, &response, Vec::new())
            .await?;
        Ok(())
    }
}

/// [`DataSource`] that fetches every piece over REST.
#[derive(Clone)]
pub struct SerenityDataSource {
    http: Arc<Http>,
}

impl SerenityDataSource {
    /// Wraps a serenity HTTP client.
    pub const fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn user_info(user: &serenity::User) -> UserInfo {
    UserInfo {
        id: user.id,
        name: user.name.clone(),
        bot: user.bot,
        avatar_url: user.avatar_url(),
    }
}

#[async_trait]
impl DataSource for SerenityDataSource {
    async fn current_user(&self) -> Result<UserInfo> {
        let user = self.http.get_current_user().await?;
        Ok(user_info(&user))
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<MemberInfo> {
        let member = self.http.get_member(guild_id, user_id).await?;
        Ok(MemberInfo {
            guild_id,
            user_id,
            nick: member.nick,
            joined_at: member
                .joined_at
                .and_then(|joined| DateTime::<Utc>::from_timestamp(joined.unix_timestamp(), 0)),
        })
    }

    async fn guild(&self, guild_id: GuildId) -> Result<GuildInfo> {
        let guild = self.http.get_guild(guild_id).await?;
        Ok(GuildInfo {
            id: guild_id,
            name: guild.name,
        })
    }

    async fn channel(&self, channel_id: ChannelId) -> Result<ChannelInfo> {
        let channel = self.http.get_channel(channel_id).await?;
        let guild_channel = channel.guild();
        Ok(ChannelInfo {
            id: channel_id,
            name: guild_channel.as_ref().map(|channel| channel.name.clone()),
            guild_id: guild_channel.map(|channel| channel.guild_id),
        })
    }

    async fn user(&self, user_id: UserId) -> Result<UserInfo> {
        let user = self.http.get_user(user_id).await?;
        Ok(user_info(&user))
    }

    async fn message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<MessageInfo> {
        let message = self.http.get_message(channel_id, message_id).await?;
        Ok(MessageInfo {
            id: message.id,
            channel_id,
            author_id: message.author.id,
            content: message.content,
        })
    }
}

/// Classifies the invoking channel and records the permissions Discord resolved.
fn channel_context(interaction: &CommandInteraction, bot_id: UserId) -> ChannelContext {
    let context = ChannelContext {
        channel_id: interaction.channel_id,
        kind: channel_kind(
            interaction.guild_id,
            interaction.channel.as_ref().map(|channel| channel.kind),
        ),
        resolved_permissions: HashMap::new(),
    };
    let member_permissions = interaction.member.as_ref().and_then(|member| member.permissions);
    with_resolved_permissions(
        context,
        [
            (bot_id, interaction.app_permissions),
            (interaction.user.id, member_permissions),
        ],
    )
}

fn channel_kind(guild_id: Option<GuildId>, channel_type: Option<ChannelType>) -> ChannelKind {
    match (guild_id, channel_type) {
        (Some(guild_id), _) => ChannelKind::Guild(guild_id),
        (None, Some(ChannelType::Private) | None) => ChannelKind::Private,
        (None, Some(_)) => ChannelKind::Other,
    }
}

fn with_resolved_permissions(
    context: ChannelContext,
    resolved: impl IntoIterator<Item = (UserId, Option<Permissions>)>,
) -> ChannelContext {
    resolved
        .into_iter()
        .filter_map(|(user_id, permissions)| Some((user_id, permissions?)))
        .fold(context, |context, (user_id, permissions)| {
            context.with_permissions(user_id, permissions)
        })
}

fn interaction_base(interaction: &CommandInteraction, bot_id: UserId) -> InteractionBase {
    InteractionBase {
        id: interaction.id,
        token: interaction.token.clone(),
        application_id: interaction.application_id,
        channel: channel_context(interaction, bot_id),
        user_id: interaction.user.id,
    }
}

fn convert_options(options: &[CommandDataOption]) -> Vec<InteractionOption> {
    options
        .iter()
        .filter_map(|option| {
            let value = match &option.value {
                CommandDataOptionValue::SubCommand(nested) => OptionValue::SubCommand(convert_options(nested)),
                CommandDataOptionValue::SubCommandGroup(nested) => {
                    OptionValue::SubCommandGroup(convert_options(nested))
                }
                CommandDataOptionValue::String(value) => OptionValue::String(value.clone()),
                CommandDataOptionValue::Integer(value) => OptionValue::Integer(*value),
                CommandDataOptionValue::Number(value) => OptionValue::Number(*value),
                CommandDataOptionValue::Boolean(value) => OptionValue::Boolean(*value),
                CommandDataOptionValue::User(id) => OptionValue::User(*id),
                CommandDataOptionValue::Channel(id) => OptionValue::Channel(*id),
                CommandDataOptionValue::Role(id) => OptionValue::Role(*id),
                CommandDataOptionValue::Mentionable(id) => OptionValue::Mentionable(id.get()),
                CommandDataOptionValue::Attachment(id) => OptionValue::Attachment(*id),
                CommandDataOptionValue::Autocomplete { kind, value } => OptionValue::Autocomplete {
                    kind: *kind,
                    value: value.clone(),
                },
                other => {
                    debug!(option = %option.name, "Skipping unsupported option value {other:?}");
                    return None;
                }
            };
            Some(InteractionOption::new(option.name.clone(), value))
        })
        .collect()
}

/// Converts a chat input or autocomplete interaction.
#[must_use]
pub fn chat_input_event(interaction: &CommandInteraction, bot_id: UserId) -> ChatInputEvent {
    ChatInputEvent {
        base: interaction_base(interaction, bot_id),
        command_name: interaction.data.name.clone(),
        options: convert_options(&interaction.data.options),
    }
}

/// Converts a user command interaction; `None` when Discord sent no target.
#[must_use]
pub fn user_event(interaction: &CommandInteraction, bot_id: UserId) -> Option<UserEvent> {
    let target = interaction.data.target_id?;
    Some(UserEvent {
        base: interaction_base(interaction, bot_id),
        command_name: interaction.data.name.clone(),
        target_id: target.to_user_id(),
    })
}

/// Converts a message command interaction; `None` when Discord sent no target.
#[must_use]
pub fn message_event(interaction: &CommandInteraction, bot_id: UserId) -> Option<MessageEvent> {
    let target = interaction.data.target_id?;
    Some(MessageEvent {
        base: interaction_base(interaction, bot_id),
        command_name: interaction.data.name.clone(),
        target_id: target.to_message_id(),
    })
}

/// Routes a gateway interaction to the matching receiver method.
///
/// Returns `Ok(None)` for interactions that are not command or autocomplete interactions.
///
/// # Errors
/// Whatever the receiver returns.
pub async fn dispatch(receiver: &EventReceiver, interaction: &Interaction) -> Result<Option<DispatchOutcome>> {
    let bot_id = receiver.bot_id();
    let outcome = match interaction {
        Interaction::Command(command) => match command.data.kind {
            serenity::CommandType::ChatInput => {
                receiver
                    .receive_chat_input(chat_input_event(command, bot_id))
                    .await?
            }
            serenity::CommandType::User => match user_event(command, bot_id) {
                Some(event) => receiver.receive_user(event).await?,
                None => return Ok(None),
            },
            serenity::CommandType::Message => match message_event(command, bot_id) {
                Some(event) => receiver.receive_message(event).await?,
                None => return Ok(None),
            },
            other => {
                warn!("Ignoring interaction for unknown command type {other:?}");
                return Ok(None);
            }
        },
        Interaction::Autocomplete(command) => {
            receiver
                .receive_autocomplete(chat_input_event(command, bot_id))
                .await?
        }
        _ => return Ok(None),
    };
    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ChatCommand, CommandOption, CommandType, command_data_equals_request};
    use crate::errors::Error;
    use crate::test_utils::CountingHandler;
    use poise::serenity_prelude::{CommandOptionType, RoleId};
    use rstest::rstest;
    use serde_json::json;

    fn remote(payload: serde_json::Value) -> Result<RemoteCommand> {
        Ok(normalize_remote(serde_json::from_value(payload)?))
    }

    #[test]
    fn test_restricted_command_matches_its_registration() -> Result<()> {
        let registered = remote(json!({
            "id": "1000",
            "type": 1,
            "name": "ban",
            "description": "ban someone",
            "default_permission": false,
            "options": [{"type": 3, "name": "reason", "description": "why", "required": true}]
        }))?;
        let local = ChatCommand::top("ban", "ban someone", CountingHandler::default())
            .with_option(CommandOption::new(CommandOptionType::String, "reason", "why").required(true))?
            .default_permission_false()?;

        assert_eq!(registered.default_permission, Some(false));
        assert!(command_data_equals_request(&registered, &local.as_request()));
        Ok(())
    }

    #[test]
    fn test_empty_options_are_absent() -> Result<()> {
        let registered = remote(json!({
            "id": "1001",
            "type": 1,
            "application_id": "42",
            "version": "1",
            "name": "ping",
            "description": "Replies with Pong!",
            "default_permission": true,
            "options": []
        }))?;
        let local = ChatCommand::top("ping", "Replies with Pong!", CountingHandler::default());

        assert_eq!(registered.options, None);
        assert_eq!(registered.id, CommandId::new(1001));
        assert!(command_data_equals_request(&registered, &local.as_request()));
        Ok(())
    }

    #[test]
    fn test_untyped_record_keeps_missing_type() -> Result<()> {
        let registered = remote(json!({"id": "7", "name": "legacy", "description": "old"}))?;
        assert_eq!(registered.kind, None);
        assert_eq!(registered.default_permission, None);
        assert!(registered.command_type().is_err());
        Ok(())
    }

    #[rstest]
    #[case(Some(GuildId::new(5)), Some(ChannelType::Text), ChannelKind::Guild(GuildId::new(5)))]
    #[case(Some(GuildId::new(5)), None, ChannelKind::Guild(GuildId::new(5)))]
    #[case(None, Some(ChannelType::Private), ChannelKind::Private)]
    #[case(None, None, ChannelKind::Private)]
    #[case(None, Some(ChannelType::Text), ChannelKind::Other)]
    fn test_channel_kind(
        #[case] guild_id: Option<GuildId>,
        #[case] channel_type: Option<ChannelType>,
        #[case] expected: ChannelKind,
    ) {
        assert_eq!(channel_kind(guild_id, channel_type), expected);
    }

    #[test]
    fn test_only_resolved_permissions_are_recorded() {
        let context = with_resolved_permissions(
            ChannelContext::guild(GuildId::new(1), ChannelId::new(2)),
            [
                (UserId::new(10), Some(Permissions::BAN_MEMBERS)),
                (UserId::new(20), None),
            ],
        );

        assert_eq!(
            context.resolved_permissions.get(&UserId::new(10)),
            Some(&Permissions::BAN_MEMBERS)
        );
        assert!(!context.resolved_permissions.contains_key(&UserId::new(20)));
    }

    #[test]
    fn test_nested_options_resolve_to_leaf() -> Result<()> {
        let raw: Vec<CommandDataOption> = serde_json::from_value(json!([{
            "name": "roles",
            "type": 2,
            "options": [{
                "name": "add",
                "type": 1,
                "options": [
                    {"name": "role", "type": 8, "value": "123"},
                    {"name": "note", "type": 3, "value": "welcome"}
                ]
            }]
        }]))?;
        let options = convert_options(&raw);
        let leaf_options = vec![
            InteractionOption::new("role", OptionValue::Role(RoleId::new(123))),
            InteractionOption::new("note", OptionValue::String("welcome".to_string())),
        ];
        assert_eq!(
            options,
            vec![InteractionOption::sub_command_group(
                "roles",
                vec![InteractionOption::sub_command("add", leaf_options.clone())],
            )]
        );

        let add = ChatCommand::sub("add", "add a role", CountingHandler::default());
        let tree = ChatCommand::top_group("config", "configure the bot")
            .with_sub_command(ChatCommand::mid_group("roles", "role settings").with_sub_command(add)?)?;
        let (leaf, residual) = tree.resolve(&options).ok_or_else(|| Error::UnknownCommand {
            kind: CommandType::Chat,
            path: "config roles add".to_string(),
        })?;
        assert_eq!(leaf.name(), "add");
        assert_eq!(residual, leaf_options.as_slice());
        Ok(())
    }

    #[test]
    fn test_focused_option_is_autocomplete() -> Result<()> {
        let raw: Vec<CommandDataOption> = serde_json::from_value(json!([
            {"name": "user", "type": 6, "value": "77"},
            {"name": "reason", "type": 3, "value": "sp", "focused": true}
        ]))?;
        assert_eq!(
            convert_options(&raw),
            vec![
                InteractionOption::new("user", OptionValue::User(UserId::new(77))),
                InteractionOption::new(
                    "reason",
                    OptionValue::Autocomplete {
                        kind: CommandOptionType::String,
                        value: "sp".to_string(),
                    },
                ),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_autocomplete_choices_keep_value_types() -> Result<()> {
        let choice = |name: &str, value: serde_json::Value| OptionChoice {
            name: name.to_string(),
            value,
        };
        let response = build_choices(vec![
            choice("Red", json!("red")),
            choice("Three", json!(3)),
            choice("Half", json!(0.5)),
            choice("Yes", json!(true)),
        ]);

        let body = serde_json::to_value(&response)?;
        let values: Vec<&serde_json::Value> = body["choices"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|choice| &choice["value"])
            .collect();
        assert_eq!(values, [&json!("red"), &json!(3), &json!(0.5), &json!("true")]);
        assert_eq!(body["choices"][1]["name"], json!("Three"));
        Ok(())
    }
}
