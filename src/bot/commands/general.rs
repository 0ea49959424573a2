//! General commands - ping and status.
//! These commands need no guild entitlement and work in direct messages.

use crate::{
    bot::{ChatContext, ChatContextBuilder, ChatInputEvent, CommandHandler, DataKind, Embed, Reply},
    commands::ChatCommand,
    errors::Result,
};
use async_trait::async_trait;
use poise::serenity_prelude::Colour;

/// Responds with "Pong!" to test bot connectivity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

#[async_trait]
impl CommandHandler<ChatInputEvent> for Ping {
    async fn execute(&self, context: ChatContext) -> Result<()> {
        context.reply(Reply::text("Pong!")).await
    }
}

/// The `/ping` command.
#[must_use]
pub fn ping() -> ChatCommand {
    ChatCommand::top("ping", "Check that the bot is responsive", Ping).usable_in_dms()
}

/// Shows who the bot is and, inside a guild, when it joined.
#[derive(Debug, Clone, Copy, Default)]
pub struct Status;

#[async_trait]
impl CommandHandler<ChatInputEvent> for Status {
    fn set_request_data(&self, builder: &mut ChatContextBuilder) {
        builder.require(DataKind::BotUser).request(DataKind::BotMember);
    }

    async fn execute(&self, context: ChatContext) -> Result<()> {
        let mut embed = Embed::default().colour(Colour::BLURPLE).title("Status");
        if let Some(user) = context.bot_user() {
            embed = embed.description(format!("Logged in as **{}**", user.name));
        }
        let joined = match context.bot_member() {
            Some(member) => member
                .joined_at
                .map_or_else(|| "Unknown".to_string(), |joined| format!("<t:{}:R>", joined.timestamp())),
            None => "Not in a server".to_string(),
        };
        embed = embed.field("Joined this server", joined, true);
        context.reply(Reply::embed(embed).ephemeral()).await
    }
}

/// The `/status` command.
#[must_use]
pub fn status() -> ChatCommand {
    ChatCommand::top("status", "Show the bot's status", Status).usable_in_dms()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{ChannelContext, ContextBuilder, InteractionResponder};
    use crate::test_utils::{RecordingResponder, StaticDataSource, bot_id, chat_event};
    use poise::serenity_prelude::{ChannelId, GuildId};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ping_replies_pong() -> Result<()> {
        let responder = Arc::new(RecordingResponder::default());
        let event = chat_event(ChannelContext::private(ChannelId::new(1)), "ping", vec![]);
        let context = ContextBuilder::new(event, vec![], bot_id())
            .build(Arc::<RecordingResponder>::clone(&responder) as Arc<dyn InteractionResponder>);

        Ping.execute(context).await?;
        assert_eq!(responder.replies(), vec![Reply::text("Pong!")]);
        Ok(())
    }

    #[tokio::test]
    async fn test_status_reports_bot_member() -> Result<()> {
        let responder = Arc::new(RecordingResponder::default());
        let source = StaticDataSource::default();
        let event = chat_event(ChannelContext::guild(GuildId::new(3), ChannelId::new(4)), "status", vec![]);
        let mut builder = ContextBuilder::new(event, vec![], bot_id());
        Status.set_request_data(&mut builder);
        let context = builder
            .collect_data(&source)
            .await?
            .build(Arc::<RecordingResponder>::clone(&responder) as Arc<dyn InteractionResponder>);

        Status.execute(context).await?;
        let replies = responder.replies();
        assert!(replies[0].ephemeral);
        assert_eq!(replies[0].embeds[0].description.as_deref(), Some("Logged in as **slashlib**"));
        assert_eq!(
            replies[0].embeds[0].field_value("Joined this server"),
            Some("Unknown")
        );
        assert_eq!(source.calls(), vec![DataKind::BotUser, DataKind::BotMember]);
        Ok(())
    }

    #[test]
    fn test_commands_are_usable_in_dms() {
        assert!(ping().meta().usable_in_dms());
        assert!(status().meta().usable_in_dms());
    }
}
