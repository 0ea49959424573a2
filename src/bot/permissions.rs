//! Permission gating for command invocations.

use super::events::{ChannelContext, ChannelKind};
use super::reply::{Embed, Reply};
use crate::commands::CommandMeta;
use crate::errors::Result;
use async_trait::async_trait;
use poise::serenity_prelude::{Colour, Permissions, UserId};
use tracing::debug;

/// Computes a user's effective permissions in a guild channel.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Effective permissions of `user_id` in `channel`.
    async fn effective_permissions(&self, channel: &ChannelContext, user_id: UserId) -> Result<Permissions>;
}

/// Reads the permissions Discord resolved into the interaction payload.
///
/// Users without a resolved entry have no permissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadPermissions;

#[async_trait]
impl PermissionOracle for PayloadPermissions {
    async fn effective_permissions(&self, channel: &ChannelContext, user_id: UserId) -> Result<Permissions> {
        Ok(channel
            .resolved_permissions
            .get(&user_id)
            .copied()
            .unwrap_or_else(Permissions::empty))
    }
}

/// Decides whether a command may run where it was invoked.
///
/// In a guild channel both the bot and the invoking user must hold every required
/// permission. In a direct message the command must be usable in DMs. Anything else is
/// denied.
///
/// # Errors
/// Propagates failures of the permission oracle.
pub async fn check_permissions(
    meta: &CommandMeta,
    channel: &ChannelContext,
    bot_id: UserId,
    user_id: UserId,
    oracle: &dyn PermissionOracle,
) -> Result<bool> {
    match channel.kind {
        ChannelKind::Guild(_) => {
            let bot = oracle.effective_permissions(channel, bot_id).await?;
            if !bot.contains(meta.bot_permissions()) {
                debug!(command = meta.name(), "bot lacks {:?}", meta.bot_permissions() - bot);
                return Ok(false);
            }
            let user = oracle.effective_permissions(channel, user_id).await?;
            if !user.contains(meta.user_permissions()) {
                debug!(command = meta.name(), "user lacks {:?}", meta.user_permissions() - user);
                return Ok(false);
            }
            Ok(true)
        }
        ChannelKind::Private => Ok(meta.usable_in_dms()),
        ChannelKind::Other => Ok(false),
    }
}

fn permission_list(permissions: Permissions) -> String {
    format!("`{}`", permissions.get_permission_names().join(", "))
}

/// The ephemeral reply sent when a command is denied.
#[must_use]
pub fn denial_reply(meta: &CommandMeta) -> Reply {
    let mut embed = Embed::default()
        .colour(Colour::RED)
        .title("Cannot execute command!")
        .description(if meta.usable_in_dms() {
            "This command is usable in DMs"
        } else {
            "This command is not usable in DMs"
        });

    if !meta.bot_permissions().is_empty() {
        embed = embed.field("Required Bot Permissions", permission_list(meta.bot_permissions()), false);
    }
    if !meta.user_permissions().is_empty() {
        embed = embed.field("Required User Permissions", permission_list(meta.user_permissions()), false);
    }

    Reply::embed(embed).ephemeral()
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{ChannelId, GuildId};
    use rstest::rstest;

    fn meta(bot: Permissions, user: Permissions, dms: bool) -> CommandMeta {
        let mut meta = CommandMeta::new("purge", "delete messages");
        meta.set_bot_permissions(bot);
        meta.set_user_permissions(user);
        if dms {
            meta.set_usable_in_dms();
        }
        meta
    }

    fn guild_channel(bot: Permissions, user: Permissions) -> ChannelContext {
        ChannelContext::guild(GuildId::new(1), ChannelId::new(2))
            .with_permissions(UserId::new(10), bot)
            .with_permissions(UserId::new(20), user)
    }

    #[rstest]
    #[case(Permissions::MANAGE_MESSAGES, Permissions::MANAGE_MESSAGES, true)]
    #[case(Permissions::empty(), Permissions::MANAGE_MESSAGES, false)]
    #[case(Permissions::MANAGE_MESSAGES, Permissions::SEND_MESSAGES, false)]
    #[case(Permissions::all(), Permissions::all(), true)]
    #[tokio::test]
    async fn test_guild_requires_both_sets(
        #[case] bot: Permissions,
        #[case] user: Permissions,
        #[case] expected: bool,
    ) -> Result<()> {
        let meta = meta(Permissions::MANAGE_MESSAGES, Permissions::MANAGE_MESSAGES, true);
        let channel = guild_channel(bot, user);
        let allowed =
            check_permissions(&meta, &channel, UserId::new(10), UserId::new(20), &PayloadPermissions).await?;
        assert_eq!(allowed, expected);
        Ok(())
    }

    #[tokio::test]
    async fn test_dm_and_other_channels() -> Result<()> {
        let private = ChannelContext::private(ChannelId::new(3));
        let usable = meta(Permissions::empty(), Permissions::empty(), true);
        let guild_only = meta(Permissions::empty(), Permissions::empty(), false);
        let (bot, user) = (UserId::new(10), UserId::new(20));

        assert!(check_permissions(&usable, &private, bot, user, &PayloadPermissions).await?);
        assert!(!check_permissions(&guild_only, &private, bot, user, &PayloadPermissions).await?);

        let other = ChannelContext {
            kind: ChannelKind::Other,
            ..ChannelContext::private(ChannelId::new(4))
        };
        assert!(!check_permissions(&usable, &other, bot, user, &PayloadPermissions).await?);
        Ok(())
    }

    #[test]
    fn test_denial_reply_lists_requirements() {
        let reply = denial_reply(&meta(Permissions::MANAGE_MESSAGES, Permissions::empty(), false));
        assert!(reply.ephemeral);
        let embed = &reply.embeds[0];
        assert_eq!(embed.title.as_deref(), Some("Cannot execute command!"));
        assert_eq!(embed.description.as_deref(), Some("This command is not usable in DMs"));
        assert_eq!(embed.colour, Some(Colour::RED));
        assert_eq!(embed.field_value("Required Bot Permissions"), Some("`Manage Messages`"));
        assert_eq!(embed.field_value("Required User Permissions"), None);
    }
}
