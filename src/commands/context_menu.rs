//! User and message context menu commands.
//!
//! Context menu commands are single level: a name, gating metadata and a handler.
//! Discord requires their description to be empty.

use super::request::CommandRequest;
use super::{CommandMeta, RemoteId};
use crate::bot::{CommandHandler, InteractionEvent, MessageEvent, UserEvent};
use poise::serenity_prelude::{CommandId, Permissions};
use std::fmt;
use std::sync::Arc;

/// A context menu command invoked with events of type `E`.
pub struct ContextMenuCommand<E: InteractionEvent> {
    meta: CommandMeta,
    handler: Arc<dyn CommandHandler<E>>,
    remote_id: RemoteId,
}

/// A command shown in the user context menu
pub type UserCommand = ContextMenuCommand<UserEvent>;
/// A command shown in the message context menu
pub type MessageCommand = ContextMenuCommand<MessageEvent>;

impl<E: InteractionEvent> fmt::Debug for ContextMenuCommand<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextMenuCommand")
            .field("kind", &E::KIND)
            .field("meta", &self.meta)
            .field("remote_id", &self.remote_id.get())
            .finish_non_exhaustive()
    }
}

impl<E: InteractionEvent> ContextMenuCommand<E> {
    /// Creates a command with Discord's default gating.
    pub fn new(name: impl Into<String>, handler: impl CommandHandler<E> + 'static) -> Self {
        Self {
            meta: CommandMeta::new(name, String::new()),
            handler: Arc::new(handler),
            remote_id: RemoteId::default(),
        }
    }

    /// Sets the permissions the bot needs to run this command.
    #[must_use]
    pub fn with_bot_permissions(mut self, permissions: Permissions) -> Self {
        self.meta.set_bot_permissions(permissions);
        self
    }

    /// Sets the permissions the invoking user needs to run this command.
    #[must_use]
    pub fn with_user_permissions(mut self, permissions: Permissions) -> Self {
        self.meta.set_user_permissions(permissions);
        self
    }

    /// Allows the command in direct messages.
    #[must_use]
    pub fn usable_in_dms(mut self) -> Self {
        self.meta.set_usable_in_dms();
        self
    }

    /// Requires an explicit permission overlay for users to see the command.
    #[must_use]
    pub fn default_permission_false(mut self) -> Self {
        self.meta.set_default_permission_false();
        self
    }

    /// Shared metadata
    #[must_use]
    pub const fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// The handler
    #[must_use]
    pub const fn handler(&self) -> &Arc<dyn CommandHandler<E>> {
        &self.handler
    }

    /// The remote id assigned by reconciliation.
    #[must_use]
    pub fn remote_id(&self) -> Option<CommandId> {
        self.remote_id.get()
    }

    pub(crate) fn assign_remote_id(&self, id: CommandId) {
        self.remote_id.assign(id);
    }

    /// The shape registered with Discord.
    #[must_use]
    pub fn as_request(&self) -> CommandRequest {
        CommandRequest {
            kind: E::KIND,
            name: self.meta.name().to_string(),
            description: String::new(),
            default_permission: self.meta.requested_default_permission(),
            options: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandType;
    use crate::test_utils::CountingHandler;

    #[test]
    fn test_request_carries_type_and_no_options() {
        let command = UserCommand::new("inspect", CountingHandler::default()).default_permission_false();
        let request = command.as_request();
        assert_eq!(request.kind, CommandType::User);
        assert_eq!(request.description, "");
        assert_eq!(request.default_permission, Some(false));
        assert_eq!(request.options, None);

        let message = MessageCommand::new("quote", CountingHandler::default());
        assert_eq!(message.as_request().kind, CommandType::Message);
    }
}
