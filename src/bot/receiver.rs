//! Interaction dispatch.
//!
//! Every inbound command interaction goes through the same steps: resolve the command,
//! gate it on permissions, collect the data the handler asked for, then execute.

use super::context::{AutocompleteContext, ContextBuilder, DataSource};
use super::events::{ChatInputEvent, InteractionBase, InteractionEvent, InteractionOption, MessageEvent, UserEvent};
use super::handler::CommandHandler;
use super::permissions::{PermissionOracle, check_permissions, denial_reply};
use super::reply::InteractionResponder;
use crate::commands::{ChatCommand, CommandMeta, CommandType};
use crate::core::CommandStructure;
use crate::errors::{Error, Result};
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What happened to a dispatched interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran
    Executed,
    /// The permission gate refused the invocation
    Denied,
}

/// Routes interactions to the handlers in a [`CommandStructure`].
#[derive(Clone)]
pub struct EventReceiver {
    structure: Arc<CommandStructure>,
    oracle: Arc<dyn PermissionOracle>,
    responder: Arc<dyn InteractionResponder>,
    data_source: Arc<dyn DataSource>,
    bot_id: UserId,
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReceiver")
            .field("bot_id", &self.bot_id)
            .finish_non_exhaustive()
    }
}

fn leaf_handler(command: &ChatCommand, event: &ChatInputEvent) -> Result<Arc<dyn CommandHandler<ChatInputEvent>>> {
    command.handler().map(Arc::clone).ok_or_else(|| Error::UnknownCommand {
        kind: CommandType::Chat,
        path: event.command_path(),
    })
}

impl EventReceiver {
    /// Creates a receiver for the given structure and capabilities.
    pub fn new(
        structure: Arc<CommandStructure>,
        oracle: Arc<dyn PermissionOracle>,
        responder: Arc<dyn InteractionResponder>,
        data_source: Arc<dyn DataSource>,
        bot_id: UserId,
    ) -> Self {
        Self {
            structure,
            oracle,
            responder,
            data_source,
            bot_id,
        }
    }

    /// The structure interactions are resolved against
    pub const fn structure(&self) -> &Arc<CommandStructure> {
        &self.structure
    }

    /// The bot's own user id
    pub const fn bot_id(&self) -> UserId {
        self.bot_id
    }

    async fn permitted(&self, meta: &CommandMeta, base: &InteractionBase) -> Result<bool> {
        check_permissions(meta, &base.channel, self.bot_id, base.user_id, self.oracle.as_ref()).await
    }

    async fn deny(&self, meta: &CommandMeta, base: &InteractionBase) -> Result<DispatchOutcome> {
        warn!(command = meta.name(), user = %base.user_id, "command denied");
        self.responder.reply(base, denial_reply(meta)).await?;
        Ok(DispatchOutcome::Denied)
    }

    async fn run<E: InteractionEvent>(
        &self,
        handler: &dyn CommandHandler<E>,
        event: E,
        options: Vec<InteractionOption>,
    ) -> Result<DispatchOutcome> {
        let mut builder = ContextBuilder::new(event, options, self.bot_id);
        handler.set_request_data(&mut builder);
        let builder = builder.collect_data(self.data_source.as_ref()).await?;
        handler.execute(builder.build(Arc::clone(&self.responder))).await?;
        Ok(DispatchOutcome::Executed)
    }

    /// Dispatches a chat input interaction to its leaf command.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when the payload does not match the structure; otherwise
    /// whatever responding, data collection or the handler returns.
    #[instrument(skip_all, fields(command = %event.command_path()))]
    pub async fn receive_chat_input(&self, event: ChatInputEvent) -> Result<DispatchOutcome> {
        let (command, options) = self.structure.search_for_chat_command(&event)?;
        if !self.permitted(command.meta(), &event.base).await? {
            return self.deny(command.meta(), &event.base).await;
        }
        let handler = leaf_handler(command, &event)?;
        let options = options.to_vec();

        debug!("Executing chat command");
        self.run(handler.as_ref(), event, options).await
    }

    /// Dispatches a user context menu interaction.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when no user command has the interaction's name;
    /// otherwise whatever responding, data collection or the handler returns.
    #[instrument(skip_all, fields(command = %event.command_name))]
    pub async fn receive_user(&self, event: UserEvent) -> Result<DispatchOutcome> {
        let command = self.structure.search_for_user_command(&event)?;
        if !self.permitted(command.meta(), &event.base).await? {
            return self.deny(command.meta(), &event.base).await;
        }
        let handler = Arc::clone(command.handler());

        debug!("Executing user command");
        self.run(handler.as_ref(), event, Vec::new()).await
    }

    /// Dispatches a message context menu interaction.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when no message command has the interaction's name;
    /// otherwise whatever responding, data collection or the handler returns.
    #[instrument(skip_all, fields(command = %event.command_name))]
    pub async fn receive_message(&self, event: MessageEvent) -> Result<DispatchOutcome> {
        let command = self.structure.search_for_message_command(&event)?;
        if !self.permitted(command.meta(), &event.base).await? {
            return self.deny(command.meta(), &event.base).await;
        }
        let handler = Arc::clone(command.handler());

        debug!("Executing message command");
        self.run(handler.as_ref(), event, Vec::new()).await
    }

    /// Dispatches an autocomplete interaction to its leaf command.
    ///
    /// A failed permission check sends nothing back; the user simply gets no suggestions.
    ///
    /// # Errors
    /// [`Error::UnknownCommand`] when the payload does not match the structure; otherwise
    /// whatever the handler returns.
    #[instrument(skip_all, fields(command = %event.command_path()))]
    pub async fn receive_autocomplete(&self, event: ChatInputEvent) -> Result<DispatchOutcome> {
        let (command, options) = self.structure.search_for_chat_command(&event)?;
        if !self.permitted(command.meta(), &event.base).await? {
            debug!("Autocomplete denied");
            return Ok(DispatchOutcome::Denied);
        }
        let handler = leaf_handler(command, &event)?;
        let options = options.to_vec();

        handler
            .autocomplete(AutocompleteContext::new(event, options, Arc::clone(&self.responder)))
            .await?;
        Ok(DispatchOutcome::Executed)
    }
}
