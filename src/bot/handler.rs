//! The handler interface leaf commands implement.

use super::context::{AutocompleteContext, Context, ContextBuilder};
use super::events::InteractionEvent;
use crate::errors::Result;
use async_trait::async_trait;

/// Business logic behind a leaf command.
///
/// `E` is the event shape the command is invoked with: [`ChatInputEvent`] for slash
/// commands, [`UserEvent`] and [`MessageEvent`] for context menu commands.
///
/// [`ChatInputEvent`]: super::ChatInputEvent
/// [`UserEvent`]: super::UserEvent
/// [`MessageEvent`]: super::MessageEvent
#[async_trait]
pub trait CommandHandler<E: InteractionEvent>: Send + Sync {
    /// Marks the contextual data the handler wants collected before it runs.
    fn set_request_data(&self, builder: &mut ContextBuilder<E>) {
        let _ = builder;
    }

    /// Runs the command.
    async fn execute(&self, context: Context<E>) -> Result<()>;

    /// Answers an autocomplete interaction. Only called for chat commands.
    async fn autocomplete(&self, context: AutocompleteContext) -> Result<()> {
        let _ = context;
        Ok(())
    }
}
