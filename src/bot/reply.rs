//! Interaction replies and the capability that delivers them.

use super::events::InteractionBase;
use crate::commands::OptionChoice;
use crate::errors::Result;
use async_trait::async_trait;
use poise::serenity_prelude::Colour;

/// A field inside an embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    /// Field title
    pub name: String,
    /// Field body
    pub value: String,
    /// Whether the field may share a row with others
    pub inline: bool,
}

/// A rich embed attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    /// Embed title
    pub title: Option<String>,
    /// Embed description
    pub description: Option<String>,
    /// Side bar colour
    pub colour: Option<Colour>,
    /// Fields, in display order
    pub fields: Vec<EmbedField>,
}

impl Embed {
    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the colour.
    #[must_use]
    pub fn colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    /// Looks up a field by title.
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }
}

/// A message sent in response to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    /// Plain text content
    pub content: Option<String>,
    /// Embeds
    pub embeds: Vec<Embed>,
    /// Whether only the invoking user sees the reply
    pub ephemeral: bool,
}

impl Reply {
    /// A plain text reply.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A reply carrying a single embed.
    #[must_use]
    pub fn embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    /// Makes the reply visible only to the invoking user.
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }
}

/// Delivers responses to interactions.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    /// Responds to a command interaction with a message.
    async fn reply(&self, interaction: &InteractionBase, reply: Reply) -> Result<()>;

    /// Responds to an autocomplete interaction with suggestions.
    async fn autocomplete(
        &self,
        interaction: &InteractionBase,
        choices: Vec<OptionChoice>,
    ) -> Result<()>;
}
