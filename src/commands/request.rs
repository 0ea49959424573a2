//! Request and remote record shapes plus the structural equality used to decide
//! whether a registered command needs updating.

use super::CommandType;
use crate::errors::{Error, Result};
use poise::serenity_prelude::{CommandId, CommandOptionType};
use serde::{Deserialize, Serialize};

/// A choice offered for a string, integer or number option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    /// Display name of the choice
    pub name: String,
    /// Value sent back when the choice is picked
    pub value: serde_json::Value,
}

/// An option (argument, sub command or sub command group) of a chat command.
///
/// Nested options are compared structurally, so two options are equal when every field
/// down the tree matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    /// Discord option type
    #[serde(rename = "type")]
    pub kind: CommandOptionType,
    /// Option name
    pub name: String,
    /// Option description
    pub description: String,
    /// Whether the user must supply the option
    #[serde(default)]
    pub required: bool,
    /// Whether the option is completed through autocomplete interactions
    #[serde(default)]
    pub autocomplete: bool,
    /// Predefined choices
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    /// Nested options of a sub command or sub command group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    /// Creates an optional, choice-less option.
    pub fn new(
        kind: CommandOptionType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            required: false,
            autocomplete: false,
            choices: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Marks whether the option must be supplied.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Marks the option as autocompleted.
    #[must_use]
    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }

    /// Adds a predefined choice.
    #[must_use]
    pub fn add_choice(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.choices.push(OptionChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a nested option.
    #[must_use]
    pub fn add_option(mut self, option: Self) -> Self {
        self.options.push(option);
        self
    }
}

/// The shape sent to Discord when creating or modifying a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest {
    /// Command type
    #[serde(rename = "type")]
    pub kind: CommandType,
    /// Command name
    pub name: String,
    /// Command description
    pub description: String,
    /// Only present when the command is restricted by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_permission: Option<bool>,
    /// Top level options, absent when the command takes none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<CommandOption>>,
}

/// A command as currently registered with Discord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCommand {
    /// Remote identifier
    pub id: CommandId,
    /// Raw command type, absent when Discord omitted it
    #[serde(rename = "type", default)]
    pub kind: Option<u8>,
    /// Command name
    pub name: String,
    /// Command description
    #[serde(default)]
    pub description: String,
    /// Default permission flag, absent means `true`
    #[serde(default)]
    pub default_permission: Option<bool>,
    /// Options, absent when the command takes none
    #[serde(default)]
    pub options: Option<Vec<CommandOption>>,
}

impl RemoteCommand {
    /// Resolves the type tag, failing for commands this crate cannot reason about.
    pub fn command_type(&self) -> Result<CommandType> {
        let value = self.kind.ok_or_else(|| Error::MissingCommandType {
            name: self.name.clone(),
        })?;
        CommandType::from_value(value).ok_or_else(|| Error::UnknownCommandType {
            name: self.name.clone(),
            value,
        })
    }
}

/// Compares two default permission values where an absent value means `true`.
#[must_use]
pub fn default_permission_equals(left: Option<bool>, right: Option<bool>) -> bool {
    left.unwrap_or(true) == right.unwrap_or(true)
}

/// Checks whether a registered command matches the local request.
///
/// Name, description and the effective default permission must match. Options are equal
/// when both sides carry equal lists or both sides carry none; one side having options
/// and the other not is a mismatch.
#[must_use]
pub fn command_data_equals_request(remote: &RemoteCommand, request: &CommandRequest) -> bool {
    if request.name != remote.name
        || request.description != remote.description
        || !default_permission_equals(request.default_permission, remote.default_permission)
    {
        return false;
    }

    match (&remote.options, &request.options) {
        (Some(remote_options), Some(local_options)) => remote_options == local_options,
        (None, None) => true,
        _ => false,
    }
}
