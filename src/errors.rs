//! Unified error types and result handling.

use crate::commands::CommandType;
use thiserror::Error;

/// Every failure the registry, reconciler and dispatcher can surface.
#[derive(Debug, Error)]
pub enum Error {
    /// A chat command was placed somewhere its kind is not allowed.
    #[error("Command `{command}` cannot be placed under `{parent}`; expected {expected}")]
    InvalidCommandLocation {
        /// Name of the offending command
        command: String,
        /// Name of the attempted parent (`<root>` for a catalog mapping)
        parent: String,
        /// The kind(s) of command the parent accepts
        expected: &'static str,
    },

    /// `default_permission_false` was called below the top level.
    #[error(
        "Default permission only works on top commands or top group commands! Command: {command}"
    )]
    DisallowedDefaultPermission {
        /// Name of the offending command
        command: String,
    },

    /// Two commands of the same type share a name within one mapping.
    #[error("Duplicate {kind} command: {name}")]
    DuplicateCommand {
        /// The command type namespace the collision happened in
        kind: CommandType,
        /// The colliding name
        name: String,
    },

    /// The remote service returned a command without a type tag.
    #[error("Discord did not return a type for an interaction with name: {name}")]
    MissingCommandType {
        /// Name of the remote command
        name: String,
    },

    /// The remote service returned a command type this crate does not know.
    #[error("Unknown interaction type ({value}) with name: {name}")]
    UnknownCommandType {
        /// Name of the remote command
        name: String,
        /// The raw type value
        value: u8,
    },

    /// An inbound interaction did not match any registered command.
    #[error("No {kind} command registered for `{path}`")]
    UnknownCommand {
        /// The command type that was searched
        kind: CommandType,
        /// Space separated command path from the interaction
        path: String,
    },

    /// A piece of required context data could not be collected.
    #[error("Required {data} could not be collected: {reason}")]
    DataMissing {
        /// The piece of data that is missing
        data: crate::bot::DataKind,
        /// Why it could not be obtained
        reason: String,
    },

    /// A remote command service call failed.
    #[error("Remote command service error: {message}")]
    Remote {
        /// Description of the failure
        message: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// A required environment variable is missing or malformed.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Encoding a command request body failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serenity transport failure.
    #[error("Serenity framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_location_names_command_and_parent() {
        let error = Error::InvalidCommandLocation {
            command: "add".to_string(),
            parent: "roles".to_string(),
            expected: "a sub command",
        };
        let message = error.to_string();
        assert!(message.contains("`add`"));
        assert!(message.contains("`roles`"));
        assert!(message.contains("a sub command"));
    }

    #[test]
    fn test_duplicate_command_mentions_type() {
        let error = Error::DuplicateCommand {
            kind: CommandType::Chat,
            name: "ping".to_string(),
        };
        assert_eq!(error.to_string(), "Duplicate CHAT_INPUT command: ping");
    }
}
