//! Commands shipped with the bot binary.

/// General utility commands
pub mod general;

pub use general::{ping, status};

use crate::core::CommandLists;

/// The command lists the bot registers on startup.
#[must_use]
pub fn default_commands() -> CommandLists {
    CommandLists {
        global_chat: vec![ping(), status()],
        ..CommandLists::default()
    }
}
