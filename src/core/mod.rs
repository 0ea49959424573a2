//! Framework-agnostic command registry and reconciliation.
//!
//! Nothing in here talks to Discord directly; remote catalogs and guild entitlements are
//! reached through the [`CommandService`] and [`GuildCommandStateProvider`] traits.

pub mod guild_state;
pub mod register;
pub mod service;
pub mod structure;

pub use guild_state::{AllowedCommands, GuildCommandStateProvider, StaticGuildCommandState};
pub use register::{CommandLists, CommandRegister};
pub use service::{CommandScope, CommandService};
pub use structure::{Catalog, CommandRef, CommandStructure};
