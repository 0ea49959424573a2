//! Bot layer - interaction events, dispatch and the serenity adapters
//!
//! This module turns inbound interactions into handler invocations: events are resolved
//! against the command structure, gated on permissions, enriched with the contextual
//! data handlers ask for, and finally executed.

/// Commands shipped with the bot binary
pub mod commands;
/// Context builders and the data they collect
pub mod context;
/// Serenity implementations of the capability traits
pub mod discord;
/// Transport independent interaction events
pub mod events;
/// The handler trait leaf commands implement
pub mod handler;
/// Permission gating
pub mod permissions;
/// Interaction dispatch
pub mod receiver;
/// Replies and the responder capability
pub mod reply;

pub use context::{
    AutocompleteContext, ChannelInfo, ChatContext, ChatContextBuilder, Context, ContextBuilder, DataKind,
    DataRequest, DataSource, GuildInfo, MemberInfo, MessageContext, MessageContextBuilder, MessageInfo,
    UserContext, UserContextBuilder, UserInfo,
};
pub use events::{
    ChannelContext, ChannelKind, ChatInputEvent, InteractionBase, InteractionEvent, InteractionOption,
    MessageEvent, OptionValue, UserEvent,
};
pub use handler::CommandHandler;
pub use permissions::{PayloadPermissions, PermissionOracle, check_permissions, denial_reply};
pub use receiver::{DispatchOutcome, EventReceiver};
pub use reply::{Embed, EmbedField, InteractionResponder, Reply};
