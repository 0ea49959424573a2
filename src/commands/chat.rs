//! Chat input (slash) commands.
//!
//! A chat command tree has at most three levels: a top command or top group, an
//! optional mid group, and leaf sub commands. Which kind may sit under which is decided
//! by [`ChatKind::accepts`] once, when the tree is built.

use super::request::{CommandOption, CommandRequest};
use super::{CommandMeta, CommandType, RemoteId};
use crate::bot::{ChatInputEvent, CommandHandler, InteractionOption};
use crate::errors::{Error, Result};
use poise::serenity_prelude::{CommandId, CommandOptionType, Permissions};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Handler type of a chat leaf command
pub type ChatHandler = dyn CommandHandler<ChatInputEvent>;

/// The position and shape of a chat command in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    /// Leaf command at the top level
    Top,
    /// Container at the top level holding mid groups and sub commands
    TopGroup,
    /// Container below a top group holding sub commands only
    MidGroup,
    /// Leaf command below a group
    Sub,
}

impl ChatKind {
    /// Whether a command of kind `child` may be placed under this kind.
    #[must_use]
    pub const fn accepts(self, child: Self) -> bool {
        matches!(
            (self, child),
            (Self::TopGroup, Self::MidGroup | Self::Sub) | (Self::MidGroup, Self::Sub)
        )
    }

    /// Human readable description of the children this kind accepts.
    #[must_use]
    pub const fn expected_children(self) -> &'static str {
        match self {
            Self::TopGroup => "a mid group or sub command",
            Self::MidGroup => "a sub command",
            Self::Top | Self::Sub => "no children (leaf command)",
        }
    }

    /// Whether the kind may be registered directly in a catalog.
    #[must_use]
    pub const fn is_top_level(self) -> bool {
        matches!(self, Self::Top | Self::TopGroup)
    }

    /// Whether the kind carries a handler.
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::Top | Self::Sub)
    }

    const fn option_type(self) -> CommandOptionType {
        match self {
            Self::MidGroup | Self::TopGroup => CommandOptionType::SubCommandGroup,
            Self::Top | Self::Sub => CommandOptionType::SubCommand,
        }
    }
}

enum ChatBody {
    Leaf {
        options: Vec<CommandOption>,
        handler: Arc<ChatHandler>,
    },
    Group {
        children: BTreeMap<String, ChatCommand>,
    },
}

/// A chat input command at any level of a command tree.
pub struct ChatCommand {
    meta: CommandMeta,
    kind: ChatKind,
    body: ChatBody,
    remote_id: RemoteId,
}

impl fmt::Debug for ChatCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ChatCommand");
        debug.field("meta", &self.meta).field("kind", &self.kind);
        match &self.body {
            ChatBody::Leaf { options, .. } => debug.field("options", options),
            ChatBody::Group { children } => debug.field("children", &children.keys().collect::<Vec<_>>()),
        };
        debug.field("remote_id", &self.remote_id.get()).finish()
    }
}

impl ChatCommand {
    fn leaf(
        kind: ChatKind,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler<ChatInputEvent> + 'static,
    ) -> Self {
        Self {
            meta: CommandMeta::new(name, description),
            kind,
            body: ChatBody::Leaf {
                options: Vec::new(),
                handler: Arc::new(handler),
            },
            remote_id: RemoteId::default(),
        }
    }

    fn group(kind: ChatKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: CommandMeta::new(name, description),
            kind,
            body: ChatBody::Group {
                children: BTreeMap::new(),
            },
            remote_id: RemoteId::default(),
        }
    }

    /// A top level leaf command.
    pub fn top(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler<ChatInputEvent> + 'static,
    ) -> Self {
        Self::leaf(ChatKind::Top, name, description, handler)
    }

    /// A top level group.
    pub fn top_group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::group(ChatKind::TopGroup, name, description)
    }

    /// A group nested in a top group.
    pub fn mid_group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::group(ChatKind::MidGroup, name, description)
    }

    /// A leaf command nested in a group.
    pub fn sub(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler<ChatInputEvent> + 'static,
    ) -> Self {
        Self::leaf(ChatKind::Sub, name, description, handler)
    }

    /// Adds a child to a group.
    ///
    /// # Errors
    /// [`Error::InvalidCommandLocation`] when this kind does not accept the child's kind,
    /// [`Error::DuplicateCommand`] when a child with the same name exists.
    pub fn with_sub_command(mut self, child: Self) -> Result<Self> {
        if !self.kind.accepts(child.kind) {
            return Err(Error::InvalidCommandLocation {
                command: child.meta.name().to_string(),
                parent: self.meta.name().to_string(),
                expected: self.kind.expected_children(),
            });
        }
        if let ChatBody::Group { children } = &mut self.body {
            if children.contains_key(child.meta.name()) {
                return Err(Error::DuplicateCommand {
                    kind: CommandType::Chat,
                    name: format!("{} {}", self.meta.name(), child.meta.name()),
                });
            }
            children.insert(child.meta.name().to_string(), child);
        }
        Ok(self)
    }

    /// Adds an argument to a leaf command.
    ///
    /// # Errors
    /// [`Error::InvalidCommandLocation`] when called on a group, whose options are its
    /// children.
    pub fn with_option(mut self, option: CommandOption) -> Result<Self> {
        let ChatBody::Leaf { options, .. } = &mut self.body else {
            return Err(Error::InvalidCommandLocation {
                command: option.name,
                parent: self.meta.name().to_string(),
                expected: self.kind.expected_children(),
            });
        };
        options.push(option);
        Ok(self)
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
    ///
    /// # Errors
    /// [`Error::DisallowedDefaultPermission`] below the top level, where Discord ignores it.
    pub fn default_permission_false(mut self) -> Result<Self> {
        if !self.kind.is_top_level() {
            return Err(Error::DisallowedDefaultPermission {
                command: self.meta.name().to_string(),
            });
        }
        self.meta.set_default_permission_false();
        Ok(self)
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

    /// Position in the tree
    #[must_use]
    pub const fn kind(&self) -> ChatKind {
        self.kind
    }

    /// Arguments of a leaf command; empty for groups.
    #[must_use]
    pub fn options(&self) -> &[CommandOption] {
        match &self.body {
            ChatBody::Leaf { options, .. } => options,
            ChatBody::Group { .. } => &[],
        }
    }

    /// Handler of a leaf command.
    #[must_use]
    pub fn handler(&self) -> Option<&Arc<ChatHandler>> {
        match &self.body {
            ChatBody::Leaf { handler, .. } => Some(handler),
            ChatBody::Group { .. } => None,
        }
    }

    /// A direct child by exact name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        match &self.body {
            ChatBody::Group { children } => children.get(name),
            ChatBody::Leaf { .. } => None,
        }
    }

    /// Direct children, ordered by name.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        let children = match &self.body {
            ChatBody::Group { children } => Some(children.values()),
            ChatBody::Leaf { .. } => None,
        };
        children.into_iter().flatten()
    }

    /// The remote id assigned by reconciliation.
    #[must_use]
    pub fn remote_id(&self) -> Option<CommandId> {
        self.remote_id.get()
    }

    pub(crate) fn assign_remote_id(&self, id: CommandId) {
        self.remote_id.assign(id);
    }

    /// Looks up a command below this one by names, e.g. `["roles", "add"]`.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&Self> {
        path.iter()
            .try_fold(self, |command, name| command.child(name))
    }

    /// Every leaf in this tree with its full name path.
    #[must_use]
    pub fn leaves(&self) -> Vec<(Vec<&str>, &Self)> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut Vec::new(), &mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, path: &mut Vec<&'a str>, leaves: &mut Vec<(Vec<&'a str>, &'a Self)>) {
        path.push(self.name());
        match &self.body {
            ChatBody::Leaf { .. } => leaves.push((path.clone(), self)),
            ChatBody::Group { children } => {
                for child in children.values() {
                    child.collect_leaves(path, leaves);
                }
            }
        }
        path.pop();
    }

    /// Descends through sub command and group wrappers in an interaction's options.
    ///
    /// Returns the leaf command and the options supplied at that leaf, or `None` when
    /// the payload names a child this tree does not have.
    #[must_use]
    pub fn resolve<'a>(
        &'a self,
        options: &'a [InteractionOption],
    ) -> Option<(&'a Self, &'a [InteractionOption])> {
        match &self.body {
            ChatBody::Leaf { .. } => Some((self, options)),
            ChatBody::Group { children } => {
                let (name, nested) = options.iter().find_map(InteractionOption::as_branch)?;
                children.get(name)?.resolve(nested)
            }
        }
    }

    /// The shape registered with Discord for a top level command.
    #[must_use]
    pub fn as_request(&self) -> CommandRequest {
        let options: Vec<CommandOption> = match &self.body {
            ChatBody::Leaf { options, .. } => options.clone(),
            ChatBody::Group { children } => children.values().map(Self::as_option).collect(),
        };
        CommandRequest {
            kind: CommandType::Chat,
            name: self.meta.name().to_string(),
            description: self.meta.description().to_string(),
            default_permission: self.meta.requested_default_permission(),
            options: (!options.is_empty()).then_some(options),
        }
    }

    fn as_option(&self) -> CommandOption {
        let nested = match &self.body {
            ChatBody::Leaf { options, .. } => options.clone(),
            ChatBody::Group { children } => children.values().map(Self::as_option).collect(),
        };
        let mut option = CommandOption::new(self.kind.option_type(), self.meta.name(), self.meta.description());
        option.options = nested;
        option
    }
}
