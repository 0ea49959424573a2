//! Metadata shared by chat, user and message commands.

use poise::serenity_prelude::Permissions;

/// The identity and gating attributes of a command.
///
/// Identity is the name together with the command type; the type lives on the
/// owning command so it can never disagree with the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMeta {
    name: String,
    description: String,
    default_permission: bool,
    bot_permissions: Permissions,
    user_permissions: Permissions,
    usable_in_dms: bool,
}

impl CommandMeta {
    /// Creates metadata with Discord's defaults: anyone may invoke it, no permissions
    /// are required and it cannot be used in DMs.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default_permission: true,
            bot_permissions: Permissions::empty(),
            user_permissions: Permissions::empty(),
            usable_in_dms: false,
        }
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command description, empty for context menu commands
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether any user may invoke the command unless a permission overlay says otherwise
    #[must_use]
    pub const fn default_permission(&self) -> bool {
        self.default_permission
    }

    /// Permissions the bot needs in the invoking channel
    #[must_use]
    pub const fn bot_permissions(&self) -> Permissions {
        self.bot_permissions
    }

    /// Permissions the invoking user needs in the invoking channel
    #[must_use]
    pub const fn user_permissions(&self) -> Permissions {
        self.user_permissions
    }

    /// Whether the command may run in a private channel
    #[must_use]
    pub const fn usable_in_dms(&self) -> bool {
        self.usable_in_dms
    }

    pub(crate) const fn set_default_permission_false(&mut self) {
        self.default_permission = false;
    }

    pub(crate) const fn set_bot_permissions(&mut self, permissions: Permissions) {
        self.bot_permissions = permissions;
    }

    pub(crate) const fn set_user_permissions(&mut self, permissions: Permissions) {
        self.user_permissions = permissions;
    }

    pub(crate) const fn set_usable_in_dms(&mut self) {
        self.usable_in_dms = true;
    }

    /// The value to put on the wire: only an explicit `false` is sent.
    pub(crate) const fn requested_default_permission(&self) -> Option<bool> {
        if self.default_permission {
            None
        } else {
            Some(false)
        }
    }
}
