//! Bot settings loaded from `slashlib.toml`
//!
//! The file is optional; every key has a default except the application id, which can
//! also come from `DISCORD_APPLICATION_ID` or, failing both, from the gateway's ready
//! payload. The bot token is never part of the settings.

use crate::core::{AllowedCommands, StaticGuildCommandState};
use crate::errors::{Error, Result};
use poise::serenity_prelude::{ApplicationId, GuildId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Default settings file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "slashlib.toml";
/// Environment variable overriding the settings file path
pub const CONFIG_PATH_VAR: &str = "SLASHLIB_CONFIG";
/// Environment variable overriding the application id
pub const APPLICATION_ID_VAR: &str = "DISCORD_APPLICATION_ID";

fn default_log_filter() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

/// Guild entitlements as written in the settings file.
///
/// ```toml
/// [entitlements.default]
/// chat = ["ping"]
///
/// [entitlements.guilds."123456789012345678"]
/// chat = ["ping", "admin"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitlementsConfig {
    /// Allowed commands for guilds without an override
    #[serde(default)]
    pub default: AllowedCommands,
    /// Per-guild overrides keyed by guild id
    #[serde(default)]
    pub guilds: HashMap<String, AllowedCommands>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    application_id: Option<u64>,
    #[serde(default = "default_log_filter")]
    log_filter: String,
    #[serde(default)]
    guilds: Vec<u64>,
    #[serde(default = "default_true")]
    reconcile_on_ready: bool,
    #[serde(default)]
    entitlements: EntitlementsConfig,
}

/// Validated bot settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Application whose commands are reconciled, if known before connecting
    pub application_id: Option<ApplicationId>,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Guilds reconciled at startup
    pub guilds: Vec<GuildId>,
    /// Whether to reconcile when the gateway reports ready
    pub reconcile_on_ready: bool,
    /// Guild entitlements
    pub entitlements: StaticGuildCommandState,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application_id: None,
            log_filter: default_log_filter(),
            guilds: Vec::new(),
            reconcile_on_ready: true,
            entitlements: StaticGuildCommandState::default(),
        }
    }
}

fn parse_id(value: u64, what: &str) -> Result<u64> {
    if value == 0 {
        return Err(Error::Config {
            message: format!("{what} must not be 0"),
        });
    }
    Ok(value)
}

impl TryFrom<RawSettings> for Settings {
    type Error = Error;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let application_id = raw
            .application_id
            .map(|id| parse_id(id, "application_id").map(ApplicationId::new))
            .transpose()?;

        let guilds = raw
            .guilds
            .into_iter()
            .map(|id| parse_id(id, "guild id").map(GuildId::new))
            .collect::<Result<Vec<_>>>()?;

        let overrides = raw
            .entitlements
            .guilds
            .into_iter()
            .map(|(key, allowed)| {
                let id = key.parse::<u64>().map_err(|e| Error::Config {
                    message: format!("Invalid guild id `{key}` in entitlements: {e}"),
                })?;
                Ok((GuildId::new(parse_id(id, "guild id")?), allowed))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(Self {
            application_id,
            log_filter: raw.log_filter,
            guilds,
            reconcile_on_ready: raw.reconcile_on_ready,
            entitlements: StaticGuildCommandState::new(raw.entitlements.default, overrides),
        })
    }
}

impl Settings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    /// [`Error::Config`] for invalid TOML or ids.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawSettings = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {e}"),
        })?;
        Self::try_from(raw)
    }

    /// Reads settings from a file.
    ///
    /// # Errors
    /// [`Error::Config`] when the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading settings from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Applies environment overrides, looking variables up through `lookup`.
    ///
    /// # Errors
    /// [`Error::Config`] when `DISCORD_APPLICATION_ID` is not a valid id.
    pub fn apply_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(APPLICATION_ID_VAR) {
            let id = value.trim().parse::<u64>().map_err(|e| Error::Config {
                message: format!("Invalid {APPLICATION_ID_VAR} `{value}`: {e}"),
            })?;
            self.application_id = Some(ApplicationId::new(parse_id(id, APPLICATION_ID_VAR)?));
        }
        Ok(self)
    }

    /// Guild ids as a slice, for reconciliation
    #[must_use]
    pub fn guild_ids(&self) -> &[GuildId] {
        &self.guilds
    }
}

/// Loads settings the way the bot binary does.
///
/// The file named by `SLASHLIB_CONFIG` must exist; the default `slashlib.toml` may be
/// missing, in which case defaults are used. Environment overrides are applied last.
///
/// # Errors
/// [`Error::Config`] when a settings file or override is invalid.
pub fn load_settings() -> Result<Settings> {
    let settings = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) => Settings::from_file(path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Settings::from_file(DEFAULT_CONFIG_PATH)?,
        Err(_) => {
            info!("No {DEFAULT_CONFIG_PATH} found, using default settings");
            Settings::default()
        }
    };
    settings.apply_env_overrides(|name| std::env::var(name).ok())
}
