/// Bot settings loaded from TOML and the environment
pub mod settings;

pub use settings::{EntitlementsConfig, Settings, load_settings};
