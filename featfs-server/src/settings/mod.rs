//! Service settings
//!
//! Loaded once at startup from `$XDG_CONFIG_HOME/featfs/config.toml` or the
//! path given on the command line.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_SETTINGS_TOML;
pub use loader::SettingsLoader;
pub use schema::*;
