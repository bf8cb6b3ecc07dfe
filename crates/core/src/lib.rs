//! Shared plumbing for the climate-atlas workspace: configuration
//! discovery and loading, plus a few filesystem helpers.

mod config;
pub mod fs;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::{create_dir_all, path_exists};

/// Application name used for XDG paths and config discovery.
pub const APP_NAME: &str = "climate-atlas";

/// File name the workspace's TOML configuration is searched under.
pub const CONFIG_FILENAME: &str = "atlas.toml";

/// Default location of the read-only climate database.
pub const DEFAULT_CLIMATE_DB: &str = "./climate_data.db";
