//! Configuration discovery and loading.
//!
//! A setting can come from four places, merged by the consumer in
//! priority order: CLI flag, environment variable, TOML file, built-in
//! default. This module owns the third step: locating the TOML file and
//! parsing it.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::APP_NAME;

/// Where the loaded configuration file came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Path given explicitly on the command line or through an env var.
    Explicit(PathBuf),
    /// Found in the working directory.
    CurrentDir(PathBuf),
    /// Found under the user's XDG config home.
    XdgConfig(PathBuf),
    /// Found under /etc.
    System(PathBuf),
    /// Nothing found; built-in defaults apply.
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ConfigSource::Explicit(p)
            | ConfigSource::CurrentDir(p)
            | ConfigSource::XdgConfig(p)
            | ConfigSource::System(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.path() {
            Some(p) => write!(f, "{}", p.display()),
            None => write!(f, "(defaults)"),
        }
    }
}

/// Locate a configuration file.
///
/// Checked in order: the path in `env_var`, `./{filename}`,
/// `$XDG_CONFIG_HOME/climate-atlas/{filename}` (falling back to
/// `~/.config`), `/etc/climate-atlas/{filename}`.
pub fn find_config_file(env_var: &str, filename: &str) -> ConfigSource {
    if let Ok(path) = env::var(env_var) {
        let explicit = PathBuf::from(path);
        if explicit.exists() {
            return ConfigSource::Explicit(explicit);
        }
    }

    let local = PathBuf::from(filename);
    if local.exists() {
        return ConfigSource::CurrentDir(local);
    }

    let xdg = xdg_config_home().join(APP_NAME).join(filename);
    if xdg.exists() {
        return ConfigSource::XdgConfig(xdg);
    }

    let system = PathBuf::from("/etc").join(APP_NAME).join(filename);
    if system.exists() {
        return ConfigSource::System(system);
    }

    ConfigSource::Defaults
}

fn xdg_config_home() -> PathBuf {
    if let Ok(explicit) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(explicit)
    } else if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".config")
    } else {
        PathBuf::from(".config")
    }
}

/// Parse the TOML file behind `source` into `T`.
///
/// `Defaults` yields `T::default()`; an unreadable or malformed file is
/// an error the caller decides how to handle.
pub fn load_config<T: DeserializeOwned + Default>(source: &ConfigSource) -> anyhow::Result<T> {
    match source.path() {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(T::default()),
    }
}
