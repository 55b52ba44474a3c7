use std::{fs::read_to_string, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use colored::Colorize;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Global configuration values
///
/// Metronome's configuration is stored in a TOML file in the current user's
/// config directory, which is `~/.config/metronome/config.toml` by default.
///
/// A config can be loaded from a file with [`Config::load`].
/// You can also use [`Config::init`] or [`Config::init_default`] to create
/// a default config file if one does not exist at the given path.
///
/// To save a config to the filesystem, use [`Config::save`].
///
/// ## File Format
///
/// The configuration file is written as a TOML file.
/// See the documentation for each field to learn how they are serialized.
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Directory to find hook executables
    ///
    /// Default is a directory called `hooks` inside the config directory.
    /// Serialized as an absolute path.
    #[serde(default = "default_hooks_directory")]
    pub hooks_directory: PathBuf,
    /// Default wait for `metronome timeout`
    ///
    /// Default is 5 minutes (300000 milliseconds).
    /// Serialized as an integer count of milliseconds.
    #[serde(default = "default_timeout_duration", with = "crate::time::duration::milliseconds")]
    pub timeout_duration: TimeDelta,
    /// Default period for `metronome interval`
    ///
    /// Default is 1 second (1000 milliseconds).
    /// Serialized as an integer count of milliseconds.
    #[serde(default = "default_interval_duration", with = "crate::time::duration::milliseconds")]
    pub interval_duration: TimeDelta,
    /// Default length of `metronome countdown`
    ///
    /// Default is 25 minutes (1500 seconds).
    /// Serialized as an integer count of seconds.
    #[serde(default = "default_countdown_duration", with = "crate::time::duration::seconds")]
    pub countdown_duration: TimeDelta,
    /// Fire the first interval tick immediately instead of after one period
    ///
    /// Default is `false`.
    #[serde(default)]
    pub skip_first_interval: bool,
}

impl Config {
    /// Returns the current config, creating a default config file if one does not exist
    pub fn init(config_path: &Path) -> Result<Self> {
        if let Some(conf) = Config::load(config_path)? {
            Ok(conf)
        } else {
            let conf = Config::default();

            println!(
                "Creating config file at {}",
                config_path.display().to_string().cyan()
            );

            conf.save(config_path)?;

            Ok(conf)
        }
    }

    /// Returns the current config from the default location, and creates the file if one does not exist
    pub fn init_default() -> Result<Self> {
        let path = default_config_path()?;
        Self::init(&path)
    }

    /// Reads a TOML config file
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            let config_str = read_to_string(path)
                .with_context(|| format!("Unable to read config file {}", path.display()))?;

            toml::from_str(&config_str).with_context(|| "Failed to parse config from TOML")
        } else {
            Ok(None)
        }
    }

    /// Write this config file to the filesystem
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string(&self)
            .with_context(|| "Unable to format config as TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create config directory {}", parent.display()))?;
        }

        std::fs::write(path, toml)
            .with_context(|| format!("Unable to write config TOML to path {}", path.display()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hooks_directory: default_hooks_directory(),
            timeout_duration: default_timeout_duration(),
            interval_duration: default_interval_duration(),
            countdown_duration: default_countdown_duration(),
            skip_first_interval: false,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "Metronome", "Metronome")
}

/// Get the default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    let conf_path = project_dirs()
        .with_context(|| "Unable to determine XDG directories")?
        .config_dir()
        .join("config.toml");

    Ok(conf_path)
}

fn default_hooks_directory() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("hooks"))
        .unwrap_or_else(|| PathBuf::from("hooks"))
}

fn default_timeout_duration() -> TimeDelta {
    TimeDelta::minutes(5)
}

fn default_interval_duration() -> TimeDelta {
    TimeDelta::seconds(1)
}

fn default_countdown_duration() -> TimeDelta {
    TimeDelta::minutes(25)
}
