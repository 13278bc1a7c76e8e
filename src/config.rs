use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::cli::CliArgs;
use crate::fetch::DEFAULT_LIMIT;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Config {
    pub version: u32,
    /// GitHub login whose activity is shown by default.
    #[serde(default)]
    pub username: String,
    /// Optional bearer token for higher rate limits; required for the
    /// contribution calendar. Explicit values (--token or this field) win
    /// over env vars (see resolve_token).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub ui: UiConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct UiConfig {
    pub group_by_day: bool,
    pub show_details: bool,
    pub limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            username: String::new(),
            token: None,
            ui: UiConfig::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            group_by_day: true,
            show_details: true,
            limit: DEFAULT_LIMIT,
        }
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "ghgrip").context("Failed to determine project directories")?;

    let config_dir = proj_dirs.config_dir();
    Ok(config_dir.join("ghgrip.toml"))
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p,
            None => get_default_config_path()?,
        };

        if !path.exists() {
            let default_config = Config::default();
            // Create directory if it doesn't exist
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            default_config.save(&path)?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn from_cli_and_file(cli_args: &CliArgs, config_path: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        // CLI args override config file
        if let Some(username) = &cli_args.username {
            config.username = username.clone();
        }
        if let Some(limit) = cli_args.limit {
            config.ui.limit = limit;
        }
        if cli_args.flat {
            config.ui.group_by_day = false;
        }
        if let Some(token) = &cli_args.token {
            config.token = Some(token.clone());
        }

        Ok(config)
    }

    /// Token precedence: the config value (already overridden by --token if
    /// given), then GHGRIP_TOKEN, then GITHUB_TOKEN.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GHGRIP_TOKEN").ok().filter(|t| !t.is_empty()))
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
    }
}
