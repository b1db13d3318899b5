//! User configuration loaded from `$XDG_CONFIG_HOME/issuemark/config.toml`.
//!
//! ```toml
//! theme = "dark"
//! api_base = "https://github.example.com/api/v3"
//! token = "ghp_…"
//! db_path = "/home/me/.cache/issuemark/cache.db"
//! ```
//!
//! Every key is optional. Command-line flags win over the file, and the
//! `GITHUB_TOKEN` environment variable wins over `token`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use issuemark_core::fetch::DEFAULT_API_BASE;
use serde::Deserialize;

const DEFAULT_THEME: &str = "catppuccin-mocha";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub theme: Option<String>,
    pub api_base: Option<String>,
    pub token: Option<String>,
    pub db_path: Option<PathBuf>,
}

/// Returns the path to the config file.
///
/// Prefers `$XDG_CONFIG_HOME/issuemark/config.toml`; falls back to
/// `~/.config/issuemark/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config").join("issuemark").join("config.toml")
}

/// `$XDG_DATA_HOME/issuemark/cache.db`, else `~/.local/share/issuemark/cache.db`.
pub fn default_db_path() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share").join("issuemark").join("cache.db")
}

fn xdg_dir(var: &str, home_fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(home_fallback))
        })
        .unwrap_or_else(|| PathBuf::from(home_fallback))
}

impl Config {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw).with_context(|| format!("config parse error in {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }

    /// Loads the user config. Errors are soft: printed to stderr (the
    /// terminal is not yet in raw mode) and replaced by the defaults.
    pub fn load() -> Self {
        let path = config_path();
        Self::read(&path).unwrap_or_else(|e| {
            eprintln!("issuemark: {e:#}; using defaults");
            Self::default()
        })
    }

    pub fn theme_name(&self, cli: Option<&str>) -> String {
        cli.or(self.theme.as_deref()).unwrap_or(DEFAULT_THEME).to_owned()
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// `env_token` is the value of `GITHUB_TOKEN`, if set.
    pub fn token(&self, env_token: Option<String>) -> Option<String> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn db_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.db_path.clone())
            .unwrap_or_else(default_db_path)
    }
}
