use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::batch::DEFAULT_WORKERS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub apple: AppleConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where `.lrc` files are written.
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppleConfig {
    /// Catalog storefront (country code).
    pub storefront: String,
    /// Developer JWT. Scraped from the web player when unset.
    pub developer_token: Option<String>,
    /// `media-user-token` from the web player's local storage.
    pub media_user_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Tracks processed at the same time.
    pub workers: usize,
    /// Results shown when searching.
    pub search_limit: usize,
    pub charts_limit: usize,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let output_dir = project_dirs()
            .map(|p| p.data_dir().join("lyrics"))
            .unwrap_or_else(|| PathBuf::from("lyrics"));
        Self { output_dir }
    }
}

impl Default for AppleConfig {
    fn default() -> Self {
        Self {
            storefront: "us".to_string(),
            developer_token: None,
            media_user_token: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            search_limit: 5,
            charts_limit: 100,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "lrcfetch", "lrcfetch")
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = project_dirs().context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

fn resolve_path(override_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match override_path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path(),
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = resolve_path(override_path)?;
    write_config(cfg, &path)
}

/// Load the config file, writing the defaults on first run.
pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = resolve_path(override_path)?;

    if !path.exists() {
        let cfg = Config::default();
        write_config(&cfg, &path)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_config(cfg: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    // The file holds the media-user-token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
