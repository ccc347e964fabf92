//! Configuration module.
//!
//! Handles loading, validating, and merging `postsmith.toml`. Stock defaults
//! are the base layer; the user file is merged on top, so it only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! channel = ""                  # Title fallback for posts without one
//!
//! [repository]
//! path = "site"                 # Working tree of the Zola site
//! posts_dir = "content/posts"   # Posts directory, relative to `path`
//! remote = "origin"             # Remote pushed to and pulled from
//! branch = "main"               # Branch committed to
//! # url = "https://github.com/me/blog.git"   # Clone source for `sync`
//!
//! [author]
//! name = "postsmith"
//! email = "postsmith@localhost"
//! ```
//!
//! Unknown keys are rejected to catch typos early. The push token is never
//! read from this file; it comes from `POSTSMITH_GIT_TOKEN`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "postsmith.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `postsmith.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostsmithConfig {
    /// Title fallback, usually the channel handle (`@mychannel`).
    pub channel: String,
    pub repository: RepositoryConfig,
    pub author: AuthorConfig,
}

impl PostsmithConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let posts_dir = Path::new(&self.repository.posts_dir);
        if self.repository.posts_dir.is_empty() {
            return Err(ConfigError::Validation(
                "repository.posts_dir must not be empty".into(),
            ));
        }
        if posts_dir.is_absolute() {
            return Err(ConfigError::Validation(
                "repository.posts_dir must be relative to repository.path".into(),
            ));
        }
        if posts_dir.components().any(|c| c == Component::ParentDir) {
            return Err(ConfigError::Validation(
                "repository.posts_dir must stay inside the repository".into(),
            ));
        }
        if self.repository.remote.is_empty() {
            return Err(ConfigError::Validation(
                "repository.remote must not be empty".into(),
            ));
        }
        if self.repository.branch.is_empty() {
            return Err(ConfigError::Validation(
                "repository.branch must not be empty".into(),
            ));
        }
        if self.author.name.is_empty() || self.author.email.is_empty() {
            return Err(ConfigError::Validation(
                "author.name and author.email must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Where the site lives and how it is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    pub path: PathBuf,
    pub posts_dir: String,
    pub remote: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("site"),
            posts_dir: "content/posts".into(),
            remote: "origin".into(),
            branch: "main".into(),
            url: None,
        }
    }
}

/// Commit identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            name: "postsmith".into(),
            email: "postsmith@localhost".into(),
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PostsmithConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PostsmithConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PostsmithConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, falling back to stock defaults when it is
/// missing.
pub fn load_config(path: &Path) -> Result<PostsmithConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `postsmith.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# postsmith configuration
# =======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Title given to posts that carry no title of their own. A trailing
# address in the message (0x...) is appended as "<channel> [0x...]".
channel = ""

# ---------------------------------------------------------------------------
# Repository
# ---------------------------------------------------------------------------
[repository]
# Working tree of the Zola site. `sync` clones into it when missing.
path = "site"

# Where posts are written, relative to `path`.
posts_dir = "content/posts"

# Remote and branch that commits are pushed to.
remote = "origin"
branch = "main"

# Clone source used by `sync`. Authentication uses the token in
# POSTSMITH_GIT_TOKEN; it is never read from this file.
# url = "https://github.com/me/blog.git"

# ---------------------------------------------------------------------------
# Commit author
# ---------------------------------------------------------------------------
[author]
name = "postsmith"
email = "postsmith@localhost"
"##
}
