use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LuasealError, LuasealResult};

/// Default environment variable carrying the hex master key
pub const DEFAULT_MASTER_KEY_ENV: &str = "LUASEAL_MASTER_KEY";

/// Top-level configuration (loaded from luaseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LuasealConfig {
    pub key: KeyConfig,
    pub seal: SealConfig,
    pub log: LogConfig,
}

/// Where the master key comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// File holding the hex-encoded master key
    pub master_key_file: Option<PathBuf>,
    /// Environment variable holding the hex-encoded master key
    pub master_key_env: String,
}

/// Batch packaging behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    /// Extension of plaintext scripts picked up from directories (default: lua)
    pub script_extension: String,
    /// Extension given to sealed blobs (default: luata)
    pub sealed_extension: String,
    /// Glob patterns matched against file and directory names to skip
    pub exclude_patterns: Vec<String>,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Replace existing output files
    pub overwrite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            master_key_file: None,
            master_key_env: DEFAULT_MASTER_KEY_ENV.into(),
        }
    }
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            script_extension: "lua".into(),
            sealed_extension: "luata".into(),
            exclude_patterns: Vec::new(),
            recursive: true,
            overwrite: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl LuasealConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> LuasealResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| LuasealError::Config(format!("parsing {}: {e}", path.display())))
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}
