use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =============================================================================
// Registry / network constants
// =============================================================================

/// Hostname assumed for `namespace/name/target` registry addresses
pub const DEFAULT_REGISTRY_HOST: &str = "registry.terraform.io";

/// User agent sent with every registry request
pub const USER_AGENT: &str = "tf-module-versions";

/// Timeout for a single module's version fetch in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Environment variable holding a token for HTTPS git remotes
pub const DEFAULT_GIT_TOKEN_ENV: &str = "GITHUB_TOKEN";

// =============================================================================
// Scan / check constants
// =============================================================================

/// Maximum nesting of local module references followed by a recursive scan
pub const MAX_SCAN_DEPTH: usize = 10;

/// Number of modules checked concurrently
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration file structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub registry: RegistryConfig,
    pub git: GitConfig,
    pub check: CheckConfig,
}

/// Module registry client configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Extra HTTP headers attached to every registry request
    pub headers: HashMap<String, String>,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

/// Git remote configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GitConfig {
    /// Name of the environment variable holding an HTTPS token
    pub token_env: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            token_env: DEFAULT_GIT_TOKEN_ENV.to_string(),
        }
    }
}

impl GitConfig {
    /// Reads the token from the configured environment variable, if set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

/// Update check behaviour
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CheckConfig {
    pub include_prerelease: bool,
    pub concurrency: usize,
    pub recursive: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            include_prerelease: false,
            concurrency: DEFAULT_CONCURRENCY,
            recursive: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    /// Loads a JSON config file; missing fields fall back to defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parses a `Name: value` header assignment as given on the command line.
pub fn parse_header(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim_start().to_string()))
}

/// Returns the path to the data directory for tf-module-versions.
/// Uses $XDG_DATA_HOME/tf-module-versions if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/tf-module-versions,
/// or ./tf-module-versions if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path of the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("tf-module-versions.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("tf-module-versions")
}
