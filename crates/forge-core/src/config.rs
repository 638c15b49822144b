//! Configuration management for forge
//!
//! Settings live in `forge.toml` in the directory the server is started from.
//! Every section and field is optional; missing values fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{ForgeError, Result, DEFAULT_RECURSION_LIMIT};

/// File name looked up by [`ForgeConfig::load_or_default`]
pub const CONFIG_FILE: &str = "forge.toml";

/// Top-level forge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub workspace: WorkspaceSettings,

    #[serde(default)]
    pub sandbox: SandboxSettings,

    #[serde(default)]
    pub jobs: JobSettings,

    #[serde(default)]
    pub agent: AgentSettings,
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Where workspaces are created on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Directory that holds every workspace
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Job `X` lives in `<base_dir>/<dir_prefix>_X`, the default workspace in
    /// `<base_dir>/<dir_prefix>`
    #[serde(default = "default_dir_prefix")]
    pub dir_prefix: String,
}

/// Command sandbox settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSettings {
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

/// Job orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default = "default_recursion_limit")]
    pub default_recursion_limit: u32,

    /// Pause between the synthetic pre-flight stage events
    #[serde(default)]
    pub preflight_delay_ms: u64,
}

/// Agent selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    /// argv of an external agent process; empty selects the built-in agent
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_dir_prefix() -> String {
    "generated_project".to_string()
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_recursion_limit() -> u32 {
    DEFAULT_RECURSION_LIMIT
}

impl ForgeConfig {
    /// Load configuration from `<dir>/forge.toml` or use defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ForgeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write the default configuration to `<dir>/forge.toml`
    pub fn write_default(dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let config_path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| ForgeError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl SandboxSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl JobSettings {
    pub fn preflight_delay(&self) -> Duration {
        Duration::from_millis(self.preflight_delay_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            dir_prefix: default_dir_prefix(),
        }
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            default_recursion_limit: default_recursion_limit(),
            preflight_delay_ms: 0,
        }
    }
}
