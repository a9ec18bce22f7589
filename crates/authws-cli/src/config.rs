//! CLI configuration.

use std::path::{Path, PathBuf};

use authws_federation::WsConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Local directory file.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Webservice provider configuration.
    pub ws: Option<WsConfig>,
}

/// Default directory file.
fn default_directory() -> PathBuf {
    dirs_next::home_dir().map_or_else(
        || PathBuf::from("authws-directory.json"),
        |home| home.join(".authws").join("directory.json"),
    )
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            output_format: OutputFormat::default(),
            ws: None,
        }
    }
}

impl CliConfig {
    /// Loads configuration from the default file.
    pub fn load() -> crate::CliResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads configuration from a file, or the defaults if it does not exist.
    pub fn load_from(path: &Path) -> crate::CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::CliError::Config(format!("failed to parse config: {e}")))?;
        if let Some(ws) = &config.ws {
            ws.validate()?;
        }
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save_to(&self, path: &Path) -> crate::CliResult<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::CliError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Gets the default configuration file path.
    pub fn config_path() -> crate::CliResult<PathBuf> {
        let home = dirs_next::home_dir().ok_or_else(|| {
            crate::CliError::Config("could not determine home directory".to_string())
        })?;
        Ok(home.join(".authws").join("authws.toml"))
    }

    /// Returns the provider configuration, failing if none is set.
    pub fn ws(&self) -> crate::CliResult<&WsConfig> {
        self.ws.as_ref().ok_or_else(|| {
            crate::CliError::Config("no [ws] section, run `authws config init`".to_string())
        })
    }

    /// Gets the effective directory file (from args or config).
    #[must_use]
    pub fn effective_directory(&self, arg_directory: Option<&Path>) -> PathBuf {
        arg_directory.map_or_else(|| self.directory.clone(), Path::to_path_buf)
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
    /// Quiet (minimal output).
    Quiet,
}
