//! Config and log locations.
//!
//! Resolution order for the config file:
//! 1. An explicit `--config` path
//! 2. `config.yaml` in the working directory
//! 3. `config.yaml` next to the executable when a `.portable` marker is present
//! 4. The per-user data directory (`~/.local/share/MIDI Matrix` and equivalents)

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name used under the user data directory
const APP_NAME: &str = "MIDI Matrix";

const CONFIG_FILE: &str = "config.yaml";
const EXAMPLE_CONFIG_FILE: &str = "config.example.yaml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config: PathBuf,
    pub logs_dir: PathBuf,
    /// Whether the user data directory is in use
    pub is_installed: bool,
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl AppPaths {
    /// Resolve paths. Runs before logging is set up, so nothing is logged here.
    pub fn resolve(explicit_config: Option<&Path>) -> Self {
        if let Some(config) = explicit_config {
            let base = config
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Self {
                config: config.to_path_buf(),
                logs_dir: base.join("logs"),
                is_installed: false,
            };
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        if cwd.join(CONFIG_FILE).exists() {
            return Self::in_dir(&cwd, false);
        }

        let exe_dir = exe_dir();
        if exe_dir.join(".portable").exists() {
            return Self::in_dir(&exe_dir, false);
        }

        let app_data = dirs::data_dir().unwrap_or(exe_dir).join(APP_NAME);
        Self::in_dir(&app_data, true)
    }

    fn in_dir(dir: &Path, is_installed: bool) -> Self {
        Self {
            config: dir.join(CONFIG_FILE),
            logs_dir: dir.join("logs"),
            is_installed,
        }
    }

    pub fn config_str(&self) -> String {
        self.config.to_string_lossy().into_owned()
    }

    /// Create the log directory and, for installed mode, seed the config file
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir).with_context(|| {
                format!("Failed to create logs directory {}", self.logs_dir.display())
            })?;
        }

        if self.is_installed && !self.config.exists() {
            if let Some(parent) = self.config.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.copy_example_config()?;
        }

        Ok(())
    }

    /// Seed the config from an example shipped next to the executable or in the cwd
    fn copy_example_config(&self) -> anyhow::Result<()> {
        let candidates = [
            exe_dir().join(EXAMPLE_CONFIG_FILE),
            PathBuf::from(EXAMPLE_CONFIG_FILE),
        ];

        match candidates.iter().find(|p| p.exists()) {
            Some(example) => {
                info!("Copying {} to {}", example.display(), self.config.display());
                std::fs::copy(example, &self.config).with_context(|| {
                    format!(
                        "Failed to copy example config from {} to {}",
                        example.display(),
                        self.config.display()
                    )
                })?;
            }
            None => info!("No config found, please create {}", self.config.display()),
        }
        Ok(())
    }
}
