//! Configuration management for the MIDI matrix router
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::fs;

use crate::input::button::{DEFAULT_DEBOUNCE_MS, DEFAULT_LONG_PRESS_MS};
use crate::input::encoder::{DEFAULT_STEP_THRESHOLD, MAX_STEP_THRESHOLD};

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    pub ports: PortsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub panel: PanelConfig,
    /// Polling cycle period in microseconds
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
}

/// MIDI port layout; list order defines matrix rows and columns
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PortsConfig {
    pub inputs: Vec<InputConfig>,
    pub outputs: Vec<OutputConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<OutputConfig>,
}

/// How an input delivers MIDI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Raw byte stream with running status, decoded by the router
    #[default]
    Bytes,
    /// Raw byte stream forwarded unparsed, SysEx and system common included
    Passthrough,
    /// Transport delivering already-framed messages
    Messages,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InputConfig {
    /// Display label
    pub name: String,
    /// Substring matched against the system port name
    pub port: String,
    #[serde(default)]
    pub kind: InputKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    pub name: String,
    pub port: String,
}

/// OSC remote control
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_bind")]
    pub bind: String,
    /// Every received datagram is relayed here when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<String>,
}

impl RemoteConfig {
    pub fn forward_addr(&self) -> Result<Option<SocketAddr>> {
        self.forward_to
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>()
                    .with_context(|| format!("Invalid remote.forward_to address: {}", addr))
            })
            .transpose()
    }
}

/// Front-panel tunables, applied live on reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PanelConfig {
    #[serde(default = "default_encoder_threshold")]
    pub encoder_threshold: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            encoder_threshold: default_encoder_threshold(),
            debounce_ms: default_debounce_ms(),
            long_press_ms: default_long_press_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.ports.inputs.is_empty() {
            anyhow::bail!("At least one input port must be defined");
        }
        if self.ports.outputs.is_empty() {
            anyhow::bail!("At least one output port must be defined");
        }

        for (idx, input) in self.ports.inputs.iter().enumerate() {
            if input.name.is_empty() {
                anyhow::bail!("Input {} name cannot be empty", idx);
            }
            if input.port.is_empty() {
                anyhow::bail!("Input '{}' port pattern cannot be empty", input.name);
            }
        }

        let columns = self.ports.outputs.iter().map(|o| ("Output", o));
        let mirrors = self.ports.mirrors.iter().map(|o| ("Mirror", o));
        for (idx, (what, output)) in columns.chain(mirrors).enumerate() {
            if output.name.is_empty() {
                anyhow::bail!("{} {} name cannot be empty", what, idx);
            }
            if output.port.is_empty() {
                anyhow::bail!("{} '{}' port pattern cannot be empty", what, output.name);
            }
        }

        if let Some(remote) = &self.remote {
            if remote.bind.is_empty() {
                anyhow::bail!("remote.bind cannot be empty");
            }
            remote.forward_addr()?;
        }

        if !(1..=MAX_STEP_THRESHOLD).contains(&self.panel.encoder_threshold) {
            anyhow::bail!(
                "panel.encoder_threshold ({}) must be between 1 and {}",
                self.panel.encoder_threshold,
                MAX_STEP_THRESHOLD
            );
        }
        if self.panel.long_press_ms <= self.panel.debounce_ms {
            anyhow::bail!(
                "panel.long_press_ms ({}) must be greater than panel.debounce_ms ({})",
                self.panel.long_press_ms,
                self.panel.debounce_ms
            );
        }

        if self.poll_interval_us == 0 {
            anyhow::bail!("poll_interval_us must be greater than 0");
        }

        Ok(())
    }

    /// Whether moving from `self` to `new` needs the ports or sockets reopened
    pub fn requires_restart(&self, new: &AppConfig) -> bool {
        self.ports != new.ports
            || self.remote != new.remote
            || self.poll_interval_us != new.poll_interval_us
    }

    pub fn input_labels(&self) -> Vec<String> {
        self.ports.inputs.iter().map(|i| i.name.clone()).collect()
    }

    pub fn output_labels(&self) -> Vec<String> {
        self.ports.outputs.iter().map(|o| o.name.clone()).collect()
    }
}

// Default value functions
fn default_poll_interval_us() -> u64 { 500 }
fn default_remote_bind() -> String { "0.0.0.0:8000".to_string() }
fn default_encoder_threshold() -> u32 { DEFAULT_STEP_THRESHOLD }
fn default_debounce_ms() -> u64 { DEFAULT_DEBOUNCE_MS }
fn default_long_press_ms() -> u64 { DEFAULT_LONG_PRESS_MS }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
ports:
  inputs:
    - { name: "In1", port: "DIN 1" }
    - { name: "BLE", port: "Bluetooth", kind: messages }
    - { name: "Thru", port: "DIN 2", kind: passthrough }
  outputs:
    - { name: "Out1", port: "DIN 1" }
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.ports.inputs.len(), 3);
        assert_eq!(config.ports.inputs[0].kind, InputKind::Bytes);
        assert_eq!(config.ports.inputs[1].kind, InputKind::Messages);
        assert_eq!(config.ports.inputs[2].kind, InputKind::Passthrough);
        assert!(config.ports.mirrors.is_empty());
        assert!(config.remote.is_none());
        assert_eq!(config.panel, PanelConfig::default());
        assert_eq!(config.panel.encoder_threshold, 4);
        assert_eq!(config.poll_interval_us, 500);
        assert_eq!(config.input_labels(), vec!["In1", "BLE", "Thru"]);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
ports:
  inputs:
    - { name: "In1", port: "DIN 1" }
  outputs:
    - { name: "Out1", port: "DIN 1" }
  mirrors:
    - { name: "USB", port: "Gadget" }
remote:
  bind: "127.0.0.1:9001"
  forward_to: "192.168.4.2:9000"
panel:
  encoder_threshold: 2
  debounce_ms: 10
  long_press_ms: 400
poll_interval_us: 250
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        let remote = config.remote.as_ref().unwrap();
        assert_eq!(remote.bind, "127.0.0.1:9001");
        assert_eq!(
            remote.forward_addr().unwrap(),
            Some("192.168.4.2:9000".parse().unwrap())
        );
        assert_eq!(config.ports.mirrors[0].port, "Gadget");
        assert_eq!(config.panel.long_press_ms, 400);
        assert_eq!(config.poll_interval_us, 250);
    }

    #[test]
    fn test_validation_failures() {
        let no_outputs = "ports:\n  inputs:\n    - { name: a, port: b }\n  outputs: []\n";
        assert!(AppConfig::from_yaml(no_outputs).is_err());

        let empty_port = "ports:\n  inputs:\n    - { name: a, port: '' }\n  outputs:\n    - { name: c, port: d }\n";
        assert!(AppConfig::from_yaml(empty_port).is_err());

        let bad_panel = format!("{}panel:\n  encoder_threshold: 0\n", MINIMAL);
        assert!(AppConfig::from_yaml(&bad_panel).is_err());

        let huge_threshold = format!("{}panel:\n  encoder_threshold: 3000000000\n", MINIMAL);
        let err = AppConfig::from_yaml(&huge_threshold).unwrap_err();
        assert!(err.to_string().contains("encoder_threshold"));

        let max_threshold = format!("{}panel:\n  encoder_threshold: 64\n", MINIMAL);
        assert!(AppConfig::from_yaml(&max_threshold).is_ok());

        let inverted = format!("{}panel:\n  debounce_ms: 50\n  long_press_ms: 50\n", MINIMAL);
        let err = AppConfig::from_yaml(&inverted).unwrap_err();
        assert!(err.to_string().contains("long_press_ms"));

        let bad_forward = format!("{}remote:\n  forward_to: \"not an address\"\n", MINIMAL);
        assert!(AppConfig::from_yaml(&bad_forward).is_err());
    }

    #[test]
    fn test_requires_restart() {
        let base = AppConfig::from_yaml(MINIMAL).unwrap();

        let mut panel_only = base.clone();
        panel_only.panel.encoder_threshold = 8;
        assert!(!base.requires_restart(&panel_only));

        let mut new_port = base.clone();
        new_port.ports.outputs[0].port = "DIN 2".to_string();
        assert!(base.requires_restart(&new_port));

        let mut with_remote = base.clone();
        with_remote.remote = Some(RemoteConfig {
            bind: default_remote_bind(),
            forward_to: None,
        });
        assert!(base.requires_restart(&with_remote));
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        let path = path.to_string_lossy().to_string();

        let config = AppConfig::from_yaml(MINIMAL)?;
        config.save(&path).await?;
        let loaded = AppConfig::load(&path).await?;

        assert_eq!(loaded, config);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/midi-matrix.yaml").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
