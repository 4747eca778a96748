// file: src/config/state.rs
// version: 1.0.0
// guid: b5f1d8a3-2e6c-4079-8c4b-93a7e0d2f615

//! Persisted install state
//!
//! The final install-config is written once, alongside a generated cluster
//! id and a timestamp. The file format follows the extension: `.json` is
//! JSON, anything else is YAML.

use crate::error::InstallError;
use crate::types::InstallConfig;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Current state file layout version
pub const STATE_FILE_VERSION: u32 = 1;

/// On-disk encoding of a state file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    Yaml,
    Json,
}

impl StateFormat {
    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => StateFormat::Json,
            _ => StateFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFile {
    pub version: u32,
    pub cluster_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub install_config: InstallConfig,
}

impl StateFile {
    /// Wrap a finished install-config with a fresh cluster id
    pub fn new(install_config: InstallConfig) -> Self {
        Self {
            version: STATE_FILE_VERSION,
            cluster_id: Uuid::new_v4(),
            created_at: Utc::now(),
            install_config,
        }
    }

    pub fn to_string_as(&self, format: StateFormat) -> Result<String> {
        Ok(match format {
            StateFormat::Json => serde_json::to_string_pretty(self)?,
            StateFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    pub fn from_str_as(content: &str, format: StateFormat) -> Result<Self> {
        let state: StateFile = match format {
            StateFormat::Json => serde_json::from_str(content)?,
            StateFormat::Yaml => serde_yaml::from_str(content)?,
        };
        if state.version > STATE_FILE_VERSION {
            return Err(InstallError::config(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_FILE_VERSION
            )));
        }
        Ok(state)
    }

    /// Write the state file, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = self.to_string_as(StateFormat::from_path(path))?;
        fs::write(path, content)?;
        info!(
            "Wrote state for cluster {} ({}) to {}",
            self.install_config.metadata.name,
            self.cluster_id,
            path.display()
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            InstallError::config(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str_as(&content, StateFormat::from_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::defaults::set_install_config_defaults;
    use crate::types::platform::NonePlatform;
    use crate::types::Platform;
    use tempfile::TempDir;

    fn state() -> StateFile {
        let mut config = InstallConfig::new("c1", "example.com", Platform::None(NonePlatform {}));
        set_install_config_defaults(&mut config);
        StateFile::new(config)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(StateFormat::from_path(Path::new("a/state.json")), StateFormat::Json);
        assert_eq!(StateFormat::from_path(Path::new("a/state.JSON")), StateFormat::Json);
        assert_eq!(StateFormat::from_path(Path::new("a/state.yaml")), StateFormat::Yaml);
        assert_eq!(StateFormat::from_path(Path::new("state")), StateFormat::Yaml);
    }

    #[test]
    fn test_save_and_load_both_formats() -> Result<()> {
        // Arrange
        let dir = TempDir::new()?;
        let original = state();

        for name in ["nested/state.json", "state.yaml"] {
            let path = dir.path().join(name);

            // Act
            original.save(&path)?;
            let loaded = StateFile::load(&path)?;

            // Assert
            assert_eq!(loaded, original);
        }
        Ok(())
    }

    #[test]
    fn test_json_uses_camel_case_keys() -> Result<()> {
        let json = state().to_string_as(StateFormat::Json)?;
        assert!(json.contains("\"clusterId\""));
        assert!(json.contains("\"installConfig\""));
        assert!(json.contains("\"machineNetwork\""));
        Ok(())
    }

    #[test]
    fn test_newer_version_rejected() -> Result<()> {
        let mut s = state();
        s.version = STATE_FILE_VERSION + 1;
        let yaml = s.to_string_as(StateFormat::Yaml)?;

        let err = StateFile::from_str_as(&yaml, StateFormat::Yaml).unwrap_err();

        assert!(err.to_string().contains("newer than supported"));
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        assert!(StateFile::load("/nonexistent/state.yaml").is_err());
    }
}
