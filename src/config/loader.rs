// file: src/config/loader.rs
// version: 1.1.0
// guid: 8e2c5a19-4f70-4b3d-96a1-0d7f3b6e2c84

//! Install-config file loading and environment variable substitution

use crate::error::InstallError;
use crate::logging::with_operation_span;
use crate::types::conversion::convert_install_config;
use crate::types::defaults::set_install_config_defaults;
use crate::types::validation::validate_install_config;
use crate::types::InstallConfig;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// How far through the load pipeline a config is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    /// Parsed as written
    Raw,
    /// Deprecated fields carried forward
    Converted,
    /// Unset fields filled in
    Defaulted,
    /// Checked; any problem is an error
    Validated,
}

/// Install-config loader with environment variable substitution
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new config loader seeded from the process environment
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Load an install-config and run it through the whole pipeline
    pub fn load_install_config<P: AsRef<Path>>(&self, path: P) -> Result<InstallConfig> {
        self.load_until(path, LoadStage::Validated)
    }

    /// Load an install-config and stop after `stage`
    pub fn load_until<P: AsRef<Path>>(&self, path: P, stage: LoadStage) -> Result<InstallConfig> {
        let content = fs::read_to_string(&path).map_err(|e| {
            InstallError::config(format!(
                "Failed to read install-config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        debug!("Loaded install-config from {}", path.as_ref().display());
        self.parse_until(&content, stage)
    }

    /// Parse install-config YAML and stop after `stage`
    pub fn parse_until(&self, content: &str, stage: LoadStage) -> Result<InstallConfig> {
        let expanded = self.expand_env_vars(content)?;
        let mut config: InstallConfig = serde_yaml::from_str(&expanded)?;

        if stage >= LoadStage::Converted {
            with_operation_span("convert", || convert_install_config(&mut config))?;
        }
        if stage >= LoadStage::Defaulted {
            with_operation_span("defaults", || set_install_config_defaults(&mut config));
        }
        if stage >= LoadStage::Validated {
            with_operation_span("validate", || validate_install_config(&config).into_result())?;
            info!("Install-config for cluster {} is valid", config.metadata.name);
        }
        Ok(config)
    }

    /// Expand `${VAR}` placeholders; every missing variable is reported at once.
    ///
    /// Values are escaped for where the placeholder sits: inside `"..."` or
    /// `'...'` they are escaped for that quoting style, and a placeholder that
    /// is the whole value of a key or list item is double-quoted when the
    /// value would otherwise change the YAML structure. A placeholder embedded
    /// in a longer unquoted scalar, such as `http://${HOST}:8080`, is pasted
    /// as-is.
    pub fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| InstallError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut missing_vars: Vec<String> = Vec::new();
        let mut result = String::with_capacity(content.len());
        let mut last = 0;
        for caps in re.captures_iter(content) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            result.push_str(&content[last..whole.start()]);
            match self.env_vars.get(name.as_str()) {
                Some(value) => {
                    let context = placeholder_context(content, whole.start(), whole.end());
                    result.push_str(&yaml_escape(value, context)?);
                }
                None => {
                    if !missing_vars.iter().any(|m| m == name.as_str()) {
                        missing_vars.push(name.as_str().to_string());
                    }
                    result.push_str(whole.as_str());
                }
            }
            last = whole.end();
        }
        result.push_str(&content[last..]);

        if !missing_vars.is_empty() {
            return Err(InstallError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result)
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(key.into(), value.into());
    }
}

/// Where a `${VAR}` placeholder sits in the YAML text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaceholderContext {
    DoubleQuoted,
    SingleQuoted,
    /// The entire value of a key or list item
    WholeValue,
    /// Part of a longer unquoted scalar
    Embedded,
}

fn placeholder_context(content: &str, start: usize, end: usize) -> PlaceholderContext {
    let before = content[..start].chars().next_back();
    let after = content[end..].chars().next();
    match (before, after) {
        (Some('"'), Some('"')) => return PlaceholderContext::DoubleQuoted,
        (Some('\''), Some('\'')) => return PlaceholderContext::SingleQuoted,
        _ => {}
    }

    let line_start = content[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = content[end..]
        .find('\n')
        .map(|i| end + i)
        .unwrap_or(content.len());
    let prefix = content[line_start..start].trim_start();
    let suffix = &content[end..line_end];

    let starts_value = prefix.is_empty() || prefix.ends_with(": ") || prefix.ends_with("- ");
    let ends_value = suffix.trim_end().is_empty() || suffix.starts_with(" #");
    if starts_value && ends_value {
        PlaceholderContext::WholeValue
    } else {
        PlaceholderContext::Embedded
    }
}

/// Whether a bare value would be read as something other than a plain string
fn needs_quoting(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ];
    value.is_empty()
        || value.starts_with(INDICATORS)
        || value.starts_with(' ')
        || value.ends_with(' ')
        || value.ends_with(':')
        || value.contains(": ")
        || value.contains(" #")
        || value.contains(['\n', '\r', '\t'])
}

fn yaml_escape(value: &str, context: PlaceholderContext) -> Result<String> {
    Ok(match context {
        PlaceholderContext::DoubleQuoted => {
            // a JSON string body is a valid YAML double-quoted body
            let quoted = serde_json::to_string(value)?;
            quoted[1..quoted.len() - 1].to_string()
        }
        PlaceholderContext::SingleQuoted => value.replace('\'', "''"),
        PlaceholderContext::WholeValue if needs_quoting(value) => serde_json::to_string(value)?,
        PlaceholderContext::WholeValue | PlaceholderContext::Embedded => value.to_string(),
    })
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
apiVersion: v1
metadata:
  name: test-cluster
baseDomain: example.com
platform:
  none: {}
pullSecret: '${PULL_SECRET}'
"#;

    const PULL_SECRET: &str = r#"{"auths":{"quay.io":{"auth":"dXNlcjpwYXNz"}}}"#;

    fn loader() -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        loader.set_env_var("PULL_SECRET", PULL_SECRET);
        loader
    }

    #[test]
    fn test_env_var_expansion() {
        let mut loader = ConfigLoader::new();
        loader.set_env_var("TEST_VAR", "test_value");

        let result = loader.expand_env_vars("key: ${TEST_VAR}").unwrap();
        assert_eq!(result, "key: test_value");
    }

    #[test]
    fn test_structured_values_are_quoted() {
        // Arrange
        let mut loader = ConfigLoader::new();
        loader.set_env_var("SECRET", PULL_SECRET);
        loader.set_env_var("NOTE", "say \"hi\"\nnext: line");
        loader.set_env_var("NAME", "o'brien");
        loader.set_env_var("REPLICAS", "3");
        loader.set_env_var("HOST", "proxy.example.com");
        let yaml = "secret: ${SECRET}\nnote: \"${NOTE}\"\nname: '${NAME}'\nreplicas: ${REPLICAS}\nurl: http://${HOST}:3128\nlist:\n  - ${SECRET} # comment\n";

        // Act
        let expanded = loader.expand_env_vars(yaml).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&expanded).unwrap();

        // Assert
        assert_eq!(parsed["secret"].as_str(), Some(PULL_SECRET));
        assert_eq!(parsed["note"].as_str(), Some("say \"hi\"\nnext: line"));
        assert_eq!(parsed["name"].as_str(), Some("o'brien"));
        assert_eq!(parsed["replicas"].as_u64(), Some(3));
        assert_eq!(parsed["url"].as_str(), Some("http://proxy.example.com:3128"));
        assert_eq!(parsed["list"][0].as_str(), Some(PULL_SECRET));
        assert!(parsed.get("next").is_none());
    }

    #[test]
    fn test_unquoted_pull_secret_loads() {
        let content = CONFIG.replace("'${PULL_SECRET}'", "${PULL_SECRET}");
        let config = loader().parse_until(&content, LoadStage::Raw).unwrap();
        assert_eq!(config.pull_secret, PULL_SECRET);
    }

    #[test]
    fn test_expanded_values_are_not_reexpanded() {
        let mut loader = ConfigLoader::new();
        loader.set_env_var("A", "${B}");
        loader.set_env_var("B", "b");

        let result = loader.expand_env_vars("${A}").unwrap();
        assert_eq!(result, "${B}");
    }

    #[test]
    fn test_missing_env_vars_listed_once() {
        let loader = ConfigLoader::new();

        let err = loader
            .expand_env_vars("a: ${MISSING_ONE_X}\nb: ${MISSING_TWO_X}\nc: ${MISSING_ONE_X}")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variables: MISSING_ONE_X, MISSING_TWO_X"
        );
    }

    #[test]
    fn test_load_stages() -> Result<()> {
        // Arrange
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", CONFIG)?;
        let loader = loader();

        // Act
        let raw = loader.load_until(file.path(), LoadStage::Raw)?;
        let defaulted = loader.load_until(file.path(), LoadStage::Defaulted)?;
        let validated = loader.load_install_config(file.path())?;

        // Assert
        assert_eq!(raw.pull_secret, PULL_SECRET);
        assert!(raw.networking.is_none());
        assert!(defaulted.networking.is_some());
        assert_eq!(defaulted, validated);
        Ok(())
    }

    #[test]
    fn test_validation_failure_is_an_error() {
        let loader = loader();
        let content = CONFIG.replace("test-cluster", "Bad_Name");

        let err = loader
            .parse_until(&content, LoadStage::Validated)
            .unwrap_err();

        assert!(matches!(err, InstallError::Validation(_)));
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn test_conversion_failure_is_an_error() {
        let loader = loader();
        let content = CONFIG.replace("apiVersion: v1", "apiVersion: v1beta1");

        let err = loader
            .parse_until(&content, LoadStage::Converted)
            .unwrap_err();

        assert!(matches!(err, InstallError::Conversion(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .load_install_config("/nonexistent/install-config.yaml")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read install-config file"));
    }
}
