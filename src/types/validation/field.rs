// file: src/types/validation/field.rs
// version: 1.0.0
// guid: e2f7a9c3-1b64-4d08-9f5e-7a3c0b6d2e18

//! Field-path errors collected by install-config validation

use crate::error::{InstallError, Result};
use std::fmt;

/// Dotted path to a field, e.g. `networking.machineNetwork[1].cidr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self(root.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{}]", self.0, i))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    Invalid,
    NotSupported,
    Duplicate,
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: FieldErrorKind,
    pub value: String,
    pub detail: String,
}

impl FieldError {
    pub fn required(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: FieldErrorKind::Required,
            value: String::new(),
            detail: detail.into(),
        }
    }

    pub fn invalid(path: FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: FieldErrorKind::Invalid,
            value: value.to_string(),
            detail: detail.into(),
        }
    }

    pub fn not_supported(path: FieldPath, value: impl fmt::Display, supported: &[&str]) -> Self {
        let quoted: Vec<String> = supported.iter().map(|s| format!("\"{}\"", s)).collect();
        Self {
            path,
            kind: FieldErrorKind::NotSupported,
            value: value.to_string(),
            detail: format!("supported values: {}", quoted.join(", ")),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl fmt::Display) -> Self {
        Self {
            path,
            kind: FieldErrorKind::Duplicate,
            value: value.to_string(),
            detail: String::new(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldErrorKind::Required => write!(f, "{}: Required value: {}", self.path, self.detail),
            FieldErrorKind::Invalid => write!(
                f,
                "{}: Invalid value: \"{}\": {}",
                self.path, self.value, self.detail
            ),
            FieldErrorKind::NotSupported => write!(
                f,
                "{}: Unsupported value: \"{}\": {}",
                self.path, self.value, self.detail
            ),
            FieldErrorKind::Duplicate => {
                write!(f, "{}: Duplicate value: \"{}\"", self.path, self.value)
            }
        }
    }
}

/// All problems found in one validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Whether any error is reported against exactly `path`
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|e| e.path.as_str() == path)
    }

    /// Whether any error is reported against `prefix` or a field below it.
    /// `proxy` matches `proxy.httpProxy` but not `proxyConfig`.
    pub fn has_path_prefix(&self, prefix: &str) -> bool {
        self.0.iter().any(|e| {
            let path = e.path.as_str();
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
                None => false,
            }
        })
    }

    /// `Ok(())` when empty, otherwise a validation error listing every problem
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        Err(InstallError::validation(format!(
            "invalid install-config: [{}]",
            messages.join(", ")
        )))
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_building() {
        let path = FieldPath::new("networking").child("clusterNetwork").index(2).child("cidr");
        assert_eq!(path.as_str(), "networking.clusterNetwork[2].cidr");
    }

    #[test]
    fn test_error_display() {
        let err = FieldError::invalid(FieldPath::new("publish"), "Mixed", "not allowed");
        assert_eq!(err.to_string(), "publish: Invalid value: \"Mixed\": not allowed");

        let err = FieldError::not_supported(FieldPath::new("compute[0].name"), "infra", &["worker", "edge"]);
        assert!(err.to_string().contains("supported values: \"worker\", \"edge\""));
    }

    #[test]
    fn test_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errs = FieldErrors::new();
        errs.push(FieldError::required(FieldPath::new("networking"), "networking is required"));
        let err = errs.into_result().unwrap_err();
        assert!(matches!(err, InstallError::Validation(_)));
        assert!(err.to_string().contains("networking: Required value"));
    }

    #[test]
    fn test_has_path_is_exact() {
        // Arrange
        let mut errs = FieldErrors::new();
        errs.push(FieldError::required(
            FieldPath::new("proxy").child("httpProxy"),
            "must include httpProxy or httpsProxy",
        ));
        errs.push(FieldError::invalid(
            FieldPath::new("compute").index(1).child("name"),
            "infra",
            "unknown role",
        ));

        // Act / Assert
        assert!(errs.has_path("proxy.httpProxy"));
        assert!(!errs.has_path("proxy"));
        assert!(!errs.has_path("proxy.http"));
        assert!(errs.has_path_prefix("proxy"));
        assert!(!errs.has_path_prefix("prox"));
        assert!(!errs.has_path_prefix("proxy.http"));
        assert!(errs.has_path_prefix("compute"));
        assert!(errs.has_path_prefix("compute[1]"));
        assert!(!errs.has_path_prefix("compute[10]"));
    }
}
