// file: src/error.rs
// version: 1.0.0
// guid: 3f9c2a71-5d4e-4b86-9a0f-6c1e2d7b8a43

use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, InstallError>;

/// Error types for the cluster install agent
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command '{command}' failed with exit code {exit_code:?}: {output}")]
    Process {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Ignition error: {0}")]
    Ignition(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl InstallError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new process error from a failed command
    pub fn process(command: impl Into<String>, exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
            output: output.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new ignition error
    pub fn ignition(msg: impl Into<String>) -> Self {
        Self::Ignition(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<reqwest::Error> for InstallError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_includes_output() {
        let err = InstallError::process("podman image exists foo", Some(1), "no such image");
        let msg = err.to_string();
        assert!(msg.contains("podman image exists foo"));
        assert!(msg.contains("Some(1)"));
        assert!(msg.contains("no such image"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: InstallError = io.into();
        assert!(matches!(err, InstallError::Io(_)));
    }
}
