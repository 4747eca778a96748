// file: src/config/mod.rs
// version: 1.1.0
// guid: 1c7e4b92-8d35-4f60-a2b9-5e0f3a6c8d17

//! Configuration module
//!
//! Loads install-config files through the convert/default/validate pipeline
//! and persists the result as a state file.

pub mod loader;
pub mod state;

pub use loader::{ConfigLoader, LoadStage};
pub use state::{StateFile, StateFormat};

use std::path::PathBuf;

/// Expand `~` and `$VAR` in a user-supplied path; unknown variables are left as written
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("/tmp/install-config.yaml"), PathBuf::from("/tmp/install-config.yaml"));
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/install-config.yaml");
        assert!(!expanded.to_string_lossy().starts_with('~') || std::env::var("HOME").is_err());
        assert!(expanded.ends_with("install-config.yaml"));
    }

    #[test]
    fn test_expand_path_unknown_var_kept() {
        let expanded = expand_path("~/$UNSET_CLUSTER_AGENT_VAR/state.yaml");
        assert!(expanded.to_string_lossy().contains("$UNSET_CLUSTER_AGENT_VAR"));
    }
}
