// file: src/bootstrap/ignition.rs
// version: 1.0.0
// guid: 9c2b7e15-3d48-4a61-bf09-e4a8d6c1f372

//! Ignition v3.2 document model and builder

use crate::error::InstallError;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::collections::HashSet;

/// Ignition config version written into every document
pub const IGNITION_VERSION: &str = "3.2.0";

const DATA_URL_PREFIX: &str = "data:text/plain;charset=utf-8;base64,";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub ignition: Ignition,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub systemd: Systemd,
    #[serde(default)]
    pub passwd: Passwd,
}

impl Config {
    /// Look up a file entry by absolute path
    pub fn file(&self, path: &str) -> Option<&File> {
        self.storage.files.iter().find(|f| f.path == path)
    }

    /// Look up a unit by name
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.systemd.units.iter().find(|u| u.name == name)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ignition {
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<NodeUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<Resource>,
}

impl File {
    /// Decode the inline contents and check them against the verification hash
    pub fn decoded_contents(&self) -> Result<Vec<u8>> {
        let resource = self
            .contents
            .as_ref()
            .ok_or_else(|| InstallError::ignition(format!("{} has no contents", self.path)))?;
        let encoded = resource.source.strip_prefix(DATA_URL_PREFIX).ok_or_else(|| {
            InstallError::ignition(format!("{} is not an inline base64 data URL", self.path))
        })?;
        let data = STANDARD
            .decode(encoded)
            .map_err(|e| InstallError::ignition(format!("{}: invalid base64: {}", self.path, e)))?;

        if let Some(expected) = &resource.verification.hash {
            let actual = sha512_hash(&data);
            if &actual != expected {
                return Err(InstallError::ignition(format!(
                    "{}: verification hash mismatch, expected {} got {}",
                    self.path, expected, actual
                )));
            }
        }
        Ok(data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUser {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub source: String,
    #[serde(default)]
    pub verification: Verification,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Systemd {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropins: Vec<Dropin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dropin {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Passwd {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<PasswdUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswdUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,
}

/// `sha512-<hex digest>` as used by Ignition verification
pub fn sha512_hash(data: &[u8]) -> String {
    format!("sha512-{}", hex::encode(Sha512::digest(data)))
}

/// Inline `data:` URL holding `data` as base64
pub fn data_url(data: &[u8]) -> String {
    format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(data))
}

/// Accumulates files, units and users into an Ignition [`Config`]
///
/// File paths and unit names must be unique; adding one twice is an error
/// rather than a silent overwrite.
#[derive(Debug, Default)]
pub struct IgnitionBuilder {
    files: Vec<File>,
    units: Vec<Unit>,
    users: Vec<PasswdUser>,
    paths: HashSet<String>,
    unit_names: HashSet<String>,
}

impl IgnitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root-owned file with inline contents
    pub fn add_file(&mut self, path: &str, contents: &[u8], mode: u32) -> Result<&mut Self> {
        if !path.starts_with('/') {
            return Err(InstallError::ignition(format!(
                "File path {} must be absolute",
                path
            )));
        }
        if !self.paths.insert(path.to_string()) {
            return Err(InstallError::ignition(format!(
                "File {} added more than once",
                path
            )));
        }
        self.files.push(File {
            path: path.to_string(),
            overwrite: Some(true),
            mode: Some(mode),
            user: Some(NodeUser {
                name: "root".to_string(),
            }),
            contents: Some(Resource {
                source: data_url(contents),
                verification: Verification {
                    hash: Some(sha512_hash(contents)),
                },
            }),
        });
        Ok(self)
    }

    /// Add a systemd unit
    pub fn add_unit(&mut self, name: &str, contents: &str, enabled: bool) -> Result<&mut Self> {
        if !name.contains('.') {
            return Err(InstallError::ignition(format!(
                "Unit name {} has no type suffix",
                name
            )));
        }
        if !self.unit_names.insert(name.to_string()) {
            return Err(InstallError::ignition(format!(
                "Unit {} added more than once",
                name
            )));
        }
        self.units.push(Unit {
            name: name.to_string(),
            enabled: Some(enabled),
            contents: Some(contents.to_string()),
            dropins: Vec::new(),
        });
        Ok(self)
    }

    /// Authorize an SSH key for `user`, creating the user entry on first use
    pub fn add_ssh_key(&mut self, user: &str, key: &str) -> &mut Self {
        let key = key.trim().to_string();
        match self.users.iter_mut().find(|u| u.name == user) {
            Some(existing) => {
                if !existing.ssh_authorized_keys.contains(&key) {
                    existing.ssh_authorized_keys.push(key);
                }
            }
            None => self.users.push(PasswdUser {
                name: user.to_string(),
                ssh_authorized_keys: vec![key],
            }),
        }
        self
    }

    pub fn build(self) -> Config {
        Config {
            ignition: Ignition {
                version: IGNITION_VERSION.to_string(),
            },
            storage: Storage { files: self.files },
            systemd: Systemd { units: self.units },
            passwd: Passwd { users: self.users },
        }
    }
}
