// file: src/types/mod.rs
// version: 1.0.0
// guid: c41e7a92-0b5d-4f38-8e6a-2d9f1b7c3a05

//! Install-config data model
//!
//! The install-config is the user-facing document describing the desired
//! cluster: networking, the platform it runs on and the machine pools that
//! make it up. It is loaded once, converted once, defaulted once and then
//! persisted; it does not change afterwards within one invocation.

pub mod conversion;
pub mod defaults;
pub mod platform;
pub mod validation;

pub use platform::Platform;

use crate::ipnet::IpNet;
use platform::{AwsMachinePool, GcpMachinePool, OpenStackMachinePool};
use serde::{Deserialize, Serialize};

/// Current install-config API version
pub const INSTALL_CONFIG_VERSION: &str = "v1";

/// Name of the control plane machine pool
pub const MACHINE_POOL_CONTROL_PLANE_ROLE_NAME: &str = "master";

/// Name of the regular compute machine pool
pub const MACHINE_POOL_COMPUTE_ROLE_NAME: &str = "worker";

/// Name of the edge compute machine pool
pub const MACHINE_POOL_EDGE_ROLE_NAME: &str = "edge";

/// The install-config document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub base_domain: String,
    /// PEM-encoded CA certificates added to the cluster trust store
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub additional_trust_bundle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_trust_bundle_policy: Option<TrustBundlePolicy>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_key: String,
    #[serde(default)]
    pub pull_secret: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fips: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<MachinePool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compute: Vec<MachinePool>,
    /// Written as `platform: {<name>: {...}}`, never as a YAML tag
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishingStrategy>,
    /// Per-operator exposure, only meaningful with `publish: Mixed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_publishing_strategy: Option<OperatorPublishingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_mode: Option<CredentialsMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Proxy>,
    /// Deprecated mirror list, superseded by `imageDigestSources`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_content_sources: Vec<ImageContentSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_digest_sources: Vec<ImageDigestSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feature_set: String,
    /// `<FeatureName>=<bool>` entries, only with the `CustomNoUpgrade` feature set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_gates: Vec<String>,
}

impl InstallConfig {
    /// Create a config with the given name, base domain and platform, everything else unset
    pub fn new(name: impl Into<String>, base_domain: impl Into<String>, platform: Platform) -> Self {
        Self {
            api_version: INSTALL_CONFIG_VERSION.to_string(),
            metadata: ObjectMeta { name: name.into() },
            base_domain: base_domain.into(),
            additional_trust_bundle: String::new(),
            additional_trust_bundle_policy: None,
            ssh_key: String::new(),
            pull_secret: String::new(),
            fips: false,
            networking: None,
            control_plane: None,
            compute: Vec::new(),
            platform,
            publish: None,
            operator_publishing_strategy: None,
            credentials_mode: None,
            proxy: None,
            image_content_sources: Vec::new(),
            image_digest_sources: Vec::new(),
            capabilities: None,
            feature_set: String::new(),
            feature_gates: Vec::new(),
        }
    }

    /// The DNS domain of the cluster, `<name>.<baseDomain>`
    pub fn cluster_domain(&self) -> String {
        format!(
            "{}.{}",
            self.metadata.name,
            self.base_domain.trim_end_matches('.')
        )
    }

}

/// Object metadata, only the name is meaningful for an install-config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
}

/// Cluster networking configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_network: Vec<MachineNetworkEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_network: Vec<ClusterNetworkEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_network: Vec<IpNet>,
    #[serde(
        default,
        rename = "clusterNetworkMTU",
        skip_serializing_if = "is_zero_u32"
    )]
    pub cluster_network_mtu: u32,

    /// Deprecated: use `machine_network`
    #[serde(
        default,
        rename = "machineCIDR",
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecated_machine_cidr: Option<IpNet>,
    /// Deprecated: use `network_type`
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub deprecated_type: String,
    /// Deprecated: use `service_network`
    #[serde(
        default,
        rename = "serviceCIDR",
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecated_service_cidr: Option<IpNet>,
    /// Deprecated: use `cluster_network`
    #[serde(
        default,
        rename = "clusterNetworks",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub deprecated_cluster_networks: Vec<ClusterNetworkEntry>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

/// A network the cluster machines are attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineNetworkEntry {
    pub cidr: IpNet,
}

/// A pod network and the prefix each node's slice of it gets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    pub cidr: IpNet,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub host_prefix: i32,
    /// Deprecated: use `host_prefix`
    #[serde(
        default,
        rename = "hostSubnetLength",
        skip_serializing_if = "is_zero_i32"
    )]
    pub deprecated_host_subnet_length: i32,
}

impl ClusterNetworkEntry {
    pub fn new(cidr: IpNet, host_prefix: i32) -> Self {
        Self {
            cidr,
            host_prefix,
            deprecated_host_subnet_length: 0,
        }
    }
}

/// A group of machines sharing a role and shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinePool {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperthreading: Option<Hyperthreading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
    #[serde(default, skip_serializing_if = "MachinePoolPlatform::is_empty")]
    pub platform: MachinePoolPlatform,
}

impl MachinePool {
    /// Create a pool with only its name set
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Platform-specific machine pool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachinePoolPlatform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsMachinePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpMachinePool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenStackMachinePool>,
}

impl MachinePoolPlatform {
    pub fn is_empty(&self) -> bool {
        self.aws.is_none() && self.gcp.is_none() && self.openstack.is_none()
    }

    /// Names of the platforms configured on this pool
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.aws.is_some() {
            names.push(platform::AWS);
        }
        if self.gcp.is_some() {
            names.push(platform::GCP);
        }
        if self.openstack.is_some() {
            names.push(platform::OPENSTACK);
        }
        names
    }
}

/// Supported machine architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "amd64")]
    Amd64,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "ppc64le")]
    Ppc64le,
    #[serde(rename = "s390x")]
    S390x,
}

impl Architecture {
    /// Get the architecture as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Amd64 => "amd64",
            Architecture::Arm64 => "arm64",
            Architecture::Ppc64le => "ppc64le",
            Architecture::S390x => "s390x",
        }
    }

    /// Architecture of the machine running the installer, amd64 when unknown
    pub fn host_default() -> Self {
        match std::env::consts::ARCH {
            "aarch64" => Architecture::Arm64,
            "powerpc64" => Architecture::Ppc64le,
            "s390x" => Architecture::S390x,
            _ => Architecture::Amd64,
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Architecture {
    type Err = crate::error::InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amd64" | "x86_64" => Ok(Architecture::Amd64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "ppc64le" => Ok(Architecture::Ppc64le),
            "s390x" => Ok(Architecture::S390x),
            _ => Err(crate::error::InstallError::config(format!(
                "Unknown architecture: {}",
                s
            ))),
        }
    }
}

/// Simultaneous multithreading mode of pool machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hyperthreading {
    Enabled,
    Disabled,
}

/// How the cluster endpoints are exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishingStrategy {
    External,
    Internal,
    Mixed,
}

impl PublishingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishingStrategy::External => "External",
            PublishingStrategy::Internal => "Internal",
            PublishingStrategy::Mixed => "Mixed",
        }
    }
}

/// Exposure of the API server and ingress in a mixed cluster.
/// An empty value means `External`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorPublishingStrategy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_server: String,
}

/// A source repository and the mirrors that serve the same images
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContentSource {
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mirrors: Vec<String>,
}

/// Digest-only mirror entry, same shape as [`ImageContentSource`]
pub type ImageDigestSource = ImageContentSource;

/// Optional cluster components to install
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Empty means `vCurrent`
    #[serde(default)]
    pub baseline_capability_set: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_enabled_capabilities: Vec<String>,
}

/// How the cloud credential operator handles credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialsMode {
    Mint,
    Passthrough,
    Manual,
}

impl CredentialsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialsMode::Mint => "Mint",
            CredentialsMode::Passthrough => "Passthrough",
            CredentialsMode::Manual => "Manual",
        }
    }
}

/// Where the additional trust bundle is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustBundlePolicy {
    Proxyonly,
    Always,
}

/// Cluster-wide egress proxy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_proxy: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub https_proxy: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub no_proxy: String,
}
