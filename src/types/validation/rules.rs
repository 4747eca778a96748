// file: src/types/validation/rules.rs
// version: 1.0.0
// guid: 6c0a3e95-8d2f-4b71-a4c6-5f9e1b7d3a20

//! Single-value checks used by install-config validation
//!
//! Each check returns a human-readable reason on failure; the caller turns it
//! into a field error at the right path.

use crate::ipnet::IpNet;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

pub type RuleResult = std::result::Result<(), String>;

/// Default Docker bridge subnet, which cluster networks should avoid
pub const DOCKER_BRIDGE_CIDR: IpNet = IpNet::v4(172, 17, 0, 0, 16);

/// SSH key algorithms accepted in `sshKey`
pub const SSH_KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

/// SSH key algorithms allowed when FIPS mode is requested
pub const FIPS_SSH_KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];

fn dns1123_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

fn dns1035_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("valid regex"))
}

/// A DNS domain made of lower-case RFC 1123 labels
pub fn domain_name(v: &str, accept_trailing_dot: bool) -> RuleResult {
    let v = if accept_trailing_dot {
        v.strip_suffix('.').unwrap_or(v)
    } else {
        v
    };
    if v.is_empty() {
        return Err("domain name must not be empty".to_string());
    }
    if v.len() > 253 {
        return Err("domain name must be no more than 253 characters".to_string());
    }
    for label in v.split('.') {
        if label.len() > 63 {
            return Err(format!("label {:?} must be no more than 63 characters", label));
        }
        if !dns1123_label().is_match(label) {
            return Err(format!(
                "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character; {:?} does not",
                label
            ));
        }
    }
    Ok(())
}

/// Cluster name for cloud platforms
pub fn cluster_name(v: &str) -> RuleResult {
    domain_name(v, false)
}

/// Cluster name for platforms whose resource names follow RFC 1035 (GCP, Azure)
pub fn cluster_name_1035(v: &str) -> RuleResult {
    if v.len() > 63 {
        return Err("cluster name must be no more than 63 characters".to_string());
    }
    if !dns1035_label().is_match(v) {
        return Err(
            "cluster name must begin with a lower-case letter and consist only of lower-case letters, digits and '-'"
                .to_string(),
        );
    }
    Ok(())
}

/// Cluster name for on-premise platforms, a single DNS label
pub fn on_prem_cluster_name(v: &str) -> RuleResult {
    if v.contains('.') {
        return Err("cluster name must not contain '.'".to_string());
    }
    if v.len() > 63 {
        return Err("cluster name must be no more than 63 characters".to_string());
    }
    if !dns1123_label().is_match(v) {
        return Err(
            "cluster name must consist of lower case alphanumeric characters or '-' and start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

/// The key type of an authorized_keys line, if it has one
pub fn ssh_key_type(v: &str) -> Option<&str> {
    v.split_whitespace().next()
}

/// An authorized_keys entry: `<type> <base64 blob> [comment]`, the blob naming the same type
pub fn ssh_public_key(v: &str) -> RuleResult {
    let mut parts = v.split_whitespace();
    let key_type = parts.next().ok_or_else(|| "ssh key is empty".to_string())?;
    if !SSH_KEY_TYPES.contains(&key_type) {
        return Err(format!("ssh: unsupported key type {:?}", key_type));
    }
    let blob = parts
        .next()
        .ok_or_else(|| "ssh: no key found".to_string())?;
    let decoded = STANDARD
        .decode(blob)
        .map_err(|e| format!("ssh: key is not valid base64: {}", e))?;
    if decoded.len() < 4 {
        return Err("ssh: short read".to_string());
    }
    let len = u32::from_be_bytes([decoded[0], decoded[1], decoded[2], decoded[3]]) as usize;
    let embedded = decoded
        .get(4..4 + len)
        .ok_or_else(|| "ssh: short read".to_string())?;
    if embedded != key_type.as_bytes() {
        return Err(format!(
            "ssh: key type {:?} does not match key data",
            key_type
        ));
    }
    Ok(())
}

/// A PEM bundle holding at least one certificate
pub fn ca_bundle(v: &str) -> RuleResult {
    let begins = v.matches("-----BEGIN CERTIFICATE-----").count();
    let ends = v.matches("-----END CERTIFICATE-----").count();
    if begins == 0 {
        return Err("no certificates found in bundle".to_string());
    }
    if begins != ends {
        return Err("unterminated certificate in bundle".to_string());
    }
    Ok(())
}

/// A docker-style pull secret: `{"auths": {"<registry>": {"auth": "<base64 user:pass>"}}}`
pub fn image_pull_secret(v: &str) -> RuleResult {
    let value: serde_json::Value =
        serde_json::from_str(v).map_err(|e| format!("invalid pull secret: {}", e))?;
    let auths = value
        .get("auths")
        .and_then(|a| a.as_object())
        .ok_or_else(|| "auths required".to_string())?;

    let mut problems = Vec::new();
    for (registry, entry) in auths {
        match entry.get("auth").and_then(|a| a.as_str()) {
            Some(auth) => match STANDARD.decode(auth) {
                Ok(bytes) if bytes.contains(&b':') => {}
                Ok(_) => problems.push(format!(
                    "{:?}: expected auth to decode to \"user:password\"",
                    registry
                )),
                Err(e) => problems.push(format!("{:?}: invalid auth: {}", registry, e)),
            },
            None if entry.get("credsStore").is_some() => {}
            None => problems.push(format!("{:?}: auth required", registry)),
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("; "))
    }
}

/// A network address with no host bits set and a specified address
pub fn subnet_cidr(cidr: &IpNet) -> RuleResult {
    if cidr.addr().is_unspecified() {
        return Err("address must be specified".to_string());
    }
    let network = cidr.network();
    if network.addr() != cidr.addr() {
        return Err(format!(
            "invalid network address. got {}, expecting {}",
            cidr, network
        ));
    }
    Ok(())
}

/// A service network; IPv6 service networks must be /108 or smaller
pub fn service_subnet_cidr(cidr: &IpNet) -> RuleResult {
    subnet_cidr(cidr)?;
    let (ones, bits) = cidr.mask_size();
    if bits == 128 && ones < 108 {
        return Err(
            "subnet size for IPv6 service network must be /108 or greater (/112 is recommended)"
                .to_string(),
        );
    }
    Ok(())
}

/// An element of `noProxy` that is a domain: a leading '.' is allowed, wildcards are not
pub fn no_proxy_domain_name(v: &str) -> RuleResult {
    if v.contains('*') {
        return Err("must not contain wildcard characters".to_string());
    }
    let v = v.strip_prefix('.').unwrap_or(v);
    domain_name(&v.to_ascii_lowercase(), true)
}

/// Capabilities in each baseline set; every later release keeps the earlier ones
const CAPABILITIES_V4_11: &[&str] = &["baremetal", "marketplace", "openshift-samples"];
const CAPABILITIES_V4_12: &[&str] = &[
    "baremetal",
    "marketplace",
    "openshift-samples",
    "Console",
    "Insights",
    "Storage",
    "CSISnapshot",
];
const CAPABILITIES_V4_13: &[&str] = &[
    "baremetal",
    "marketplace",
    "openshift-samples",
    "Console",
    "Insights",
    "Storage",
    "CSISnapshot",
    "NodeTuning",
];
const CAPABILITIES_V4_14: &[&str] = &[
    "baremetal",
    "marketplace",
    "openshift-samples",
    "Console",
    "Insights",
    "Storage",
    "CSISnapshot",
    "NodeTuning",
    "MachineAPI",
    "Build",
    "DeploymentConfig",
    "ImageRegistry",
];
const CAPABILITIES_V4_15: &[&str] = &[
    "baremetal",
    "marketplace",
    "openshift-samples",
    "Console",
    "Insights",
    "Storage",
    "CSISnapshot",
    "NodeTuning",
    "MachineAPI",
    "Build",
    "DeploymentConfig",
    "ImageRegistry",
    "OperatorLifecycleManager",
    "CloudCredential",
];
const CAPABILITIES_V4_16: &[&str] = &[
    "baremetal",
    "marketplace",
    "openshift-samples",
    "Console",
    "Insights",
    "Storage",
    "CSISnapshot",
    "NodeTuning",
    "MachineAPI",
    "Build",
    "DeploymentConfig",
    "ImageRegistry",
    "OperatorLifecycleManager",
    "CloudCredential",
    "CloudControllerManager",
    "Ingress",
];

/// Baseline capability sets by name
pub const CAPABILITY_SETS: &[(&str, &[&str])] = &[
    ("None", &[]),
    ("v4.11", CAPABILITIES_V4_11),
    ("v4.12", CAPABILITIES_V4_12),
    ("v4.13", CAPABILITIES_V4_13),
    ("v4.14", CAPABILITIES_V4_14),
    ("v4.15", CAPABILITIES_V4_15),
    ("v4.16", CAPABILITIES_V4_16),
    ("vCurrent", CAPABILITIES_V4_16),
];

/// The capability set used when `baselineCapabilitySet` is empty
pub const DEFAULT_CAPABILITY_SET: &str = "vCurrent";

/// Accepted `featureSet` values; empty means `Default`
pub const FEATURE_SETS: &[&str] = &[
    "",
    "CustomNoUpgrade",
    "Default",
    "DevPreviewNoUpgrade",
    "TechPreviewNoUpgrade",
];

/// Capabilities enabled by a baseline set, `None` when the set is unknown
pub fn capability_set(name: &str) -> Option<&'static [&'static str]> {
    let name = if name.is_empty() { DEFAULT_CAPABILITY_SET } else { name };
    CAPABILITY_SETS
        .iter()
        .find(|(set, _)| *set == name)
        .map(|(_, caps)| *caps)
}

/// Every capability any baseline set knows about
pub fn known_capabilities() -> &'static [&'static str] {
    CAPABILITIES_V4_16
}

fn registry_host() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])(?:\.(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]))*(?::[0-9]+)?$",
        )
        .expect("valid regex")
    })
}

fn repository_component() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("valid regex")
    })
}

/// A mirror source or target: `host[:port]` on its own, or a fully
/// qualified repository without tag or digest
pub fn named_repository(v: &str) -> RuleResult {
    if v.is_empty() {
        return Err("the repository provided is invalid: must not be empty".to_string());
    }
    let mut parts = v.split('/');
    let host = parts.next().unwrap_or_default();
    let path: Vec<&str> = parts.collect();

    if path.is_empty() {
        if registry_host().is_match(host) {
            return Ok(());
        }
        return Err(format!("the repository provided is invalid: {:?} is not a valid host", host));
    }
    if let Some(last) = path.last() {
        if last.contains('@') || last.contains(':') {
            return Err("must be repository--not reference".to_string());
        }
    }
    let qualified = host.contains('.') || host.contains(':') || host == "localhost";
    if !qualified || !registry_host().is_match(host) {
        return Err(format!(
            "failed to parse: repository must start with a registry host, got {:?}",
            host
        ));
    }
    if let Some(bad) = path.iter().find(|c| !repository_component().is_match(c)) {
        return Err(format!("failed to parse: invalid repository path component {:?}", bad));
    }
    Ok(())
}
