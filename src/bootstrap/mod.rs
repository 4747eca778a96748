// file: src/bootstrap/mod.rs
// version: 1.0.0
// guid: e7a3c590-1f2d-4b84-a6e8-2d5b0c9f7e31

//! Bootstrap node ignition payload
//!
//! Renders the embedded scripts and units for one install-config and adds
//! the per-cluster secrets: pull secret, trust bundle, proxy environment and
//! the `core` user's SSH key.

pub mod content;
pub mod ignition;

pub use ignition::{Config as IgnitionConfig, IgnitionBuilder};

use crate::error::InstallError;
use crate::types::InstallConfig;
use crate::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Release image used when none is given
pub const DEFAULT_RELEASE_IMAGE: &str = "quay.io/openshift-release-dev/ocp-release:4.16.0-x86_64";

pub use crate::ops::etcd::DEFAULT_ETCD_ENDPOINT;

pub const PULL_SECRET_PATH: &str = "/root/.docker/config.json";
pub const TRUST_BUNDLE_PATH: &str = "/etc/pki/ca-trust/source/anchors/ca.crt";
pub const PROXY_ENV_PATH: &str = "/etc/systemd/system.conf.d/10-default-env.conf";

/// User that receives the install-config SSH key
pub const CORE_USER: &str = "core";

/// Per-run inputs that are not part of the install-config
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub release_image: String,
    pub etcd_endpoint: String,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            release_image: DEFAULT_RELEASE_IMAGE.to_string(),
            etcd_endpoint: DEFAULT_ETCD_ENDPOINT.to_string(),
        }
    }
}

fn image_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(:[0-9]+)?(/[A-Za-z0-9._-]+)*(:[A-Za-z0-9._-]{1,128})?(@[a-z0-9]+:[a-f0-9]{32,})?$")
            .expect("valid regex")
    })
}

/// Reject values that would not survive being pasted into the bootstrap scripts
pub fn check_options(opts: &BootstrapOptions) -> Result<()> {
    if !image_reference_regex().is_match(&opts.release_image) {
        return Err(InstallError::ignition(format!(
            "Release image {:?} is not a valid image reference",
            opts.release_image
        )));
    }
    let endpoint = url::Url::parse(&opts.etcd_endpoint).map_err(|e| {
        InstallError::ignition(format!("Invalid etcd endpoint {}: {}", opts.etcd_endpoint, e))
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(InstallError::ignition(format!(
            "etcd endpoint {} must use http or https",
            opts.etcd_endpoint
        )));
    }
    Ok(())
}

/// Template variables for one install-config
pub fn template_vars(config: &InstallConfig, opts: &BootstrapOptions) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("release_image".to_string(), opts.release_image.clone()),
        ("cluster_name".to_string(), config.metadata.name.clone()),
        ("etcd_endpoint".to_string(), opts.etcd_endpoint.clone()),
    ])
}

/// Assemble the bootstrap ignition document
pub fn bootstrap_ignition(config: &InstallConfig, opts: &BootstrapOptions) -> Result<IgnitionConfig> {
    info!(
        "Rendering bootstrap ignition for cluster {} with release image {}",
        config.metadata.name, opts.release_image
    );
    check_options(opts)?;
    let vars = template_vars(config, opts);
    let mut builder = IgnitionBuilder::new();

    for file in content::FILES {
        let rendered = content::render_template(file.contents, &vars)?;
        builder.add_file(file.path, rendered.as_bytes(), file.mode)?;
    }
    for unit in content::UNITS {
        let rendered = content::render_template(unit.contents, &vars)?;
        builder.add_unit(unit.name, &rendered, unit.enabled)?;
    }

    builder.add_file(PULL_SECRET_PATH, config.pull_secret.as_bytes(), 0o600)?;

    if !config.additional_trust_bundle.is_empty() {
        debug!("Adding additional trust bundle");
        builder.add_file(
            TRUST_BUNDLE_PATH,
            config.additional_trust_bundle.as_bytes(),
            0o600,
        )?;
    }

    if let Some(env) = proxy_environment(config) {
        debug!("Adding proxy environment");
        builder.add_file(PROXY_ENV_PATH, env.as_bytes(), 0o644)?;
    }

    if !config.ssh_key.trim().is_empty() {
        builder.add_ssh_key(CORE_USER, &config.ssh_key);
    }

    Ok(builder.build())
}

/// Destinations that always bypass the proxy, plus the cluster's own networks
pub fn no_proxy_list(config: &InstallConfig) -> Vec<String> {
    let mut entries: Vec<String> = vec![
        ".cluster.local".to_string(),
        ".svc".to_string(),
        "127.0.0.1".to_string(),
        "localhost".to_string(),
        format!("api-int.{}", config.cluster_domain()),
    ];
    if let Some(n) = &config.networking {
        entries.extend(n.machine_network.iter().map(|m| m.cidr.to_string()));
        entries.extend(n.service_network.iter().map(ToString::to_string));
        entries.extend(n.cluster_network.iter().map(|c| c.cidr.to_string()));
    }
    if let Some(p) = &config.proxy {
        entries.extend(
            p.no_proxy
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }
    let mut seen = std::collections::HashSet::new();
    entries.retain(|e| seen.insert(e.clone()));
    entries
}

/// systemd manager drop-in exporting the proxy settings to every service
pub fn proxy_environment(config: &InstallConfig) -> Option<String> {
    let proxy = config.proxy.as_ref()?;
    if proxy.http_proxy.is_empty() && proxy.https_proxy.is_empty() {
        return None;
    }

    let mut vars = Vec::new();
    if !proxy.http_proxy.is_empty() {
        vars.push(format!("\"HTTP_PROXY={}\"", proxy.http_proxy));
    }
    if !proxy.https_proxy.is_empty() {
        vars.push(format!("\"HTTPS_PROXY={}\"", proxy.https_proxy));
    }
    vars.push(format!("\"NO_PROXY={}\"", no_proxy_list(config).join(",")));

    Some(format!("[Manager]\nDefaultEnvironment={}\n", vars.join(" ")))
}
