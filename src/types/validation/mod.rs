// file: src/types/validation/mod.rs
// version: 1.0.0
// guid: 2a9f6d41-c0e8-4b37-85a1-9e4c7b2f0d63

//! Install-config validation
//!
//! Validation never stops at the first problem: every check runs and all
//! findings come back as a [`FieldErrors`] list keyed by field path.
//! Conditions that are suspicious but allowed are logged as warnings.

pub mod field;
pub mod rules;

pub use field::{FieldError, FieldErrorKind, FieldErrors, FieldPath};

use super::platform::{AzureCloudName, BareMetalPlatform, ProvisioningNetwork};
use super::{
    Capabilities, CredentialsMode, ImageContentSource, InstallConfig, MachinePool, Networking,
    Platform, Proxy, PublishingStrategy,
    INSTALL_CONFIG_VERSION, MACHINE_POOL_COMPUTE_ROLE_NAME, MACHINE_POOL_CONTROL_PLANE_ROLE_NAME,
    MACHINE_POOL_EDGE_ROLE_NAME,
};
use crate::ipnet::IpNet;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::warn;

/// Network plugins that carve per-node subnets out of the cluster network
const PLUGINS_USING_HOST_PREFIX: &[&str] = &["OVNKubernetes"];

/// Upper MTU bound of an AWS VPC (jumbo frames)
const MTU_VPC_MAX: u32 = 9001;
/// Lowest cluster network MTU accepted
const MTU_MIN: u32 = 1000;
/// Encapsulation overhead of OVN-Kubernetes
const MTU_OVN_OVERHEAD: u32 = 100;

/// Check every field of the install-config and report all problems found
pub fn validate_install_config(c: &InstallConfig) -> FieldErrors {
    let mut errs = FieldErrors::new();

    if c.api_version.is_empty() {
        errs.push(FieldError::required(
            FieldPath::new("apiVersion"),
            "install-config version required",
        ));
        return errs;
    }
    if c.api_version != INSTALL_CONFIG_VERSION {
        errs.push(FieldError::invalid(
            FieldPath::new("apiVersion"),
            &c.api_version,
            format!("install-config version must be {:?}", INSTALL_CONFIG_VERSION),
        ));
        return errs;
    }

    if c.fips {
        errs.extend(validate_fips_config(c));
    } else if !c.ssh_key.is_empty() {
        if let Err(e) = rules::ssh_public_key(&c.ssh_key) {
            errs.push(FieldError::invalid(FieldPath::new("sshKey"), &c.ssh_key, e));
        }
    }

    if !c.additional_trust_bundle.is_empty() {
        if let Err(e) = rules::ca_bundle(&c.additional_trust_bundle) {
            errs.push(FieldError::invalid(
                FieldPath::new("additionalTrustBundle"),
                &c.additional_trust_bundle,
                e,
            ));
        }
    }

    let name = &c.metadata.name;
    let name_result = match c.platform {
        Platform::Gcp(_) | Platform::Azure(_) => rules::cluster_name_1035(name),
        Platform::VSphere(_) | Platform::BareMetal(_) | Platform::OpenStack(_) => {
            rules::on_prem_cluster_name(name)
        }
        _ => rules::cluster_name(name),
    };
    if let Err(e) = &name_result {
        errs.push(FieldError::invalid(
            FieldPath::new("metadata").child("name"),
            name,
            e.clone(),
        ));
    }
    let domain_result = rules::domain_name(&c.base_domain, true);
    if let Err(e) = &domain_result {
        errs.push(FieldError::invalid(
            FieldPath::new("baseDomain"),
            &c.base_domain,
            e.clone(),
        ));
    }
    if name_result.is_ok() && domain_result.is_ok() {
        let cluster_domain = c.cluster_domain();
        if let Err(e) = rules::domain_name(&cluster_domain, true) {
            errs.push(FieldError::invalid(
                FieldPath::new("baseDomain"),
                cluster_domain,
                e,
            ));
        }
    }

    match &c.networking {
        Some(n) => {
            let path = FieldPath::new("networking");
            errs.extend(validate_networking(n, &path));
            errs.extend(validate_networking_ip_version(n, &c.platform));
            errs.extend(validate_networking_for_platform(n, &c.platform, &path));
            errs.extend(validate_cluster_network_mtu(
                n,
                &c.platform,
                &path.child("clusterNetworkMTU"),
            ));
            errs.extend(validate_vips_for_platform(n, &c.platform));
        }
        None => errs.push(FieldError::required(
            FieldPath::new("networking"),
            "networking is required",
        )),
    }

    errs.extend(validate_platform(c, &FieldPath::new("platform")));

    match &c.control_plane {
        Some(cp) => errs.extend(validate_control_plane(
            &c.platform,
            cp,
            &FieldPath::new("controlPlane"),
        )),
        None => errs.push(FieldError::required(
            FieldPath::new("controlPlane"),
            "controlPlane is required",
        )),
    }
    errs.extend(validate_compute(
        &c.platform,
        c.control_plane.as_ref(),
        &c.compute,
        &FieldPath::new("compute"),
    ));

    if let Err(e) = rules::image_pull_secret(&c.pull_secret) {
        errs.push(FieldError::invalid(FieldPath::new("pullSecret"), &c.pull_secret, e));
    }

    if let Some(proxy) = &c.proxy {
        errs.extend(validate_proxy(proxy, c.networking.as_ref(), &FieldPath::new("proxy")));
    }

    errs.extend(validate_image_sources(
        &c.image_content_sources,
        &FieldPath::new("imageContentSources"),
    ));
    errs.extend(validate_image_sources(
        &c.image_digest_sources,
        &FieldPath::new("imageDigestSources"),
    ));
    if !c.image_content_sources.is_empty() && !c.image_digest_sources.is_empty() {
        errs.push(FieldError::invalid(
            FieldPath::new("imageContentSources"),
            c.image_content_sources.len(),
            "cannot set imageContentSources and imageDigestSources at the same time",
        ));
    }
    if !c.image_content_sources.is_empty() {
        warn!("imageContentSources is deprecated, please use imageDigestSources");
    }

    errs.extend(validate_publish(c));
    errs.extend(validate_credentials_mode(
        c.credentials_mode,
        &c.platform,
        &FieldPath::new("credentialsMode"),
    ));
    if let Some(caps) = &c.capabilities {
        errs.extend(validate_capabilities(caps, &c.platform, &FieldPath::new("capabilities")));
    }
    errs.extend(validate_feature_set(c));

    errs
}

fn validate_fips_config(c: &InstallConfig) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if c.ssh_key.is_empty() {
        return errs;
    }
    let path = FieldPath::new("sshKey");
    if let Err(e) = rules::ssh_public_key(&c.ssh_key) {
        errs.push(FieldError::invalid(path, &c.ssh_key, e));
        return errs;
    }
    let key_type = rules::ssh_key_type(&c.ssh_key).unwrap_or_default();
    if !rules::FIPS_SSH_KEY_TYPES.contains(&key_type) {
        errs.push(FieldError::invalid(
            path,
            &c.ssh_key,
            format!(
                "SSH key type {} unavailable when FIPS is enabled. Please use rsa or ecdsa.",
                key_type
            ),
        ));
    }
    errs
}

fn validate_networking(n: &Networking, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();

    if n.network_type.is_empty() {
        errs.push(FieldError::required(
            path.child("networkType"),
            "network provider type required",
        ));
    }
    if n.network_type == "Kuryr" {
        errs.push(FieldError::invalid(
            path.child("networkType"),
            &n.network_type,
            "networkType Kuryr is not supported on OpenShift later than 4.14",
        ));
    }
    if n.network_type == "OpenShiftSDN" {
        errs.push(FieldError::invalid(
            path.child("networkType"),
            &n.network_type,
            "networkType OpenShiftSDN is deprecated, please use OVNKubernetes",
        ));
    }

    if n.machine_network.is_empty() {
        errs.push(FieldError::required(
            path.child("machineNetwork"),
            "at least one machine network is required",
        ));
    }
    for (i, network) in n.machine_network.iter().enumerate() {
        let idx_path = path.child("machineNetwork").index(i);
        if let Err(e) = rules::subnet_cidr(&network.cidr) {
            errs.push(FieldError::invalid(idx_path.clone(), network.cidr, e));
        }
        for (j, other) in n.machine_network[..i].iter().enumerate() {
            if network.cidr.overlaps(&other.cidr) {
                errs.push(FieldError::invalid(
                    idx_path.clone(),
                    network.cidr,
                    format!("machine network must not overlap with machine network {}", j),
                ));
            }
        }
    }

    for (i, sn) in n.service_network.iter().enumerate() {
        let idx_path = path.child("serviceNetwork").index(i);
        if let Err(e) = rules::service_subnet_cidr(sn) {
            errs.push(FieldError::invalid(idx_path.clone(), sn, e));
        }
        if n.machine_network.iter().any(|m| sn.overlaps(&m.cidr)) {
            errs.push(FieldError::invalid(
                idx_path.clone(),
                sn,
                "service network must not overlap with any of the machine networks",
            ));
        }
        for (j, other) in n.service_network[..i].iter().enumerate() {
            if sn.overlaps(other) {
                errs.push(FieldError::invalid(
                    idx_path.clone(),
                    sn,
                    format!("service network must not overlap with service network {}", j),
                ));
            }
        }
    }
    if n.service_network.is_empty() {
        errs.push(FieldError::required(
            path.child("serviceNetwork"),
            "a service network is required",
        ));
    }

    for i in 0..n.cluster_network.len() {
        errs.extend(validate_cluster_network(
            n,
            i,
            &path.child("clusterNetwork").index(i),
        ));
    }
    if n.cluster_network.is_empty() {
        errs.push(FieldError::required(
            path.child("clusterNetwork"),
            "cluster network required",
        ));
    }

    errs
}

fn validate_cluster_network(n: &Networking, idx: usize, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let cn = &n.cluster_network[idx];
    let cidr_path = path.child("cidr");

    if let Err(e) = rules::subnet_cidr(&cn.cidr) {
        errs.push(FieldError::invalid(cidr_path.clone(), cn.cidr, e));
    }
    if n.machine_network.iter().any(|m| cn.cidr.overlaps(&m.cidr)) {
        errs.push(FieldError::invalid(
            cidr_path.clone(),
            cn.cidr,
            "cluster network must not overlap with any of the machine networks",
        ));
    }
    for (i, sn) in n.service_network.iter().enumerate() {
        if cn.cidr.overlaps(sn) {
            errs.push(FieldError::invalid(
                cidr_path.clone(),
                cn.cidr,
                format!("cluster network must not overlap with service network {}", i),
            ));
        }
    }
    for (i, other) in n.cluster_network[..idx].iter().enumerate() {
        if cn.cidr.overlaps(&other.cidr) {
            errs.push(FieldError::invalid(
                cidr_path.clone(),
                cn.cidr,
                format!("cluster network must not overlap with cluster network {}", i),
            ));
        }
    }

    let prefix_path = path.child("hostPrefix");
    if cn.host_prefix < 0 {
        errs.push(FieldError::invalid(
            prefix_path.clone(),
            cn.host_prefix,
            "hostPrefix must be positive",
        ));
    }
    // plugins that ignore hostPrefix may leave it unset
    if PLUGINS_USING_HOST_PREFIX.contains(&n.network_type.as_str()) || cn.host_prefix != 0 {
        let (ones, bits) = cn.cidr.mask_size();
        if cn.host_prefix < i32::from(ones) {
            errs.push(FieldError::invalid(
                prefix_path,
                cn.host_prefix,
                format!(
                    "cluster network host subnetwork prefix must not be larger size than CIDR {}",
                    cn.cidr
                ),
            ));
        } else if bits == 128 && cn.host_prefix != 64 {
            errs.push(FieldError::invalid(
                prefix_path,
                cn.host_prefix,
                "cluster network host subnetwork prefix must be 64 for IPv6 networks",
            ));
        }
    }
    errs
}

#[derive(Debug, Default, Clone, Copy)]
struct FamilyPresence {
    ipv4: bool,
    ipv6: bool,
    ipv4_primary: bool,
}

fn presence_of(networks: &[IpNet]) -> FamilyPresence {
    let mut presence = FamilyPresence::default();
    for (i, net) in networks.iter().enumerate() {
        if net.is_ipv4() {
            presence.ipv4 = true;
            if i == 0 {
                presence.ipv4_primary = true;
            }
        } else {
            presence.ipv6 = true;
        }
    }
    presence
}

fn join_networks(networks: &[IpNet]) -> String {
    networks
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-stack IPv6 and dual-stack are only available on some platforms
fn validate_networking_ip_version(n: &Networking, platform: &Platform) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let path = FieldPath::new("networking");

    let lists: [(&str, Vec<IpNet>); 3] = [
        (
            "machineNetwork",
            n.machine_network.iter().map(|m| m.cidr).collect(),
        ),
        ("serviceNetwork", n.service_network.clone()),
        (
            "clusterNetwork",
            n.cluster_network.iter().map(|c| c.cidr).collect(),
        ),
    ];
    let service = presence_of(&n.service_network);

    match (service.ipv4, service.ipv6) {
        (true, true) => {
            if n.service_network.len() != 2 {
                errs.push(FieldError::invalid(
                    path.child("serviceNetwork"),
                    join_networks(&n.service_network),
                    "when installing dual-stack IPv4/IPv6 you must provide two service networks, one for each IP address type",
                ));
            }
            let allow_v6_primary = match platform {
                Platform::BareMetal(_) | Platform::VSphere(_) | Platform::OpenStack(_) => true,
                Platform::None(_) => false,
                _ => {
                    errs.push(FieldError::invalid(
                        path.clone(),
                        "DualStack",
                        "dual-stack IPv4/IPv6 is not supported for this platform, specify only one type of address",
                    ));
                    false
                }
            };
            for (name, networks) in &lists {
                let p = presence_of(networks);
                if p.ipv4 && !p.ipv6 {
                    errs.push(FieldError::invalid(
                        path.child(name),
                        join_networks(networks),
                        "dual-stack IPv4/IPv6 requires an IPv6 network in this list",
                    ));
                } else if !p.ipv4 && p.ipv6 {
                    errs.push(FieldError::invalid(
                        path.child(name),
                        join_networks(networks),
                        "dual-stack IPv4/IPv6 requires an IPv4 network in this list",
                    ));
                }
                if !allow_v6_primary && p.ipv4 && p.ipv6 && !p.ipv4_primary {
                    errs.push(FieldError::invalid(
                        path.child(name),
                        join_networks(networks),
                        "IPv4 addresses must be listed before IPv6 addresses",
                    ));
                }
            }
        }
        (false, true) => match platform {
            Platform::BareMetal(_)
            | Platform::VSphere(_)
            | Platform::OpenStack(_)
            | Platform::None(_) => {}
            Platform::Azure(p) if p.cloud_name == Some(AzureCloudName::AzureStackCloud) => {
                errs.push(FieldError::invalid(
                    path,
                    "IPv6",
                    "Azure Stack does not support IPv6",
                ));
            }
            _ => errs.push(FieldError::invalid(
                path,
                "IPv6",
                "single-stack IPv6 is not supported for this platform",
            )),
        },
        (true, false) => {
            if n.service_network.len() > 1 {
                errs.push(FieldError::invalid(
                    path.child("serviceNetwork"),
                    join_networks(&n.service_network),
                    "only one service network can be specified",
                ));
            }
        }
        // missing networks are reported by validate_networking
        (false, false) => {}
    }
    errs
}

/// Overlap with the Docker bridge breaks libvirt hosts; elsewhere it is only a warning
fn validate_networking_for_platform(n: &Networking, platform: &Platform, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let bridge = rules::DOCKER_BRIDGE_CIDR;

    let mut overlapping = Vec::new();
    for (i, m) in n.machine_network.iter().enumerate() {
        if m.cidr.overlaps(&bridge) {
            overlapping.push((path.child("machineNetwork").index(i), m.cidr));
        }
    }
    for (i, s) in n.service_network.iter().enumerate() {
        if s.overlaps(&bridge) {
            overlapping.push((path.child("serviceNetwork").index(i), *s));
        }
    }
    for (i, c) in n.cluster_network.iter().enumerate() {
        if c.cidr.overlaps(&bridge) {
            overlapping.push((path.child("clusterNetwork").index(i), c.cidr));
        }
    }

    for (field_path, cidr) in overlapping {
        if matches!(platform, Platform::Libvirt(_)) {
            errs.push(FieldError::invalid(
                field_path,
                cidr,
                "overlaps with default Docker Bridge subnet",
            ));
        } else {
            warn!("{}: {} overlaps with default Docker Bridge subnet", field_path, cidr);
        }
    }
    errs
}

fn validate_cluster_network_mtu(n: &Networking, platform: &Platform, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let mtu = n.cluster_network_mtu;
    if mtu == 0 {
        return errs;
    }
    if !matches!(platform, Platform::Aws(_)) {
        errs.push(FieldError::invalid(
            path.clone(),
            mtu,
            "cluster network MTU is allowed only in AWS deployments",
        ));
        return errs;
    }
    if mtu > MTU_VPC_MAX {
        errs.push(FieldError::invalid(
            path.clone(),
            mtu,
            format!("cluster network MTU exceeds the maximum value of {}", MTU_VPC_MAX),
        ));
        return errs;
    }
    if mtu < MTU_MIN {
        errs.push(FieldError::invalid(
            path.clone(),
            mtu,
            format!("cluster network MTU is lower than the minimum value of {}", MTU_MIN),
        ));
        return errs;
    }
    let ovn_limit = MTU_VPC_MAX - MTU_OVN_OVERHEAD;
    if n.network_type == "OVNKubernetes" && mtu > ovn_limit {
        errs.push(FieldError::invalid(
            path.clone(),
            mtu,
            format!(
                "cluster network MTU exceeds the maximum value with the network plugin OVNKubernetes of {}",
                ovn_limit
            ),
        ));
    }
    errs
}

fn validate_vips_for_platform(n: &Networking, platform: &Platform) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let Some((api, ingress)) = platform.vips() else {
        return errs;
    };
    let path = FieldPath::new("platform").child(platform.name());
    let required = matches!(platform, Platform::BareMetal(_));

    for (vips, field, kind) in [(api, "apiVIPs", "API"), (ingress, "ingressVIPs", "Ingress")] {
        let field_path = path.child(field);
        if vips.is_empty() {
            if required {
                errs.push(FieldError::required(
                    field_path,
                    format!("must specify at least one VIP for the {}", kind),
                ));
            }
            continue;
        }
        if vips.len() > 2 {
            errs.push(FieldError::invalid(
                field_path.clone(),
                vips.join(", "),
                format!("If set, {} must contain at most two entries", field),
            ));
        }

        let mut parsed = Vec::new();
        for (i, vip) in vips.iter().enumerate() {
            match vip.parse::<IpAddr>() {
                Ok(ip) => {
                    if required && !n.machine_network.iter().any(|m| m.cidr.contains(&ip)) {
                        errs.push(FieldError::invalid(
                            field_path.index(i),
                            vip,
                            format!(
                                "IP expected to be in one of the machine networks: {}",
                                n.machine_network
                                    .iter()
                                    .map(|m| m.cidr.to_string())
                                    .collect::<Vec<_>>()
                                    .join(",")
                            ),
                        ));
                    }
                    parsed.push(ip);
                }
                Err(_) => errs.push(FieldError::invalid(
                    field_path.index(i),
                    vip,
                    format!("{:?} is not a valid IP", vip),
                )),
            }
        }
        if parsed.len() == 2 && parsed[0].is_ipv4() == parsed[1].is_ipv4() {
            errs.push(FieldError::invalid(
                field_path,
                vips.join(", "),
                format!(
                    "If two {} VIPs are given, one must be an IPv4 address, the other an IPv6",
                    kind
                ),
            ));
        }
    }

    for (i, vip) in api.iter().enumerate() {
        if ingress.contains(vip) {
            errs.push(FieldError::invalid(
                path.child("apiVIPs").index(i),
                vip,
                "VIP for API must not be one of the Ingress VIPs",
            ));
        }
    }
    errs
}

fn validate_platform(c: &InstallConfig, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let path = path.child(c.platform.name());

    match &c.platform {
        Platform::Aws(p) => {
            if p.region.is_empty() {
                errs.push(FieldError::required(path.child("region"), "region must be specified"));
            }
        }
        Platform::Azure(p) => {
            if p.region.is_empty() {
                errs.push(FieldError::required(path.child("region"), "region should be set to one of the supported Azure regions"));
            }
        }
        Platform::Gcp(p) => {
            if p.project_id.is_empty() {
                errs.push(FieldError::required(path.child("projectID"), "must provide a project ID"));
            }
            if p.region.is_empty() {
                errs.push(FieldError::required(path.child("region"), "must provide a region"));
            }
        }
        Platform::BareMetal(p) => {
            errs.extend(validate_baremetal(p, c.networking.as_ref(), &path));
        }
        Platform::Libvirt(p) => {
            if p.uri.is_empty() {
                errs.push(FieldError::required(path.child("URI"), "invalid URI"));
            }
        }
        Platform::OpenStack(p) => {
            if p.cloud.is_empty() {
                errs.push(FieldError::required(path.child("cloud"), "a cloud must be specified"));
            }
        }
        Platform::VSphere(_) | Platform::None(_) => {}
    }
    errs
}

fn validate_baremetal(p: &BareMetalPlatform, networking: Option<&Networking>, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if p.provisioning_network == Some(ProvisioningNetwork::Disabled) {
        return errs;
    }
    let Some(cidr) = p.provisioning_network_cidr else {
        return errs;
    };

    if let Some(n) = networking {
        for m in &n.machine_network {
            if cidr.overlaps(&m.cidr) {
                errs.push(FieldError::invalid(
                    path.child("provisioningNetworkCIDR"),
                    cidr,
                    format!("cannot overlap with machine network: {}", m.cidr),
                ));
            }
        }
    }

    for (field, value) in [
        ("clusterProvisioningIP", &p.cluster_provisioning_ip),
        ("bootstrapProvisioningIP", &p.bootstrap_provisioning_ip),
    ] {
        if value.is_empty() {
            continue;
        }
        match value.parse::<IpAddr>() {
            Ok(ip) if cidr.contains(&ip) => {}
            Ok(_) => errs.push(FieldError::invalid(
                path.child(field),
                value,
                format!("provisioning IP must be within the provisioning network {}", cidr),
            )),
            Err(_) => errs.push(FieldError::invalid(
                path.child(field),
                value,
                format!("{:?} is not a valid IP", value),
            )),
        }
    }
    errs
}

fn validate_machine_pool(platform: &Platform, pool: &MachinePool, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if let Some(replicas) = pool.replicas {
        if replicas < 0 {
            errs.push(FieldError::invalid(
                path.child("replicas"),
                replicas,
                "number of replicas must not be negative",
            ));
        }
    }
    for name in pool.platform.names() {
        if name != platform.name() {
            errs.push(FieldError::invalid(
                path.child("platform").child(name),
                name,
                format!(
                    "cannot specify {} for machine pool when cluster is using {}",
                    name,
                    platform.name()
                ),
            ));
        }
    }
    errs
}

fn validate_control_plane(platform: &Platform, pool: &MachinePool, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if pool.name != MACHINE_POOL_CONTROL_PLANE_ROLE_NAME {
        errs.push(FieldError::not_supported(
            path.child("name"),
            &pool.name,
            &[MACHINE_POOL_CONTROL_PLANE_ROLE_NAME],
        ));
    }
    if pool.replicas == Some(0) {
        errs.push(FieldError::invalid(
            path.child("replicas"),
            0,
            "number of control plane replicas must be positive",
        ));
    }
    errs.extend(validate_machine_pool(platform, pool, path));
    errs
}

fn validate_compute(
    platform: &Platform,
    control: Option<&MachinePool>,
    pools: &[MachinePool],
    path: &FieldPath,
) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let mut seen = HashSet::new();

    for (i, pool) in pools.iter().enumerate() {
        let pool_path = path.index(i);
        match pool.name.as_str() {
            MACHINE_POOL_COMPUTE_ROLE_NAME => {}
            MACHINE_POOL_EDGE_ROLE_NAME => {
                if !matches!(platform, Platform::Aws(_)) {
                    errs.push(FieldError::not_supported(
                        pool_path.child("name"),
                        &pool.name,
                        &[MACHINE_POOL_COMPUTE_ROLE_NAME],
                    ));
                }
            }
            _ => errs.push(FieldError::not_supported(
                pool_path.child("name"),
                &pool.name,
                &[MACHINE_POOL_COMPUTE_ROLE_NAME, MACHINE_POOL_EDGE_ROLE_NAME],
            )),
        }

        if !seen.insert(pool.name.as_str()) {
            errs.push(FieldError::duplicate(pool_path.child("name"), &pool.name));
        }

        if let Some(control) = control {
            if control.architecture != pool.architecture {
                errs.push(FieldError::invalid(
                    pool_path.child("architecture"),
                    pool.architecture.map(|a| a.as_str()).unwrap_or_default(),
                    "heteregeneous multi-arch is not supported; compute pool architecture must match control plane",
                ));
            }
        }
        errs.extend(validate_machine_pool(platform, pool, &pool_path));
    }
    errs
}

fn validate_proxy(p: &Proxy, networking: Option<&Networking>, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();

    if p.http_proxy.is_empty() && p.https_proxy.is_empty() {
        errs.push(FieldError::required(
            path.clone(),
            "must include httpProxy or httpsProxy",
        ));
    }
    for (value, field, schemes) in [
        (&p.http_proxy, "httpProxy", &["http"][..]),
        (&p.https_proxy, "httpsProxy", &["http", "https"][..]),
    ] {
        if value.is_empty() {
            continue;
        }
        let field_path = path.child(field);
        errs.extend(validate_uri(value, &field_path, schemes));
        if let Some(n) = networking {
            errs.extend(validate_ip_proxy(value, n, &field_path));
        }
    }

    if !p.no_proxy.is_empty() && p.no_proxy != "*" {
        let field_path = path.child("noProxy");
        if p.no_proxy.contains(' ') {
            errs.push(FieldError::invalid(
                field_path.clone(),
                &p.no_proxy,
                "noProxy must not have spaces",
            ));
        }
        for (idx, v) in p.no_proxy.split(',').enumerate() {
            let v = v.trim();
            let is_domain = rules::no_proxy_domain_name(v).is_ok();
            let is_cidr = IpNet::parse_cidr(v).is_ok();
            let is_ip = v.parse::<IpAddr>().is_ok();
            if !is_domain && !is_cidr && !is_ip {
                errs.push(FieldError::invalid(
                    field_path.clone(),
                    &p.no_proxy,
                    format!(
                        "each element of noProxy must be a IP, CIDR or domain without wildcard characters, which is violated by element {} {:?}",
                        idx, v
                    ),
                ));
            }
        }
    }
    errs
}

fn validate_uri(uri: &str, path: &FieldPath, schemes: &[&str]) -> FieldErrors {
    let mut errs = FieldErrors::new();
    match url::Url::parse(uri) {
        Ok(parsed) if schemes.contains(&parsed.scheme()) => {}
        Ok(parsed) => errs.push(FieldError::not_supported(path.clone(), parsed.scheme(), schemes)),
        Err(e) => errs.push(FieldError::invalid(path.clone(), uri, e.to_string())),
    }
    errs
}

/// A proxy given by IP must not sit inside the cluster or service networks
fn validate_ip_proxy(proxy: &str, n: &Networking, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let Ok(parsed) = url::Url::parse(proxy) else {
        return errs;
    };
    let ip = match parsed.host() {
        Some(url::Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(url::Host::Ipv6(v6)) => IpAddr::V6(v6),
        _ => return errs,
    };

    if n.cluster_network.iter().any(|c| c.cidr.contains(&ip)) {
        errs.push(FieldError::invalid(
            path.clone(),
            proxy,
            "proxy value is part of the cluster networks",
        ));
    }
    if n.service_network.iter().any(|s| s.contains(&ip)) {
        errs.push(FieldError::invalid(
            path.clone(),
            proxy,
            "proxy value is part of the service networks",
        ));
    }
    errs
}

fn validate_publish(c: &InstallConfig) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let path = FieldPath::new("publish");
    match c.publish {
        Some(PublishingStrategy::Internal) => {
            if !matches!(c.platform, Platform::Aws(_) | Platform::Azure(_) | Platform::Gcp(_)) {
                errs.push(FieldError::invalid(
                    path,
                    "Internal",
                    format!(
                        "Internal publish strategy is not supported on {:?} platform",
                        c.platform.name()
                    ),
                ));
            }
        }
        Some(PublishingStrategy::Mixed) => {
            if !matches!(c.platform, Platform::Azure(_)) {
                errs.push(FieldError::invalid(
                    path,
                    "Mixed",
                    format!(
                        "mixed publish strategy is not supported on {:?} platform",
                        c.platform.name()
                    ),
                ));
            }
            if c.operator_publishing_strategy.is_none() {
                errs.push(FieldError::required(
                    FieldPath::new("operatorPublishingStrategy"),
                    "please specify the operator publishing strategy for mixed publish strategy",
                ));
            }
        }
        Some(PublishingStrategy::External) | None => {}
    }

    let Some(ops) = &c.operator_publishing_strategy else {
        return errs;
    };
    let ops_path = FieldPath::new("operatorPublishingStrategy");
    if c.publish != Some(PublishingStrategy::Mixed) {
        errs.push(FieldError::invalid(
            ops_path.clone(),
            c.publish.unwrap_or(PublishingStrategy::External).as_str(),
            "operator publishing strategy is only allowed with mixed publishing strategy installs",
        ));
    }
    let external = PublishingStrategy::External.as_str();
    let internal = PublishingStrategy::Internal.as_str();
    let api_server = if ops.api_server.is_empty() { external } else { ops.api_server.as_str() };
    let ingress = if ops.ingress.is_empty() { external } else { ops.ingress.as_str() };
    for (value, field) in [(api_server, "apiServer"), (ingress, "ingress")] {
        if value != external && value != internal {
            errs.push(FieldError::not_supported(ops_path.child(field), value, &[external, internal]));
        }
    }
    if api_server == internal && ingress == internal {
        errs.push(FieldError::invalid(
            ops_path,
            internal,
            "cannot set both fields to internal in a mixed cluster, use publish internal instead",
        ));
    }
    errs
}

/// Mirror sources and targets must be repositories, never tags or digests
fn validate_image_sources(groups: &[ImageContentSource], path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (i, group) in groups.iter().enumerate() {
        let group_path = path.index(i);
        if let Err(e) = rules::named_repository(&group.source) {
            errs.push(FieldError::invalid(group_path.child("source"), &group.source, e));
        }
        for (j, mirror) in group.mirrors.iter().enumerate() {
            if let Err(e) = rules::named_repository(mirror) {
                errs.push(FieldError::invalid(group_path.child("mirrors").index(j), mirror, e));
            }
        }
    }
    errs
}

fn validate_capabilities(caps: &Capabilities, platform: &Platform, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let additional_path = path.child("additionalEnabledCapabilities");
    let known = rules::known_capabilities();

    let baseline = rules::capability_set(&caps.baseline_capability_set);
    if baseline.is_none() {
        let names: Vec<&str> = rules::CAPABILITY_SETS.iter().map(|(name, _)| *name).collect();
        errs.push(FieldError::not_supported(
            path.child("baselineCapabilitySet"),
            &caps.baseline_capability_set,
            &names,
        ));
    }
    for (i, cap) in caps.additional_enabled_capabilities.iter().enumerate() {
        if !known.contains(&cap.as_str()) {
            errs.push(FieldError::not_supported(additional_path.index(i), cap, known));
        }
    }

    let additional: HashSet<&str> = caps
        .additional_enabled_capabilities
        .iter()
        .map(String::as_str)
        .collect();
    let additional_value = caps.additional_enabled_capabilities.join(", ");

    if caps.baseline_capability_set == "None" {
        let mut dependency = |needs: &str, requires: &str, detail: &str| {
            if additional.contains(needs) && !additional.contains(requires) {
                errs.push(FieldError::invalid(additional_path.clone(), &additional_value, detail));
            }
        };
        dependency("baremetal", "MachineAPI", "the baremetal capability requires the MachineAPI capability");
        dependency(
            "marketplace",
            "OperatorLifecycleManager",
            "the marketplace capability requires the OperatorLifecycleManager capability",
        );
        if matches!(platform, Platform::BareMetal(_)) && !additional.contains("baremetal") {
            errs.push(FieldError::invalid(
                additional_path.clone(),
                &additional_value,
                "platform baremetal requires the baremetal capability",
            ));
        }
    }

    let cloud_credential = "CloudCredential";
    let enabled = baseline.unwrap_or_default().contains(&cloud_credential)
        || additional.contains(cloud_credential);
    if baseline.is_some()
        && !enabled
        && !matches!(platform, Platform::None(_) | Platform::BareMetal(_))
    {
        errs.push(FieldError::invalid(
            path.clone(),
            &caps.baseline_capability_set,
            "disabling CloudCredential capability available only for baremetal platforms",
        ));
    }
    errs
}

/// `featureSet` must be known; `featureGates` need `CustomNoUpgrade`
fn validate_feature_set(c: &InstallConfig) -> FieldErrors {
    let mut errs = FieldErrors::new();
    if !rules::FEATURE_SETS.contains(&c.feature_set.as_str()) {
        errs.push(FieldError::not_supported(
            FieldPath::new("featureSet"),
            &c.feature_set,
            rules::FEATURE_SETS,
        ));
    }
    if c.feature_gates.is_empty() {
        return errs;
    }

    let path = FieldPath::new("featureGates");
    if c.feature_set != "CustomNoUpgrade" {
        errs.push(FieldError::invalid(
            path.clone(),
            c.feature_gates.join(", "),
            "featureGates can only be used with the CustomNoUpgrade feature set",
        ));
    }
    for (i, gate) in c.feature_gates.iter().enumerate() {
        let valid = match gate.split_once('=') {
            Some((name, enabled)) => {
                !name.is_empty() && !enabled.contains('=') && enabled.parse::<bool>().is_ok()
            }
            None => false,
        };
        if !valid {
            errs.push(FieldError::invalid(
                path.index(i),
                gate,
                "must match the format <feature-name>=<bool>",
            ));
        }
    }
    errs
}

fn validate_credentials_mode(mode: Option<CredentialsMode>, platform: &Platform, path: &FieldPath) -> FieldErrors {
    let mut errs = FieldErrors::new();
    let Some(mode) = mode else {
        return errs;
    };

    use CredentialsMode::*;
    let allowed: Option<&[CredentialsMode]> = match platform {
        Platform::Aws(_) | Platform::Gcp(_) => Some(&[Mint, Passthrough, Manual][..]),
        Platform::Azure(p) if p.cloud_name == Some(AzureCloudName::AzureStackCloud) => {
            Some(&[Manual][..])
        }
        Platform::Azure(_) => Some(&[Passthrough, Manual][..]),
        _ => None,
    };

    match allowed {
        Some(modes) if modes.contains(&mode) => {}
        Some(modes) => {
            let names: Vec<&str> = modes.iter().map(|m| m.as_str()).collect();
            errs.push(FieldError::not_supported(path.clone(), mode.as_str(), &names));
        }
        None => errs.push(FieldError::invalid(
            path.clone(),
            mode.as_str(),
            format!("cannot be set when using the {:?} platform", platform.name()),
        )),
    }
    errs
}
