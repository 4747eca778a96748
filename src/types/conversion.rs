// file: src/types/conversion.rs
// version: 1.0.0
// guid: a7d3f150-9e2c-4b84-8c6d-13f0e5b92a6c

//! Up-conversion of deprecated install-config fields
//!
//! Deprecated fields are copied forward into their replacements when the
//! replacement is unset. They are never cleared, so a converted document
//! still carries everything the user wrote.

use super::platform::{AwsMachinePool, AwsPlatform, OpenStackMachinePool, OpenStackPlatform};
use super::{InstallConfig, Platform, INSTALL_CONFIG_VERSION};
use crate::error::{InstallError, Result};
use tracing::{debug, warn};

/// API versions that can be up-converted to the current one
const CONVERTIBLE_VERSIONS: &[&str] = &[INSTALL_CONFIG_VERSION, "v1beta3", "v1beta4"];

/// Convert an install-config written against an older schema to the current one
pub fn convert_install_config(config: &mut InstallConfig) -> Result<()> {
    if config.api_version.is_empty() {
        debug!("install-config has no apiVersion, skipping conversion");
        return Ok(());
    }
    if !CONVERTIBLE_VERSIONS.contains(&config.api_version.as_str()) {
        return Err(InstallError::conversion(format!(
            "cannot upconvert from version {}",
            config.api_version
        )));
    }

    convert_networking(config);

    match &mut config.platform {
        Platform::Aws(p) => convert_aws(p),
        Platform::BareMetal(p) => {
            upconvert_vip(&mut p.api_vips, &p.deprecated_api_vip, "apiVIPs", "apiVIP")?;
            upconvert_vip(
                &mut p.ingress_vips,
                &p.deprecated_ingress_vip,
                "ingressVIPs",
                "ingressVIP",
            )?;
        }
        Platform::OpenStack(p) => convert_openstack(p)?,
        Platform::VSphere(p) => {
            upconvert_vip(&mut p.api_vips, &p.deprecated_api_vip, "apiVIPs", "apiVIP")?;
            upconvert_vip(
                &mut p.ingress_vips,
                &p.deprecated_ingress_vip,
                "ingressVIPs",
                "ingressVIP",
            )?;
        }
        _ => {}
    }

    if config.api_version != INSTALL_CONFIG_VERSION {
        debug!(
            "Upconverted install-config from {} to {}",
            config.api_version, INSTALL_CONFIG_VERSION
        );
    }
    config.api_version = INSTALL_CONFIG_VERSION.to_string();
    Ok(())
}

/// Copy deprecated networking fields into their replacements
pub fn convert_networking(config: &mut InstallConfig) {
    let Some(netconf) = config.networking.as_mut() else {
        return;
    };

    if netconf.service_network.is_empty() {
        if let Some(cidr) = netconf.deprecated_service_cidr {
            netconf.service_network = vec![cidr];
        }
    }

    if netconf.network_type.is_empty() {
        netconf.network_type = netconf.deprecated_type.clone();
    }

    if netconf.machine_network.is_empty() {
        if let Some(cidr) = netconf.deprecated_machine_cidr {
            netconf.machine_network = vec![super::MachineNetworkEntry { cidr }];
        }
    }

    if netconf.cluster_network.is_empty() && !netconf.deprecated_cluster_networks.is_empty() {
        netconf.cluster_network = netconf.deprecated_cluster_networks.clone();
    }

    for entry in netconf.cluster_network.iter_mut() {
        if entry.host_prefix == 0 && entry.deprecated_host_subnet_length != 0 {
            let (_, bits) = entry.cidr.mask_size();
            entry.host_prefix = i32::from(bits) - entry.deprecated_host_subnet_length;
        }
    }
}

fn convert_aws(platform: &mut AwsPlatform) {
    if !platform.deprecated_ami_id.is_empty() {
        let pool = platform
            .default_machine_platform
            .get_or_insert_with(AwsMachinePool::default);
        if pool.ami_id.is_empty() {
            pool.ami_id = platform.deprecated_ami_id.clone();
        }
    }
    if let Some(propagate) = platform.deprecated_experimental_propagate_user_tags {
        warn!("platform.aws.experimentalPropagateUserTags is deprecated, use propagateUserTags");
        platform.propagate_user_tags = propagate;
    }
}

fn convert_openstack(platform: &mut OpenStackPlatform) -> Result<()> {
    if !platform.deprecated_compute_flavor.is_empty() {
        let pool = platform
            .default_machine_platform
            .get_or_insert_with(OpenStackMachinePool::default);
        if !pool.flavor_name.is_empty() && pool.flavor_name != platform.deprecated_compute_flavor {
            return Err(InstallError::conversion(
                "platform.openstack.computeFlavor: cannot specify computeFlavor and type in defaultMachinePlatform together",
            ));
        }
        pool.flavor_name = platform.deprecated_compute_flavor.clone();
    }

    if !platform.deprecated_lb_floating_ip.is_empty() {
        if !platform.api_floating_ip.is_empty()
            && platform.api_floating_ip != platform.deprecated_lb_floating_ip
        {
            return Err(InstallError::conversion(
                "platform.openstack.lbFloatingIP: cannot specify lbFloatingIP and apiFloatingIP together",
            ));
        }
        platform.api_floating_ip = platform.deprecated_lb_floating_ip.clone();
    }

    upconvert_vip(
        &mut platform.api_vips,
        &platform.deprecated_api_vip,
        "apiVIPs",
        "apiVIP",
    )?;
    upconvert_vip(
        &mut platform.ingress_vips,
        &platform.deprecated_ingress_vip,
        "ingressVIPs",
        "ingressVIP",
    )
}

/// Mirror a singular VIP into its list form; the singular must lead the list when both are set
fn upconvert_vip(vips: &mut Vec<String>, old_vip: &str, new_field: &str, old_field: &str) -> Result<()> {
    if old_vip.is_empty() {
        return Ok(());
    }
    match vips.first() {
        None => vips.push(old_vip.to_string()),
        Some(first) if first != old_vip => {
            return Err(InstallError::conversion(format!(
                "{}: {} must be the first entry in {}",
                old_field, old_field, new_field
            )));
        }
        Some(_) => {}
    }
    Ok(())
}
