// file: src/types/defaults/platform.rs
// version: 1.0.0
// guid: 4b8e1d07-6a2c-4f53-9d7e-2c1a5f8b0e96

//! Platform-specific defaults

use crate::ipnet::IpNet;
use crate::types::platform::{
    AzureCloudName, AzureOutboundType, AzurePlatform, BareMetalPlatform, DiskType,
    LibvirtNetwork, LibvirtPlatform, OpenStackPlatform, ProvisioningNetwork, VSpherePlatform,
};
use tracing::{debug, warn};

pub const DEFAULT_LIBVIRT_URI: &str = "qemu+tcp://192.168.122.1/system";
pub const DEFAULT_LIBVIRT_IF_NAME: &str = "tt0";

pub const DEFAULT_BAREMETAL_LIBVIRT_URI: &str = "qemu:///system";
pub const DEFAULT_EXTERNAL_BRIDGE: &str = "baremetal";
pub const DEFAULT_PROVISIONING_BRIDGE: &str = "provisioning";
pub const DEFAULT_PROVISIONING_CIDR: IpNet = IpNet::v4(172, 22, 0, 0, 24);
pub const DEFAULT_PROVISIONING_CIDR_V6: &str = "fd00:1101::/64";

pub const DEFAULT_OPENSTACK_CLOUD: &str = "openstack";

pub fn set_azure_defaults(p: &mut AzurePlatform) {
    if p.cloud_name.is_none() {
        p.cloud_name = Some(AzureCloudName::AzurePublicCloud);
    }
    if p.outbound_type.is_none() {
        p.outbound_type = Some(AzureOutboundType::Loadbalancer);
    }
}

pub fn set_libvirt_defaults(p: &mut LibvirtPlatform) {
    if p.uri.is_empty() {
        p.uri = DEFAULT_LIBVIRT_URI.to_string();
    }
    let network = p.network.get_or_insert_with(LibvirtNetwork::default);
    if network.if_name.is_empty() {
        network.if_name = DEFAULT_LIBVIRT_IF_NAME.to_string();
    }
}

pub fn set_vsphere_defaults(p: &mut VSpherePlatform) {
    if p.disk_type.is_none() {
        p.disk_type = Some(DiskType::Thin);
    }
}

/// Default the OpenStack cloud name from `OS_CLOUD`
pub fn set_openstack_defaults(p: &mut OpenStackPlatform) {
    set_openstack_defaults_with_cloud(p, std::env::var("OS_CLOUD").ok());
}

fn set_openstack_defaults_with_cloud(p: &mut OpenStackPlatform, os_cloud: Option<String>) {
    if p.cloud.is_empty() {
        p.cloud = os_cloud
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENSTACK_CLOUD.to_string());
    }
}

/// Bare metal defaults; the provisioning network follows the family of the first machine network
pub fn set_baremetal_defaults(p: &mut BareMetalPlatform, machine_network: Option<&IpNet>) {
    if p.libvirt_uri.is_empty() {
        p.libvirt_uri = DEFAULT_BAREMETAL_LIBVIRT_URI.to_string();
    }
    if p.external_bridge.is_empty() {
        p.external_bridge = DEFAULT_EXTERNAL_BRIDGE.to_string();
    }
    if p.provisioning_bridge.is_empty() {
        p.provisioning_bridge = DEFAULT_PROVISIONING_BRIDGE.to_string();
    }
    let provisioning = *p
        .provisioning_network
        .get_or_insert(ProvisioningNetwork::Managed);

    if p.provisioning_network_cidr.is_none() {
        let ipv6 = machine_network.map(|n| n.is_ipv6()).unwrap_or(false);
        p.provisioning_network_cidr = if ipv6 {
            IpNet::parse_cidr(DEFAULT_PROVISIONING_CIDR_V6).ok()
        } else {
            Some(DEFAULT_PROVISIONING_CIDR)
        };
    }
    let Some(cidr) = p.provisioning_network_cidr.map(|c| c.network()) else {
        return;
    };

    if provisioning == ProvisioningNetwork::Disabled {
        debug!("Provisioning network disabled, skipping provisioning address defaults");
        return;
    }

    if p.cluster_provisioning_ip.is_empty() {
        if let Some(ip) = cidr.nth_host(3) {
            p.cluster_provisioning_ip = ip.to_string();
        }
    }
    if p.bootstrap_provisioning_ip.is_empty() {
        if let Some(ip) = cidr.nth_host(2) {
            p.bootstrap_provisioning_ip = ip.to_string();
        }
    }

    if provisioning == ProvisioningNetwork::Managed && p.provisioning_dhcp_range.is_empty() {
        let host_bits = u32::from(cidr.bits() - cidr.prefix_len());
        if host_bits < 5 || host_bits >= 128 {
            warn!(
                "Provisioning network {} has no room for a default DHCP range",
                cidr
            );
            return;
        }
        let last = (1u128 << host_bits) - 2;
        if let (Some(start), Some(end)) = (cidr.nth_host(10), cidr.nth_host(last)) {
            p.provisioning_dhcp_range = format!("{},{}", start, end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_azure_defaults() {
        let mut p = AzurePlatform::default();
        set_azure_defaults(&mut p);
        assert_eq!(p.cloud_name, Some(AzureCloudName::AzurePublicCloud));
        assert_eq!(p.outbound_type, Some(AzureOutboundType::Loadbalancer));
    }

    #[test]
    fn test_libvirt_defaults() {
        let mut p = LibvirtPlatform::default();
        set_libvirt_defaults(&mut p);
        assert_eq!(p.uri, DEFAULT_LIBVIRT_URI);
        assert_eq!(p.network.unwrap().if_name, "tt0");
    }

    #[test]
    fn test_openstack_cloud_from_env_value() {
        let mut p = OpenStackPlatform::default();
        set_openstack_defaults_with_cloud(&mut p, Some("mycloud".to_string()));
        assert_eq!(p.cloud, "mycloud");

        let mut p = OpenStackPlatform::default();
        set_openstack_defaults_with_cloud(&mut p, None);
        assert_eq!(p.cloud, "openstack");
    }

    #[test]
    fn test_baremetal_ipv4_defaults() {
        let mut p = BareMetalPlatform::default();
        set_baremetal_defaults(&mut p, Some(&IpNet::v4(192, 168, 111, 0, 24)));

        assert_eq!(p.libvirt_uri, "qemu:///system");
        assert_eq!(p.external_bridge, "baremetal");
        assert_eq!(p.provisioning_bridge, "provisioning");
        assert_eq!(p.provisioning_network, Some(ProvisioningNetwork::Managed));
        assert_eq!(p.provisioning_network_cidr.unwrap().to_string(), "172.22.0.0/24");
        assert_eq!(p.cluster_provisioning_ip, "172.22.0.3");
        assert_eq!(p.bootstrap_provisioning_ip, "172.22.0.2");
        assert_eq!(p.provisioning_dhcp_range, "172.22.0.10,172.22.0.254");
    }

    #[test]
    fn test_baremetal_ipv6_provisioning_network() {
        let mut p = BareMetalPlatform::default();
        let machine = IpNet::parse_cidr("fd2e:6f44:5dd8:c956::/120").unwrap();
        set_baremetal_defaults(&mut p, Some(&machine));

        assert_eq!(p.provisioning_network_cidr.unwrap().to_string(), "fd00:1101::/64");
        assert_eq!(p.cluster_provisioning_ip, "fd00:1101::3");
        assert_eq!(p.provisioning_dhcp_range, "fd00:1101::a,fd00:1101::ffff:ffff:ffff:fffe");
    }

    #[test]
    fn test_baremetal_disabled_provisioning() {
        let mut p = BareMetalPlatform {
            provisioning_network: Some(ProvisioningNetwork::Disabled),
            ..Default::default()
        };
        set_baremetal_defaults(&mut p, None);
        assert!(p.cluster_provisioning_ip.is_empty());
        assert!(p.provisioning_dhcp_range.is_empty());
    }

    #[test]
    fn test_baremetal_unmanaged_has_no_dhcp_range() {
        let mut p = BareMetalPlatform {
            provisioning_network: Some(ProvisioningNetwork::Unmanaged),
            ..Default::default()
        };
        set_baremetal_defaults(&mut p, None);
        assert_eq!(p.cluster_provisioning_ip, "172.22.0.3");
        assert!(p.provisioning_dhcp_range.is_empty());
    }

    #[test]
    fn test_vsphere_defaults() {
        let mut p = VSpherePlatform::default();
        set_vsphere_defaults(&mut p);
        assert_eq!(p.disk_type, Some(DiskType::Thin));
    }
}
