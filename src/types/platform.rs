// file: src/types/platform.rs
// version: 1.0.0
// guid: 5e2b8c14-7a69-4d0f-b3e1-0c4d9a6f2b71

//! Per-platform sections of the install-config
//!
//! Only the fields touched by conversion, defaulting and validation are
//! modelled here.

use crate::ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const AWS: &str = "aws";
pub const AZURE: &str = "azure";
pub const GCP: &str = "gcp";
pub const BAREMETAL: &str = "baremetal";
pub const LIBVIRT: &str = "libvirt";
pub const OPENSTACK: &str = "openstack";
pub const VSPHERE: &str = "vsphere";
pub const NONE: &str = "none";

/// The platform the cluster is installed on; exactly one is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Aws(AwsPlatform),
    Azure(AzurePlatform),
    Gcp(GcpPlatform),
    BareMetal(BareMetalPlatform),
    Libvirt(LibvirtPlatform),
    OpenStack(OpenStackPlatform),
    VSphere(VSpherePlatform),
    None(NonePlatform),
}

impl Platform {
    /// The platform key as written in the install-config
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Aws(_) => AWS,
            Platform::Azure(_) => AZURE,
            Platform::Gcp(_) => GCP,
            Platform::BareMetal(_) => BAREMETAL,
            Platform::Libvirt(_) => LIBVIRT,
            Platform::OpenStack(_) => OPENSTACK,
            Platform::VSphere(_) => VSPHERE,
            Platform::None(_) => NONE,
        }
    }

    /// API and ingress VIPs for platforms that host their own load balancing
    pub fn vips(&self) -> Option<(&[String], &[String])> {
        match self {
            Platform::BareMetal(p) => Some((&p.api_vips, &p.ingress_vips)),
            Platform::OpenStack(p) => Some((&p.api_vips, &p.ingress_vips)),
            Platform::VSphere(p) => Some((&p.api_vips, &p.ingress_vips)),
            _ => None,
        }
    }
}

/// Amazon Web Services
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatform {
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub user_tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub propagate_user_tags: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_machine_platform: Option<AwsMachinePool>,

    /// Deprecated: use `propagate_user_tags`
    #[serde(
        default,
        rename = "experimentalPropagateUserTags",
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecated_experimental_propagate_user_tags: Option<bool>,
    /// Deprecated: use `default_machine_platform.ami_id`
    #[serde(default, rename = "amiID", skip_serializing_if = "String::is_empty")]
    pub deprecated_ami_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsMachinePool {
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub instance_type: String,
    #[serde(default, rename = "amiID", skip_serializing_if = "String::is_empty")]
    pub ami_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// Microsoft Azure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzurePlatform {
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_domain_resource_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_name: Option<AzureCloudName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_type: Option<AzureOutboundType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AzureCloudName {
    AzurePublicCloud,
    AzureUSGovernmentCloud,
    AzureChinaCloud,
    AzureGermanCloud,
    AzureStackCloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AzureOutboundType {
    Loadbalancer,
    UserDefinedRouting,
    NatGateway,
}

/// Google Cloud Platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpPlatform {
    #[serde(default, rename = "projectID")]
    pub project_id: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpMachinePool {
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

/// Bare metal hosts managed through a provisioning network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BareMetalPlatform {
    #[serde(default, rename = "libvirtURI", skip_serializing_if = "String::is_empty")]
    pub libvirt_uri: String,
    #[serde(
        default,
        rename = "clusterProvisioningIP",
        skip_serializing_if = "String::is_empty"
    )]
    pub cluster_provisioning_ip: String,
    #[serde(
        default,
        rename = "bootstrapProvisioningIP",
        skip_serializing_if = "String::is_empty"
    )]
    pub bootstrap_provisioning_ip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_bridge: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provisioning_bridge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_network: Option<ProvisioningNetwork>,
    #[serde(
        default,
        rename = "provisioningNetworkCIDR",
        skip_serializing_if = "Option::is_none"
    )]
    pub provisioning_network_cidr: Option<IpNet>,
    #[serde(
        default,
        rename = "provisioningDHCPRange",
        skip_serializing_if = "String::is_empty"
    )]
    pub provisioning_dhcp_range: String,
    #[serde(default, rename = "apiVIPs", skip_serializing_if = "Vec::is_empty")]
    pub api_vips: Vec<String>,
    #[serde(default, rename = "ingressVIPs", skip_serializing_if = "Vec::is_empty")]
    pub ingress_vips: Vec<String>,

    /// Deprecated: use `api_vips`
    #[serde(default, rename = "apiVIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_api_vip: String,
    /// Deprecated: use `ingress_vips`
    #[serde(default, rename = "ingressVIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_ingress_vip: String,
}

/// How the bare metal provisioning network is managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningNetwork {
    Managed,
    Unmanaged,
    Disabled,
}

/// Local libvirt, used for development clusters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibvirtPlatform {
    #[serde(default, rename = "URI", skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<LibvirtNetwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibvirtNetwork {
    #[serde(default, rename = "if", skip_serializing_if = "String::is_empty")]
    pub if_name: String,
}

/// OpenStack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenStackPlatform {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cloud: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_network: String,
    #[serde(default, rename = "apiFloatingIP", skip_serializing_if = "String::is_empty")]
    pub api_floating_ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_machine_platform: Option<OpenStackMachinePool>,
    #[serde(default, rename = "apiVIPs", skip_serializing_if = "Vec::is_empty")]
    pub api_vips: Vec<String>,
    #[serde(default, rename = "ingressVIPs", skip_serializing_if = "Vec::is_empty")]
    pub ingress_vips: Vec<String>,

    /// Deprecated: use `api_floating_ip`
    #[serde(default, rename = "lbFloatingIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_lb_floating_ip: String,
    /// Deprecated: use `default_machine_platform.flavor_name`
    #[serde(default, rename = "computeFlavor", skip_serializing_if = "String::is_empty")]
    pub deprecated_compute_flavor: String,
    /// Deprecated: use `api_vips`
    #[serde(default, rename = "apiVIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_api_vip: String,
    /// Deprecated: use `ingress_vips`
    #[serde(default, rename = "ingressVIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_ingress_vip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenStackMachinePool {
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub flavor_name: String,
}

/// VMware vSphere
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VSpherePlatform {
    #[serde(default, rename = "vCenter", skip_serializing_if = "String::is_empty")]
    pub vcenter: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datacenter: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_datastore: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<DiskType>,
    #[serde(default, rename = "apiVIPs", skip_serializing_if = "Vec::is_empty")]
    pub api_vips: Vec<String>,
    #[serde(default, rename = "ingressVIPs", skip_serializing_if = "Vec::is_empty")]
    pub ingress_vips: Vec<String>,

    /// Deprecated: use `api_vips`
    #[serde(default, rename = "apiVIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_api_vip: String,
    /// Deprecated: use `ingress_vips`
    #[serde(default, rename = "ingressVIP", skip_serializing_if = "String::is_empty")]
    pub deprecated_ingress_vip: String,
}

/// vSphere virtual disk provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiskType {
    Thin,
    Thick,
    EagerZeroedThick,
}

/// No platform integration; machines are provisioned by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonePlatform {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Platform, serde_yaml::Error> {
        serde_yaml::with::singleton_map::deserialize(serde_yaml::Deserializer::from_str(yaml))
    }

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::Aws(AwsPlatform::default()).name(), "aws");
        assert_eq!(Platform::BareMetal(BareMetalPlatform::default()).name(), "baremetal");
        assert_eq!(Platform::VSphere(VSpherePlatform::default()).name(), "vsphere");
        assert_eq!(Platform::None(NonePlatform {}).name(), "none");
    }

    #[test]
    fn test_platform_yaml_keys() {
        let platform =
            parse("baremetal:\n  apiVIP: 192.168.111.5\n  provisioningNetworkCIDR: 172.22.0.0/24\n")
                .unwrap();
        match platform {
            Platform::BareMetal(p) => {
                assert_eq!(p.deprecated_api_vip, "192.168.111.5");
                assert_eq!(p.provisioning_network_cidr.unwrap().to_string(), "172.22.0.0/24");
            }
            other => panic!("unexpected platform {:?}", other),
        }

        let platform = parse("openstack:\n  lbFloatingIP: 1.2.3.4\n").unwrap();
        assert_eq!(platform.name(), "openstack");
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let result = parse("kubevirt: {}\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_vips_only_for_self_hosted_platforms() {
        let bm = Platform::BareMetal(BareMetalPlatform {
            api_vips: vec!["10.0.0.5".to_string()],
            ..Default::default()
        });
        let (api, ingress) = bm.vips().unwrap();
        assert_eq!(api, ["10.0.0.5".to_string()]);
        assert!(ingress.is_empty());
        assert!(Platform::Gcp(GcpPlatform::default()).vips().is_none());
    }
}
