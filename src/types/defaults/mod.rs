// file: src/types/defaults/mod.rs
// version: 1.0.0
// guid: 0d6a2f83-4c1b-4e95-a7f2-8b3e9c5d1a64

//! Defaulting pass for the install-config
//!
//! Every unset field receives its default. Running the pass a second time
//! changes nothing.

pub mod machinepool;
pub mod platform;

pub use machinepool::set_machine_pool_defaults;

use super::{
    ClusterNetworkEntry, InstallConfig, MachineNetworkEntry, MachinePool, Networking, Platform,
    PublishingStrategy, TrustBundlePolicy, MACHINE_POOL_COMPUTE_ROLE_NAME,
    MACHINE_POOL_CONTROL_PLANE_ROLE_NAME,
};
use crate::ipnet::IpNet;
use tracing::debug;

/// Machine network used when none is configured
pub const DEFAULT_MACHINE_CIDR: IpNet = IpNet::v4(10, 0, 0, 0, 16);

/// Machine network used on libvirt, matching the libvirt default bridge range
pub const DEFAULT_LIBVIRT_MACHINE_CIDR: IpNet = IpNet::v4(192, 168, 126, 0, 24);

/// Service network used when none is configured
pub const DEFAULT_SERVICE_NETWORK: IpNet = IpNet::v4(172, 30, 0, 0, 16);

/// Cluster (pod) network used when none is configured
pub const DEFAULT_CLUSTER_NETWORK: IpNet = IpNet::v4(10, 128, 0, 0, 14);

/// Per-node prefix carved out of the default cluster network
pub const DEFAULT_HOST_PREFIX: i32 = 23;

/// Network plugin used when none is configured
pub const DEFAULT_NETWORK_TYPE: &str = "OVNKubernetes";

/// Fill every unset field of the install-config with its default
pub fn set_install_config_defaults(config: &mut InstallConfig) {
    let is_libvirt = matches!(config.platform, Platform::Libvirt(_));
    let networking = config.networking.get_or_insert_with(Networking::default);

    if networking.machine_network.is_empty() {
        let cidr = if is_libvirt {
            DEFAULT_LIBVIRT_MACHINE_CIDR
        } else {
            DEFAULT_MACHINE_CIDR
        };
        networking.machine_network = vec![MachineNetworkEntry { cidr }];
    }
    if networking.network_type.is_empty() {
        networking.network_type = DEFAULT_NETWORK_TYPE.to_string();
    }
    if networking.service_network.is_empty() && networking.deprecated_service_cidr.is_none() {
        networking.service_network = vec![DEFAULT_SERVICE_NETWORK];
    }
    if networking.cluster_network.is_empty() && networking.deprecated_cluster_networks.is_empty() {
        networking.cluster_network = vec![ClusterNetworkEntry::new(
            DEFAULT_CLUSTER_NETWORK,
            DEFAULT_HOST_PREFIX,
        )];
    }

    if config.publish.is_none() {
        config.publish = Some(PublishingStrategy::External);
    }
    if config.additional_trust_bundle_policy.is_none() {
        config.additional_trust_bundle_policy = Some(TrustBundlePolicy::Proxyonly);
    }

    let platform_name = config.platform.name();
    let control_plane = config.control_plane.get_or_insert_with(MachinePool::default);
    control_plane.name = MACHINE_POOL_CONTROL_PLANE_ROLE_NAME.to_string();
    set_machine_pool_defaults(control_plane, platform_name);

    if config.compute.is_empty() {
        config.compute = vec![MachinePool::named(MACHINE_POOL_COMPUTE_ROLE_NAME)];
    }
    for pool in config.compute.iter_mut() {
        set_machine_pool_defaults(pool, platform_name);
    }

    let first_machine_network = config
        .networking
        .as_ref()
        .and_then(|n| n.machine_network.first())
        .map(|m| m.cidr);

    match &mut config.platform {
        Platform::Azure(p) => platform::set_azure_defaults(p),
        Platform::BareMetal(p) => platform::set_baremetal_defaults(p, first_machine_network.as_ref()),
        Platform::Libvirt(p) => platform::set_libvirt_defaults(p),
        Platform::OpenStack(p) => platform::set_openstack_defaults(p),
        Platform::VSphere(p) => platform::set_vsphere_defaults(p),
        Platform::Aws(_) | Platform::Gcp(_) | Platform::None(_) => {}
    }

    debug!("Applied install-config defaults for platform {}", platform_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::platform::{AwsPlatform, LibvirtPlatform, NonePlatform};
    use crate::types::{Architecture, Hyperthreading};

    fn none_config() -> InstallConfig {
        InstallConfig::new("test", "example.com", Platform::None(NonePlatform {}))
    }

    #[test]
    fn test_empty_config_gets_all_defaults() {
        // Arrange
        let mut config = none_config();

        // Act
        set_install_config_defaults(&mut config);

        // Assert
        let n = config.networking.as_ref().unwrap();
        assert_eq!(n.machine_network[0].cidr.to_string(), "10.0.0.0/16");
        assert_eq!(n.service_network[0].to_string(), "172.30.0.0/16");
        assert_eq!(n.cluster_network[0].cidr.to_string(), "10.128.0.0/14");
        assert_eq!(n.cluster_network[0].host_prefix, 23);
        assert_eq!(n.network_type, "OVNKubernetes");
        assert_eq!(config.publish, Some(PublishingStrategy::External));
        assert_eq!(
            config.additional_trust_bundle_policy,
            Some(TrustBundlePolicy::Proxyonly)
        );

        let cp = config.control_plane.as_ref().unwrap();
        assert_eq!(cp.name, "master");
        assert_eq!(cp.replicas, Some(3));
        assert_eq!(cp.hyperthreading, Some(Hyperthreading::Enabled));
        assert_eq!(cp.architecture, Some(Architecture::host_default()));

        assert_eq!(config.compute.len(), 1);
        assert_eq!(config.compute[0].name, "worker");
        assert_eq!(config.compute[0].replicas, Some(3));
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let mut config = none_config();
        set_install_config_defaults(&mut config);
        let once = config.clone();
        set_install_config_defaults(&mut config);
        assert_eq!(config, once);
    }

    #[test]
    fn test_existing_values_are_kept() {
        let mut config = none_config();
        config.networking = Some(Networking {
            network_type: "Calico".to_string(),
            service_network: vec![IpNet::parse_cidr("172.31.0.0/16").unwrap()],
            ..Default::default()
        });
        config.publish = Some(PublishingStrategy::Internal);
        config.compute = vec![MachinePool {
            name: "worker".to_string(),
            replicas: Some(0),
            hyperthreading: Some(Hyperthreading::Disabled),
            ..Default::default()
        }];

        set_install_config_defaults(&mut config);

        let n = config.networking.as_ref().unwrap();
        assert_eq!(n.network_type, "Calico");
        assert_eq!(n.service_network[0].to_string(), "172.31.0.0/16");
        assert_eq!(config.publish, Some(PublishingStrategy::Internal));
        assert_eq!(config.compute[0].replicas, Some(0));
        assert_eq!(config.compute[0].hyperthreading, Some(Hyperthreading::Disabled));
    }

    #[test]
    fn test_deprecated_fields_suppress_defaults() {
        let mut config = none_config();
        config.networking = Some(Networking {
            deprecated_service_cidr: Some(IpNet::parse_cidr("172.31.0.0/16").unwrap()),
            deprecated_cluster_networks: vec![ClusterNetworkEntry::new(
                IpNet::parse_cidr("10.132.0.0/14").unwrap(),
                23,
            )],
            ..Default::default()
        });

        set_install_config_defaults(&mut config);

        let n = config.networking.as_ref().unwrap();
        assert!(n.service_network.is_empty());
        assert!(n.cluster_network.is_empty());
    }

    #[test]
    fn test_control_plane_is_always_named_master() {
        let mut config = none_config();
        config.control_plane = Some(MachinePool::named("controllers"));
        set_install_config_defaults(&mut config);
        assert_eq!(config.control_plane.unwrap().name, "master");
    }

    #[test]
    fn test_libvirt_machine_network_and_replicas() {
        let mut config = InstallConfig::new(
            "test",
            "example.com",
            Platform::Libvirt(LibvirtPlatform::default()),
        );
        set_install_config_defaults(&mut config);

        let n = config.networking.as_ref().unwrap();
        assert_eq!(n.machine_network[0].cidr.to_string(), "192.168.126.0/24");
        assert_eq!(config.control_plane.as_ref().unwrap().replicas, Some(1));
        assert_eq!(config.compute[0].replicas, Some(1));
    }

    #[test]
    fn test_aws_platform_untouched() {
        let platform = Platform::Aws(AwsPlatform {
            region: "us-east-1".to_string(),
            ..Default::default()
        });
        let mut config = InstallConfig::new("test", "example.com", platform.clone());
        set_install_config_defaults(&mut config);
        assert_eq!(config.platform, platform);
    }
}
