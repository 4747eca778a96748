// file: src/types/defaults/machinepool.rs
// version: 1.0.0
// guid: 91c5e7a2-3f08-4d6b-b2a4-6e0f8d1c7b39

use crate::types::platform::LIBVIRT;
use crate::types::{Architecture, Hyperthreading, MachinePool, MACHINE_POOL_EDGE_ROLE_NAME};

/// Fill the unset fields of a machine pool
///
/// Pools get three replicas, one on libvirt. Edge pools get none on every
/// platform.
pub fn set_machine_pool_defaults(pool: &mut MachinePool, platform: &str) {
    let mut default_replicas = if platform == LIBVIRT { 1 } else { 3 };
    if pool.name == MACHINE_POOL_EDGE_ROLE_NAME {
        default_replicas = 0;
    }

    if pool.replicas.is_none() {
        pool.replicas = Some(default_replicas);
    }
    if pool.hyperthreading.is_none() {
        pool.hyperthreading = Some(Hyperthreading::Enabled);
    }
    if pool.architecture.is_none() {
        pool.architecture = Some(Architecture::host_default());
    }
}
