// file: src/ops/mod.rs
// version: 1.0.0
// guid: 2d9c6a17-e48b-4f05-b3a1-8f7e0c5d2b69

//! Host lifecycle operations
//!
//! Thin wrappers over `systemctl`, `podman`, `mount` and `lsblk`, run through
//! an [`Execute`] implementation. Inside a container, pair [`Ops`] with an
//! nsenter [`Executor`] so the commands act on the host.

pub mod etcd;
pub mod execute;

pub use etcd::{wait_for_etcd, EtcdWaitOptions};
pub use execute::{Execute, ExecutionStrategy, Executor};

use crate::error::InstallError;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One entry of `lsblk -J` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub children: Vec<BlockDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<BlockDevice>,
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Host operations on top of an executor
pub struct Ops<E: Execute> {
    executor: E,
}

impl<E: Execute> Ops<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// `systemctl <action> [args...]`
    pub async fn systemctl_action(&self, action: &str, args: &[&str]) -> Result<String> {
        info!("Running systemctl {} {}", action, args.join(" "));
        let mut argv = vec![action.to_string()];
        argv.extend(owned(args));
        self.executor.execute("systemctl", &argv).await
    }

    pub async fn run_in_host_namespace(&self, command: &str, args: &[&str]) -> Result<String> {
        self.executor.execute(command, &owned(args)).await
    }

    /// Run a shell snippet through `bash -c`
    pub async fn run_bash_in_host_namespace(&self, script: &str) -> Result<String> {
        self.executor
            .execute("bash", &["-c".to_string(), script.to_string()])
            .await
    }

    /// Run each command in order, stopping at the first failure
    pub async fn run_list_of_commands(&self, commands: &[Vec<String>]) -> Result<()> {
        for (i, command) in commands.iter().enumerate() {
            let (program, args) = command
                .split_first()
                .ok_or_else(|| InstallError::other(format!("Command {} in list is empty", i)))?;
            debug!("Running command {}/{}: {}", i + 1, commands.len(), command.join(" "));
            self.executor.execute_with_live_logging(program, args).await?;
        }
        Ok(())
    }

    /// Make /sysroot writable again
    pub async fn remount_sysroot(&self) -> Result<()> {
        info!("Remounting /sysroot read-write");
        self.executor
            .execute("mount", &owned(&["/sysroot", "-o", "remount,rw"]))
            .await?;
        Ok(())
    }

    /// Whether podman has the image locally; exit code 1 means absent
    pub async fn image_exists(&self, image: &str) -> Result<bool> {
        match self
            .executor
            .execute("podman", &owned(&["image", "exists", image]))
            .await
        {
            Ok(_) => Ok(true),
            Err(InstallError::Process {
                exit_code: Some(1), ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Mount an image and return its mount point
    pub async fn mount_image(&self, image: &str) -> Result<String> {
        info!("Mounting image {}", image);
        let mount_path = self
            .executor
            .execute("podman", &owned(&["image", "mount", image]))
            .await?;
        if mount_path.is_empty() {
            return Err(InstallError::other(format!(
                "podman returned no mount point for image {}",
                image
            )));
        }
        Ok(mount_path)
    }

    pub async fn unmount_and_remove_image(&self, image: &str) -> Result<()> {
        info!("Unmounting and removing image {}", image);
        self.executor
            .execute("podman", &owned(&["image", "unmount", image]))
            .await?;
        self.executor
            .execute("podman", &owned(&["rmi", image]))
            .await?;
        Ok(())
    }

    pub async fn list_block_devices(&self) -> Result<Vec<BlockDevice>> {
        let output = self
            .executor
            .execute("lsblk", &owned(&["-J", "-o", "NAME,SIZE,TYPE,MOUNTPOINT,LABEL"]))
            .await?;
        let parsed: LsblkOutput = serde_json::from_str(&output)?;
        Ok(parsed.blockdevices)
    }

    pub async fn get_hostname(&self) -> Result<String> {
        self.executor.execute("hostname", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every call and replays queued results
    #[derive(Default)]
    struct MockExecutor {
        calls: Mutex<Vec<Vec<String>>>,
        results: Mutex<VecDeque<Result<String>>>,
    }

    impl MockExecutor {
        fn with_results(results: Vec<Result<String>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results.into()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, command: &str, args: &[String]) -> Result<String> {
            let mut call = vec![command.to_string()];
            call.extend(args.iter().cloned());
            self.calls.lock().unwrap().push(call);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    #[async_trait]
    impl Execute for MockExecutor {
        async fn execute(&self, command: &str, args: &[String]) -> Result<String> {
            self.record(command, args)
        }

        async fn execute_with_live_logging(&self, command: &str, args: &[String]) -> Result<String> {
            self.record(command, args)
        }
    }

    fn argv(a: &[&str]) -> Vec<String> {
        owned(a)
    }

    #[tokio::test]
    async fn test_systemctl_action() {
        let ops = Ops::new(MockExecutor::default());

        ops.systemctl_action("restart", &["kubelet.service"]).await.unwrap();

        assert_eq!(ops.executor.calls(), vec![argv(&["systemctl", "restart", "kubelet.service"])]);
    }

    #[tokio::test]
    async fn test_run_bash() {
        let ops = Ops::new(MockExecutor::with_results(vec![Ok("done".to_string())]));

        let out = ops.run_bash_in_host_namespace("echo done | cat").await.unwrap();

        assert_eq!(out, "done");
        assert_eq!(ops.executor.calls(), vec![argv(&["bash", "-c", "echo done | cat"])]);
    }

    #[tokio::test]
    async fn test_run_list_stops_at_first_failure() {
        // Arrange
        let ops = Ops::new(MockExecutor::with_results(vec![
            Ok(String::new()),
            Err(InstallError::process("false", Some(1), "")),
            Ok(String::new()),
        ]));
        let commands = vec![argv(&["true"]), argv(&["false"]), argv(&["echo", "never"])];

        // Act
        let result = ops.run_list_of_commands(&commands).await;

        // Assert
        assert!(result.is_err());
        assert_eq!(ops.executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_run_list_rejects_empty_command() {
        let ops = Ops::new(MockExecutor::default());
        assert!(ops.run_list_of_commands(&[Vec::new()]).await.is_err());
        assert!(ops.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remount_sysroot() {
        let ops = Ops::new(MockExecutor::default());
        ops.remount_sysroot().await.unwrap();
        assert_eq!(ops.executor.calls(), vec![argv(&["mount", "/sysroot", "-o", "remount,rw"])]);
    }

    #[tokio::test]
    async fn test_image_exists_maps_exit_codes() {
        let ops = Ops::new(MockExecutor::with_results(vec![
            Ok(String::new()),
            Err(InstallError::process("podman image exists x", Some(1), "")),
            Err(InstallError::process("podman image exists x", Some(125), "storage error")),
        ]));

        assert!(ops.image_exists("x").await.unwrap());
        assert!(!ops.image_exists("x").await.unwrap());
        assert!(ops.image_exists("x").await.is_err());
    }

    #[tokio::test]
    async fn test_mount_and_remove_image() {
        let ops = Ops::new(MockExecutor::with_results(vec![Ok(
            "/var/lib/containers/storage/overlay/abc/merged".to_string(),
        )]));

        let path = ops.mount_image("quay.io/seed:latest").await.unwrap();
        ops.unmount_and_remove_image("quay.io/seed:latest").await.unwrap();

        assert_eq!(path, "/var/lib/containers/storage/overlay/abc/merged");
        assert_eq!(
            ops.executor.calls(),
            vec![
                argv(&["podman", "image", "mount", "quay.io/seed:latest"]),
                argv(&["podman", "image", "unmount", "quay.io/seed:latest"]),
                argv(&["podman", "rmi", "quay.io/seed:latest"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_mount_image_without_path() {
        let ops = Ops::new(MockExecutor::default());
        assert!(ops.mount_image("img").await.is_err());
    }

    #[tokio::test]
    async fn test_list_block_devices() {
        let lsblk = r#"{
           "blockdevices": [
              {"name":"sda", "size":"120G", "type":"disk", "mountpoint":null, "label":null,
                 "children": [
                    {"name":"sda1", "size":"1M", "type":"part", "mountpoint":null, "label":null},
                    {"name":"sda4", "size":"119G", "type":"part", "mountpoint":"/sysroot", "label":"root"}
                 ]
              },
              {"name":"sr0", "size":"1024M", "type":"rom", "mountpoint":null, "label":null}
           ]
        }"#;
        let ops = Ops::new(MockExecutor::with_results(vec![Ok(lsblk.to_string())]));

        let devices = ops.list_block_devices().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].children.len(), 2);
        assert_eq!(devices[0].children[1].mountpoint.as_deref(), Some("/sysroot"));
        assert_eq!(devices[0].children[1].label.as_deref(), Some("root"));
        assert_eq!(devices[1].device_type.as_deref(), Some("rom"));
    }

    #[tokio::test]
    async fn test_get_hostname_with_real_executor() {
        let ops = Ops::new(Executor::direct());
        // hostname may be missing in minimal containers
        if which::which("hostname").is_ok() {
            assert!(!ops.get_hostname().await.unwrap().is_empty());
        }
    }
}
