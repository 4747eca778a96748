// file: src/cli/commands.rs
// version: 2.0.0
// guid: b3e7d952-0a6c-4f18-9d24-5c8a1e7f3b06

//! Command implementations for the CLI

use crate::{
    bootstrap::{bootstrap_ignition, BootstrapOptions},
    config::{expand_path, ConfigLoader, LoadStage, StateFile},
    error::InstallError,
    ops::{wait_for_etcd, EtcdWaitOptions, Execute, Executor},
    types::{validation::validate_install_config, InstallConfig},
    Result,
};
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

/// Serialize a config as YAML to `output`, or stdout when absent
fn emit_yaml(config: &InstallConfig, output: Option<&str>) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    match output {
        Some(path) => {
            let path = expand_path(path);
            write_file(&path, &yaml)?;
            eprintln!("{} wrote {}", "✓".green(), path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Convert deprecated fields and print the result
pub async fn convert_command(config: &str, output: Option<&str>) -> Result<()> {
    info!("Converting install-config {}", config);
    let converted = ConfigLoader::new().load_until(expand_path(config), LoadStage::Converted)?;
    emit_yaml(&converted, output)
}

/// Convert, fill in defaults and print the result
pub async fn defaults_command(config: &str, output: Option<&str>) -> Result<()> {
    info!("Applying defaults to install-config {}", config);
    let defaulted = ConfigLoader::new().load_until(expand_path(config), LoadStage::Defaulted)?;
    emit_yaml(&defaulted, output)
}

/// Validate an install-config, listing every problem found
pub async fn validate_command(config: &str) -> Result<()> {
    info!("Validating install-config {}", config);
    let defaulted = ConfigLoader::new().load_until(expand_path(config), LoadStage::Defaulted)?;

    let errors = validate_install_config(&defaulted);
    if errors.is_empty() {
        println!(
            "{} install-config for {} is valid",
            "✓".green(),
            defaulted.cluster_domain().bold()
        );
        return Ok(());
    }

    for e in errors.iter() {
        println!("{} {}", "✗".red(), e);
    }
    error!("Install-config has {} problem(s)", errors.len());
    errors.into_result()
}

/// Run the full pipeline and persist the result
pub async fn create_state_command(config: &str, output: &str) -> Result<()> {
    let install_config = ConfigLoader::new().load_install_config(expand_path(config))?;
    let state = StateFile::new(install_config);
    let path = expand_path(output);
    state.save(&path)?;

    println!(
        "{} cluster {} state written to {}",
        "✓".green(),
        state.cluster_id.to_string().bold(),
        path.display()
    );
    Ok(())
}

/// Render the bootstrap ignition payload for an install-config
pub async fn ignition_command(config: &str, output: &str, release_image: Option<String>) -> Result<()> {
    let install_config = ConfigLoader::new().load_install_config(expand_path(config))?;

    let mut opts = BootstrapOptions::default();
    if let Some(image) = release_image {
        opts.release_image = image;
    }

    let ignition = crate::logging::with_operation_span("ignition", || {
        bootstrap_ignition(&install_config, &opts)
    })?;
    let path = expand_path(output);
    write_file(&path, &ignition.to_json_pretty()?)?;

    println!(
        "{} bootstrap ignition with {} files and {} units written to {}",
        "✓".green(),
        ignition.storage.files.len(),
        ignition.systemd.units.len(),
        path.display()
    );
    Ok(())
}

/// Pick the executor for the `exec` flags
pub fn executor_for(chroot: Option<&str>, host: bool, dry_run: bool) -> Result<Executor> {
    let executor = match (chroot, host) {
        (Some(_), true) => {
            return Err(InstallError::config("--chroot and --host cannot be combined"));
        }
        (Some(root), false) => Executor::chroot(expand_path(root)),
        (None, true) => {
            if which::which("nsenter").is_err() && !dry_run {
                return Err(InstallError::config(
                    "nsenter is not installed; it is required for --host",
                ));
            }
            Executor::nsenter()
        }
        (None, false) => Executor::direct(),
    };
    Ok(executor.with_dry_run(dry_run))
}

/// Run one command through the selected strategy and print its output
pub async fn exec_command(
    chroot: Option<&str>,
    host: bool,
    live: bool,
    dry_run: bool,
    command: &[String],
) -> Result<()> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| InstallError::config("No command given"))?;
    let executor = executor_for(chroot, host, dry_run)?;

    if live {
        executor.execute_with_live_logging(program, args).await?;
    } else {
        let output = executor.execute(program, args).await?;
        if !output.is_empty() {
            println!("{}", output);
        }
    }
    Ok(())
}

/// Block until etcd is healthy
pub async fn wait_etcd_command(
    endpoint: &str,
    timeout_secs: u64,
    interval_secs: u64,
    insecure: bool,
) -> Result<()> {
    let opts = EtcdWaitOptions {
        endpoint: endpoint.to_string(),
        interval: Duration::from_secs(interval_secs.max(1)),
        timeout: Duration::from_secs(timeout_secs),
        accept_invalid_certs: insecure,
    };
    crate::logging::with_async_operation_span("wait-etcd", || wait_for_etcd(&opts)).await?;
    println!("{} etcd at {} is healthy", "✓".green(), endpoint);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ExecutionStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
apiVersion: v1
metadata:
  name: demo
baseDomain: example.com
platform:
  none: {}
pullSecret: '{"auths":{"quay.io":{"auth":"Zm9vOmJhcg=="}}}'
"#;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_executor_for_flags() {
        let exec = executor_for(Some("/mnt/root"), false, false).unwrap();
        assert_eq!(exec.strategy(), &ExecutionStrategy::Chroot("/mnt/root".into()));

        let exec = executor_for(None, true, true).unwrap();
        assert_eq!(exec.strategy(), &ExecutionStrategy::Nsenter);

        assert_eq!(executor_for(None, false, false).unwrap().strategy(), &ExecutionStrategy::Direct);
        assert!(executor_for(Some("/mnt"), true, false).is_err());
    }

    #[tokio::test]
    async fn test_defaults_command_writes_output() {
        // Arrange
        let input = config_file(CONFIG);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/defaulted.yaml");

        // Act
        defaults_command(input.path().to_str().unwrap(), Some(out.to_str().unwrap()))
            .await
            .unwrap();

        // Assert
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("10.128.0.0/14"));
        assert!(written.contains("172.30.0.0/16"));
    }

    #[tokio::test]
    async fn test_validate_command_rejects_bad_config() {
        let input = config_file(&format!("{}publish: Mixed\n", CONFIG));
        let err = validate_command(input.path().to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, InstallError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ignition_command() {
        let input = config_file(CONFIG);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bootstrap.ign");

        ignition_command(
            input.path().to_str().unwrap(),
            out.to_str().unwrap(),
            Some("quay.io/test/release:1".to_string()),
        )
        .await
        .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["ignition"]["version"], "3.2.0");
    }

    #[tokio::test]
    async fn test_create_state_command() {
        let input = config_file(CONFIG);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("state.json");

        create_state_command(input.path().to_str().unwrap(), out.to_str().unwrap())
            .await
            .unwrap();

        let state = StateFile::load(&out).unwrap();
        assert_eq!(state.install_config.metadata.name, "demo");
    }

    #[tokio::test]
    async fn test_exec_command_requires_program() {
        assert!(exec_command(None, false, false, false, &[]).await.is_err());
    }
}
