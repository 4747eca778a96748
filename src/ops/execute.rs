// file: src/ops/execute.rs
// version: 1.0.0
// guid: 6f1a8d24-c7e3-4b59-9a02-3e8b5d7c1f46

//! Command execution strategies
//!
//! One [`Executor`] runs commands directly, inside a chroot, or in the host
//! namespaces of PID 1 through `nsenter`.

use crate::error::InstallError;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Arguments placed before the command when entering the host namespaces
pub const NSENTER_ARGS: &[&str] = &["--target", "1", "--cgroup", "--mount", "--ipc", "--pid", "--"];

/// Runs commands and returns their output
#[async_trait]
pub trait Execute: Send + Sync {
    /// Run to completion and return trimmed stdout
    async fn execute(&self, command: &str, args: &[String]) -> Result<String>;

    /// Run while logging every output line as it arrives; returns trimmed stdout
    async fn execute_with_live_logging(&self, command: &str, args: &[String]) -> Result<String>;
}

/// Where a command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// As a plain child process
    Direct,
    /// With its root directory changed to the given path
    Chroot(PathBuf),
    /// In the host namespaces of PID 1
    Nsenter,
}

/// [`Execute`] implementation backed by `tokio::process`
#[derive(Debug, Clone)]
pub struct Executor {
    strategy: ExecutionStrategy,
    dry_run: bool,
}

impl Executor {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        Self {
            strategy,
            dry_run: false,
        }
    }

    pub fn direct() -> Self {
        Self::new(ExecutionStrategy::Direct)
    }

    pub fn chroot(root: impl Into<PathBuf>) -> Self {
        Self::new(ExecutionStrategy::Chroot(root.into()))
    }

    pub fn nsenter() -> Self {
        Self::new(ExecutionStrategy::Nsenter)
    }

    /// Log commands instead of running them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    /// The argv actually run for `command args...` under this strategy
    pub fn command_line(&self, command: &str, args: &[String]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + NSENTER_ARGS.len() + 2);
        if self.strategy == ExecutionStrategy::Nsenter {
            argv.push("nsenter".to_string());
            argv.extend(NSENTER_ARGS.iter().map(|a| a.to_string()));
        }
        argv.push(command.to_string());
        argv.extend(args.iter().cloned());
        argv
    }

    fn build_command(&self, command: &str, args: &[String]) -> Result<Command> {
        let argv = self.command_line(command, args);
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]).kill_on_drop(true);

        if let ExecutionStrategy::Chroot(root) = &self.strategy {
            if !root.is_dir() {
                return Err(InstallError::process(
                    argv.join(" "),
                    None,
                    format!("chroot directory {} does not exist", root.display()),
                ));
            }
            apply_chroot(&mut cmd, root)?;
        }
        Ok(cmd)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::direct()
    }
}

#[cfg(unix)]
fn apply_chroot(cmd: &mut Command, root: &std::path::Path) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let root = CString::new(root.as_os_str().as_bytes())
        .map_err(|e| InstallError::config(format!("Invalid chroot path: {}", e)))?;
    // SAFETY: only async-signal-safe libc calls run between fork and exec
    unsafe {
        cmd.pre_exec(move || {
            if libc::chroot(root.as_ptr()) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            if libc::chdir(b"/\0".as_ptr().cast::<libc::c_char>()) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_chroot(_cmd: &mut Command, _root: &std::path::Path) -> Result<()> {
    Err(InstallError::config("chroot execution is only supported on unix"))
}

/// Log each line of `reader` as it arrives; invalid UTF-8 is replaced, not fatal
async fn log_lines<R>(reader: R) -> std::io::Result<Vec<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    let mut lines = Vec::new();
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment)
            .trim_end_matches('\r')
            .to_string();
        info!("{}", line);
        lines.push(line);
    }
    Ok(lines)
}

/// stdout and stderr joined for error reports
fn combined_output(stdout: &str, stderr: &str) -> String {
    [stdout.trim(), stderr.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Execute for Executor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<String> {
        let cmdline = self.command_line(command, args).join(" ");
        if self.dry_run {
            info!("DRY RUN: Would execute: {}", cmdline);
            return Ok(String::new());
        }
        debug!("Executing command: {}", cmdline);

        let output = self
            .build_command(command, args)?
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                InstallError::process(&cmdline, None, format!("Failed to execute command: {}", e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let exit_code = output.status.code();
            error!("Command '{}' failed with exit code {:?}", cmdline, exit_code);
            return Err(InstallError::process(
                cmdline,
                exit_code,
                combined_output(&stdout, &stderr),
            ));
        }

        debug!("Command executed successfully");
        Ok(stdout.trim().to_string())
    }

    async fn execute_with_live_logging(&self, command: &str, args: &[String]) -> Result<String> {
        let cmdline = self.command_line(command, args).join(" ");
        if self.dry_run {
            info!("DRY RUN: Would execute: {}", cmdline);
            return Ok(String::new());
        }
        info!("Running: {}", cmdline);

        let mut child = self
            .build_command(command, args)?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                InstallError::process(&cmdline, None, format!("Failed to execute command: {}", e))
            })?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(async move { log_lines(stderr).await }));

        let stdout_lines = match child.stdout.take() {
            Some(stdout) => log_lines(stdout).await?,
            None => Vec::new(),
        };

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.ok().and_then(|r| r.ok()).unwrap_or_default().join("\n"),
            None => String::new(),
        };
        let stdout = stdout_lines.join("\n");

        if !status.success() {
            error!("Command '{}' failed with exit code {:?}", cmdline, status.code());
            return Err(InstallError::process(
                cmdline,
                status.code(),
                combined_output(&stdout, &stderr),
            ));
        }
        Ok(stdout.trim().to_string())
    }
}
