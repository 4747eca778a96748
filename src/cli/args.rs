// file: src/cli/args.rs
// version: 2.0.0
// guid: 4a8f2c61-d93e-4b07-8e15-7c2b9f0a6d38

//! Command line argument definitions

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cluster-install-agent")]
#[command(about = "Install-config processing, bootstrap ignition and host command tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "CLUSTER_INSTALL_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Carry deprecated install-config fields forward
    Convert(DocumentArgs),

    /// Convert and fill in every unset field
    Defaults(DocumentArgs),

    /// Convert, default and validate an install-config
    Validate {
        #[arg(short, long, help = "Path to install-config.yaml")]
        config: String,
    },

    /// Run the full pipeline and write a state file
    CreateState {
        #[arg(short, long, help = "Path to install-config.yaml")]
        config: String,

        #[arg(short, long, help = "State file to write (.json for JSON, YAML otherwise)")]
        output: String,
    },

    /// Render the bootstrap ignition payload
    Ignition {
        #[arg(short, long, help = "Path to install-config.yaml")]
        config: String,

        #[arg(short, long, help = "Where to write the ignition JSON")]
        output: String,

        #[arg(long, help = "Release image pulled by the bootstrap node")]
        release_image: Option<String>,
    },

    /// Run a command directly, in a chroot, or in the host namespaces
    Exec {
        #[arg(long, conflicts_with = "host", help = "Run inside this root directory")]
        chroot: Option<String>,

        #[arg(long, help = "Run in the namespaces of PID 1 through nsenter")]
        host: bool,

        #[arg(long, help = "Stream output lines as they arrive")]
        live: bool,

        #[arg(long, help = "Show what would be done without actually doing it")]
        dry_run: bool,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Wait for etcd to report healthy
    WaitEtcd {
        #[arg(long, default_value = crate::ops::etcd::DEFAULT_ETCD_ENDPOINT)]
        endpoint: String,

        #[arg(long, default_value = "60")]
        timeout_secs: u64,

        #[arg(long, default_value = "1")]
        interval_secs: u64,

        #[arg(long, help = "Skip TLS certificate verification")]
        insecure: bool,
    },
}

/// Input document plus optional output path
#[derive(Args)]
pub struct DocumentArgs {
    #[arg(short, long, help = "Path to install-config.yaml")]
    pub config: String,

    #[arg(short, long, help = "Write the result here instead of stdout")]
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exec_trailing_args() {
        let cli = Cli::try_parse_from(["cluster-install-agent", "exec", "--host", "--", "ls", "-la", "/"]).unwrap();
        match cli.command {
            Commands::Exec { host, chroot, command, .. } => {
                assert!(host);
                assert!(chroot.is_none());
                assert_eq!(command, vec!["ls", "-la", "/"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_exec_chroot_conflicts_with_host() {
        let parsed = Cli::try_parse_from([
            "cluster-install-agent", "exec", "--host", "--chroot", "/mnt", "--", "true",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_wait_etcd_defaults() {
        let cli = Cli::try_parse_from(["cluster-install-agent", "wait-etcd"]).unwrap();
        match cli.command {
            Commands::WaitEtcd { endpoint, timeout_secs, interval_secs, insecure } => {
                assert_eq!(endpoint, "https://localhost:2379");
                assert_eq!(timeout_secs, 60);
                assert_eq!(interval_secs, 1);
                assert!(!insecure);
            }
            _ => panic!("expected wait-etcd"),
        }
    }
}
