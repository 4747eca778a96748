// file: src/main.rs
// version: 2.0.0
// guid: 8c4b1e73-f05a-4d29-b6e8-2a7d9c3f1e50

//! Cluster install agent - Main entry point

use clap::Parser;
use cluster_install_agent::{
    cli::{commands::*, Cli, Commands},
    logging, Result,
};
use tokio::signal;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_json {
        logging::init_json_logger()?;
    } else {
        logging::init_logger(cli.verbose, cli.quiet)?;
    }

    let shutdown_signal = async {
        if signal::ctrl_c().await.is_err() {
            // no signal handler available; wait for the command instead
            std::future::pending::<()>().await;
        }
        warn!("Received Ctrl+C, shutting down");
    };

    let command_future = async {
        match cli.command {
            Commands::Convert(doc) => convert_command(&doc.config, doc.output.as_deref()).await,
            Commands::Defaults(doc) => defaults_command(&doc.config, doc.output.as_deref()).await,
            Commands::Validate { config } => validate_command(&config).await,
            Commands::CreateState { config, output } => create_state_command(&config, &output).await,
            Commands::Ignition {
                config,
                output,
                release_image,
            } => ignition_command(&config, &output, release_image).await,
            Commands::Exec {
                chroot,
                host,
                live,
                dry_run,
                command,
            } => exec_command(chroot.as_deref(), host, live, dry_run, &command).await,
            Commands::WaitEtcd {
                endpoint,
                timeout_secs,
                interval_secs,
                insecure,
            } => wait_etcd_command(&endpoint, timeout_secs, interval_secs, insecure).await,
        }
    };

    tokio::select! {
        result = command_future => result,
        _ = shutdown_signal => {
            warn!("Application interrupted by user");
            std::process::exit(130); // Standard exit code for Ctrl+C
        }
    }
}
