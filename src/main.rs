//! Cloud Disk Orchestrator CLI
//!
//! Command-line entry point for attaching and detaching iSCSI-backed
//! virtio-blk devices through the storage control plane.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloud_disk_orchestrator::{
    AttachOrchestrator, JsonFileStore, NameRegistry, OrchestratorConfig, ProcessRunner, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Cloud Disk Orchestrator - attach/detach iSCSI-backed virtio-blk devices
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the durable allocated-name record
    #[arg(long, env = "STATE_FILE", default_value = "devices.json")]
    state_file: String,

    /// Control-plane tool managing bdev lifecycle
    #[arg(long, env = "BDEV_RPC", default_value = "nbl_stor_rpc.py")]
    bdev_rpc: String,

    /// Control-plane tool managing virtio-blk device lifecycle
    #[arg(long, env = "DEVICE_RPC", default_value = "nbl_rpc.py")]
    device_rpc: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach a volume as a virtio-blk device
    Connect {
        /// Qualified name of the remote storage target
        #[arg(long)]
        iqn: String,
        /// Address of the remote storage target
        #[arg(long)]
        address: String,
    },
    /// Detach a previously attached volume
    Disconnect {
        /// Qualified name of the remote storage target
        #[arg(long)]
        iqn: String,
        /// Address of the remote storage target
        #[arg(long)]
        address: String,
    },
    /// List all currently allocated resource names
    List,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = run(args).await {
        error!("Operation failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = OrchestratorConfig {
        bdev_rpc_program: args.bdev_rpc.clone(),
        device_rpc_program: args.device_rpc.clone(),
        ..Default::default()
    };

    let registry = NameRegistry::load(Box::new(JsonFileStore::new(&args.state_file)));
    let orchestrator = AttachOrchestrator::new(config, registry, Arc::new(ProcessRunner));

    match args.command {
        Command::Connect { iqn, address } => {
            info!("Received IP: {}", address);
            info!("Received IQN: {}", iqn);
            let outcome = orchestrator.connect(&iqn, &address).await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Command::Disconnect { iqn, address } => {
            info!("Received IP: {}", address);
            info!("Received IQN: {}", iqn);
            let outcome = orchestrator.disconnect(&iqn, &address).await?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Command::List => {
            for name in orchestrator.list_allocated() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
