//! # stowerctl — Stower operator CLI
//!
//! Composition root that wires the BLE transport and the file-index store
//! into the commissioning and log-collection flows.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars) and CLI arguments
//! - Initialize logging
//! - Discover peripherals and open device sessions
//! - Drive commissioning, node unlock, log collection, and formatting
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no protocol or session logic belongs here.

mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use stower_adapter_btleplug::{BlePeripheral, scanner};
use stower_adapter_index_fs::FsFileIndexStore;
use stower_core::{Commissioner, DeleteOutcome, DeviceSession, FileTransfer};
use stower_protocol::mac::MacAddr;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "stowerctl")]
#[command(about = "Commission Stower devices and collect their logs over BLE")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for Stower devices in range
    Scan {
        /// Scan duration in seconds (overrides the config file)
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Authenticate an inverter and enroll its battery pack
    Commission {
        /// Inverter BLE address (AA:BB:CC:DD:EE:FF)
        #[arg(short, long)]
        address: MacAddr,
        /// Battery node address, repeatable up to 16 times (overrides the
        /// config file)
        #[arg(short, long = "battery")]
        batteries: Vec<MacAddr>,
    },
    /// Unlock a battery node so it keeps advertising for enrollment
    AuthNode {
        /// Battery node BLE address
        #[arg(short, long)]
        address: MacAddr,
    },
    /// Work with the log files stored on an inverter
    Logs {
        /// Inverter BLE address
        #[arg(short, long)]
        address: MacAddr,
        #[command(subcommand)]
        action: LogsAction,
    },
    /// Erase the inverter's file storage
    Format {
        /// Inverter BLE address
        #[arg(short, long)]
        address: MacAddr,
    },
}

#[derive(Subcommand)]
enum LogsAction {
    /// List the files on the device and refresh the local index
    List,
    /// Download every transferable file, then optionally delete remote copies
    Pull {
        /// Directory downloaded files are written to
        #[arg(short, long, default_value = "logs")]
        out: PathBuf,
        /// Delete each file from the device after a successful download
        #[arg(long)]
        delete: bool,
    },
    /// Delete one file from the device
    Rm {
        /// Remote file name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.logging.filter.as_str())
        .init();

    match cli.command {
        Commands::Scan { duration } => run_scan(&config, duration).await,
        Commands::Commission { address, batteries } => {
            run_commission(&config, address, batteries).await
        }
        Commands::AuthNode { address } => run_auth_node(&config, address).await,
        Commands::Logs { address, action } => run_logs(&config, address, action).await,
        Commands::Format { address } => run_format(&config, address).await,
    }
}

async fn run_scan(config: &Config, duration: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let duration = duration.map_or_else(|| config.scan_duration(), Duration::from_secs);
    tracing::info!(seconds = duration.as_secs(), "scan started");

    let found = scanner::scan(duration).await?;
    if found.is_empty() {
        println!("no Stower devices in range");
        return Ok(());
    }
    for peripheral in found {
        let rssi = peripheral
            .rssi
            .map_or_else(|| "?".to_string(), |rssi| format!("{rssi} dBm"));
        let name = peripheral.local_name.as_deref().unwrap_or("(unnamed)");
        println!("{}  {rssi}  {name}", peripheral.address);
    }
    Ok(())
}

async fn run_commission(
    config: &Config,
    address: MacAddr,
    batteries: Vec<MacAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    let batteries = if batteries.is_empty() {
        config.battery_addrs()?
    } else {
        batteries
    };

    let peripheral = scanner::find_peripheral(address, config.scan_duration()).await?;
    let report = Commissioner::new(config.commission.log_interval)
        .commission(peripheral, &batteries)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_auth_node(config: &Config, address: MacAddr) -> Result<(), Box<dyn std::error::Error>> {
    let peripheral = scanner::find_peripheral(address, config.scan_duration()).await?;
    if Commissioner::new(config.commission.log_interval)
        .authenticate_node(peripheral)
        .await
    {
        println!("battery node {address} unlocked");
        Ok(())
    } else {
        Err(format!("battery node {address} refused the unlock digest").into())
    }
}

async fn run_logs(
    config: &Config,
    address: MacAddr,
    action: LogsAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, address).await?;
    let store = FsFileIndexStore::new(config.index_path());
    let transfer = FileTransfer::new(&session, &store, config.transfer_config());

    let result = match action {
        LogsAction::List => list_logs(&transfer).await,
        LogsAction::Pull { out, delete } => pull_logs(&transfer, config, &out, delete).await,
        LogsAction::Rm { name } => remove_log(&transfer, &name).await,
    };

    session.close().await;
    result
}

async fn run_format(config: &Config, address: MacAddr) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, address).await?;
    let store = FsFileIndexStore::new(config.index_path());
    let transfer = FileTransfer::new(&session, &store, config.transfer_config());

    let result = transfer.format_storage().await;
    session.close().await;
    result?;

    println!("device storage formatted");
    Ok(())
}

/// Find the peripheral, connect, and subscribe to command responses.
async fn open_session(
    config: &Config,
    address: MacAddr,
) -> Result<DeviceSession<BlePeripheral>, Box<dyn std::error::Error>> {
    let peripheral = scanner::find_peripheral(address, config.scan_duration()).await?;
    let session = DeviceSession::open(peripheral).await?;
    session.subscribe().await?;
    Ok(session)
}

async fn list_logs(
    transfer: &FileTransfer<'_, BlePeripheral, FsFileIndexStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let names = transfer.list_files().await?;
    if names.is_empty() {
        println!("no files on the device");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

async fn pull_logs(
    transfer: &FileTransfer<'_, BlePeripheral, FsFileIndexStore>,
    config: &Config,
    out: &Path,
    delete: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    transfer.list_files().await?;
    let candidates = transfer
        .transfer_candidates(&config.reserved_names())
        .await?;
    if candidates.is_empty() {
        println!("nothing to pull");
        return Ok(());
    }

    tokio::fs::create_dir_all(out).await?;
    let mut pulled = 0usize;
    for name in &candidates {
        // Device file names never contain separators; skip anything that
        // would escape the output directory.
        if name.contains(['/', '\\']) {
            tracing::warn!(file = %name, "skipping suspicious file name");
            continue;
        }

        let content = transfer.download_file(name).await?;
        let path = out.join(name);
        tokio::fs::write(&path, &content).await?;
        println!("{} ({} bytes)", path.display(), content.len());
        pulled += 1;

        if delete {
            if let DeleteOutcome::Refused(status) = transfer.delete_file(name).await? {
                eprintln!("device refused to delete {name} (status {status})");
            }
        }
    }

    println!("pulled {pulled} of {} files", candidates.len());
    Ok(())
}

async fn remove_log(
    transfer: &FileTransfer<'_, BlePeripheral, FsFileIndexStore>,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match transfer.delete_file(name).await? {
        DeleteOutcome::Deleted => {
            println!("{name} deleted");
            Ok(())
        }
        DeleteOutcome::Refused(status) => {
            Err(format!("device refused to delete {name} (status {status})").into())
        }
    }
}
