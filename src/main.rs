use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};

mod address;
mod ble;
mod config;
mod discovery;
mod dispatch;
mod error;
mod launcher;
#[cfg(test)]
mod mock;
mod protocol;
mod qualify;
mod report;
mod transport;

use crate::ble::BleTransport;
use crate::config::AppConfig;
use crate::discovery::{DiscoveryOptions, discover};
use crate::dispatch::dispatch;
use crate::launcher::Launcher;
use crate::protocol::Command;
use crate::report::Reporter;
use crate::transport::Transport;

/// Discover Valve LightHouse V2 base stations and switch them on or off.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-operation BLE timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Scan duration in seconds
    #[arg(long, global = true)]
    scan_seconds: Option<u64>,

    /// Print one JSON object per device instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    directive: Directive,
}

#[derive(Subcommand, Debug)]
enum Directive {
    /// Scan for base stations and check that they expose the power service
    Discover {
        /// Create desktop shortcuts switching the found base stations on and off
        #[arg(short = 'c', long)]
        create_shortcuts: bool,
    },
    /// Power base stations on
    On { addresses: Vec<String> },
    /// Put base stations in standby
    Off { addresses: Vec<String> },
    /// Switch base stations that are on to standby and all others on
    Toggle { addresses: Vec<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!(">> ERROR: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Warn)
        .filter_module(module_path!(), level)
        .parse_env("RUST_LOG")
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.timeout());
    let scan_duration = cli
        .scan_seconds
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.scan_duration());
    let reporter = Reporter::new(cli.json);
    debug!("Timeout {:?}, scan duration {:?}", timeout, scan_duration);

    let (command, candidates) = match cli.directive {
        Directive::Discover { create_shortcuts } => {
            let transport = open_transport(&config, scan_duration).await?;
            let options = DiscoveryOptions {
                name_prefix: config.name_prefix(),
                timeout,
            };
            reporter.discovery_start(create_shortcuts);
            let devices = discover(&transport, &options, |event| {
                reporter.discovery_event(event)
            })
            .await
            .context("scanning for BLE devices")?;
            reporter.discovery_summary(&devices);

            if create_shortcuts && !devices.is_empty() {
                let addresses: Vec<String> =
                    devices.into_iter().map(|device| device.address).collect();
                match Launcher::for_desktop().and_then(|launcher| launcher.create(&addresses)) {
                    Ok(created) => reporter.shortcuts(&created),
                    Err(err) => reporter.warning(&err.to_string()),
                }
            }
            return Ok(ExitCode::SUCCESS);
        }
        Directive::On { addresses } => (Command::On, addresses),
        Directive::Off { addresses } => (Command::Off, addresses),
        Directive::Toggle { addresses } => (Command::Toggle, addresses),
    };

    let config_ref = &config;
    let all_switched = switch(command, candidates, config_ref, reporter, timeout, move || {
        open_transport(config_ref, scan_duration)
    })
    .await?;

    if all_switched {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Validates the addresses a switch directive targets. Without arguments the
/// base stations listed in the configuration are used.
fn select_targets(
    arguments: Vec<String>,
    config: &AppConfig,
    reporter: &Reporter,
) -> Result<Vec<String>, error::Error> {
    let candidates = if arguments.is_empty() {
        config.device_addresses()
    } else {
        arguments
    };
    let partition = address::partition(&candidates);
    reporter.invalid_addresses(&partition.invalid);
    if partition.valid.is_empty() {
        return Err(error::Error::NoValidAddresses);
    }
    Ok(partition.valid)
}

/// Runs `command` against the selected targets. The transport is only opened
/// once at least one valid address is known. Returns whether every address
/// was switched.
async fn switch<T, F, Fut>(
    command: Command,
    arguments: Vec<String>,
    config: &AppConfig,
    reporter: Reporter,
    timeout: Duration,
    open: F,
) -> anyhow::Result<bool>
where
    T: Transport,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let targets = select_targets(arguments, config, &reporter)?;

    reporter.dispatch_start(command, &targets);
    let transport = open().await?;
    let results = dispatch(&transport, command, &targets, timeout).await;
    reporter.dispatch_results(command, &results);

    Ok(results.iter().all(|result| result.is_success()))
}

async fn open_transport(config: &AppConfig, scan_duration: Duration) -> anyhow::Result<BleTransport> {
    BleTransport::new(config.adapter(), scan_duration)
        .await
        .context("opening Bluetooth adapter")
}
