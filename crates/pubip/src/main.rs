// # pubip
//
// Determines the host's public IPv4 and IPv6 addresses by running the
// configured shell commands, publishes them to an MQTT broker together with
// Home-Assistant-style discovery messages, and prints one summary line.
//
// Meant to be run periodically (cron, systemd timer). Each run is
// independent: nothing is cached between runs.
//
// ## Usage
//
// ```bash
// pubip /etc/pubip.ini
// # 24/03/07;09:05;203.0.113.7;2001:db8::7
// ```
//
// ## Output
//
// - stdout: exactly one line `yy/mm/dd;HH:MM;<ipv4>;<ipv6>`
// - stderr: configuration errors, publish failures, and logs
//
// ## Environment
//
// - `PUBIP_LOG_LEVEL`: trace, debug, info, warn (default), error

use anyhow::{Context, Result};
use clap::Parser;
use pubip_core::config::{LOG_LEVEL_ENV, parse_log_level};
use pubip_core::message::AddressFamily;
use pubip_core::{Pipeline, PubIpConfig};
use pubip_ip_shell::ShellAddressSource;
use pubip_publisher_mqtt::MqttPublisher;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Normal completion, including caught publish failures
/// - 1: Runtime error (resolver could not run, runtime failure)
/// - 255: Configuration error (-1 on platforms with signed codes)
#[derive(Debug, Clone, Copy)]
enum PubIpExitCode {
    /// Normal completion
    Success = 0,
    /// Runtime error (unexpected failure)
    RuntimeError = 1,
    /// Configuration error
    ConfigError = 255,
}

impl From<PubIpExitCode> for ExitCode {
    fn from(code: PubIpExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pubip",
    version,
    about = "Run shell command to determine the public ip address by contacting a public DNS server and push the results via mqtt."
)]
struct Cli {
    /// Name of the ini file
    inifile: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration errors abort before anything else happens
    let config = match PubIpConfig::load(&cli.inifile) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return PubIpExitCode::ConfigError.into();
        }
    };

    let log_level = match parse_log_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            return PubIpExitCode::ConfigError.into();
        }
    };

    // stdout is reserved for the summary line
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PubIpExitCode::RuntimeError.into();
    }

    debug!(config = ?config, "Configuration loaded");

    // Everything runs on one thread, strictly in sequence
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PubIpExitCode::RuntimeError.into();
        }
    };

    match rt.block_on(run(config)) {
        Ok(summary) => {
            println!("{}", summary);
            PubIpExitCode::Success.into()
        }
        Err(e) => {
            error!("{:#}", e);
            PubIpExitCode::RuntimeError.into()
        }
    }
}

/// Resolve, publish, and return the summary line
async fn run(config: PubIpConfig) -> Result<String> {
    let ipv4 = ShellAddressSource::new(AddressFamily::V4, &config.ipv4.shell);
    let ipv6 = ShellAddressSource::new(AddressFamily::V6, &config.ipv6.shell);
    let publisher = MqttPublisher::new(&config.mqtt);

    let pipeline = Pipeline::new(Box::new(ipv4), Box::new(ipv6), Box::new(publisher), config);

    let report = pipeline
        .run()
        .await
        .context("failed to resolve public addresses")?;

    Ok(report.summary_line(&chrono::Local::now()))
}
