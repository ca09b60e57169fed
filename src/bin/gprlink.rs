//! gprlink - stream radar traces as JSON lines.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use gprlink::{AcquisitionConfig, ControlClient, Endpoint, GprLink, HttpTransport};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "gprlink", version, about = "Ground-penetrating radar acquisition")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Radar address, overriding the configuration
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream records to stdout until Ctrl-C or end of stream (default)
    Run,
    /// Query the device descriptors without acquiring
    Probe,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AcquisitionConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AcquisitionConfig::default(),
    };
    if let Some(host) = cli.host {
        config.device.host = host;
    }
    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Probe => probe(config).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(config: AcquisitionConfig) -> Result<()> {
    let mut connection = match GprLink::connect(config).await {
        Ok(connection) => connection,
        Err(err) => {
            error!(error = %err, "acquisition setup failed");
            for suggestion in err.recovery_suggestions() {
                info!("  - {}", suggestion);
            }
            return Err(err.into());
        }
    };
    let mut records = connection.records().context("record stream unavailable")?;

    let stdout = std::io::stdout();
    loop {
        tokio::select! {
            record = records.next() => {
                let Some(record) = record else {
                    info!("record stream ended");
                    break;
                };
                let mut out = stdout.lock();
                serde_json::to_writer(&mut out, &record).context("failed to encode record")?;
                writeln!(out).context("failed to write record")?;
                out.flush().context("failed to flush stdout")?;
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    error!(error = %err, "failed to listen for shutdown signal");
                }
                info!("interrupted, stopping acquisition");
                break;
            }
        }
    }
    drop(records);

    let report = connection.stop().await?;
    info!(
        state = %report.final_state,
        frames = report.frames_decoded,
        records = report.records_emitted,
        "session finished"
    );
    if !report.teardown.is_clean() {
        warn!(teardown = ?report.teardown, "teardown incomplete, check the radar is powered off");
    }
    Ok(())
}

async fn probe(config: AcquisitionConfig) -> Result<()> {
    let client = ControlClient::new(HttpTransport::new(&config.device)?);

    for endpoint in [Endpoint::Root, Endpoint::Version, Endpoint::NicSystemInformation] {
        let response = client
            .query(endpoint)
            .await
            .with_context(|| format!("querying {}", endpoint.label()))?;
        println!("{}: {}", endpoint.label(), response.message());
        println!("{}", serde_json::to_string_pretty(&response.data)?);
    }
    Ok(())
}
