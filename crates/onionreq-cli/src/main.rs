//! onionreq - build onion requests from the command line
//!
//! `build` reads a path file and prints the request as hex. `simulate`
//! generates relays in-process and checks that responses come back intact.

use clap::Parser;
use onionreq::request_fingerprint;
use onionreq_cli::config::{BuildArgs, Command, Config, LogFormat, SimulateArgs};
use onionreq_cli::path_file::PathFile;
use onionreq_cli::simulate;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},onionreq_cli=info", config.log_directive())));
    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(std::io::stderr))),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e:#}");
        return ExitCode::FAILURE;
    }

    let result = match &config.command {
        Command::Build(args) => build(args),
        Command::Simulate(args) => run_simulation(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn build(args: &BuildArgs) -> anyhow::Result<()> {
    let path = PathFile::load(&args.path)?;
    let encryption = path.encryption(args.encryption)?;
    let payload = args.payload()?;

    let mut builder = path.builder(encryption)?;
    let request = builder.build(&payload)?;
    info!(
        hops = builder.hop_count(),
        encryption = %encryption,
        len = request.len(),
        fingerprint = %request_fingerprint(&request),
        "Built request"
    );

    println!("{}", hex::encode(&request));
    Ok(())
}

async fn run_simulation(args: &SimulateArgs) -> anyhow::Result<()> {
    let report = simulate::run(args).await?;
    info!(
        "Simulation: {}/{} responses verified, {} layers processed, {} dropped",
        report.succeeded,
        report.requests,
        report.stats.layers_processed,
        report.stats.requests_dropped
    );
    Ok(())
}
