//! Concurrent loopback runs

use crate::config::SimulateArgs;
use crate::loopback::{LoopbackNetwork, LoopbackStats, ECHO_PREFIX};
use anyhow::Context;
use onionreq::{request_fingerprint, EncryptionType, ServerEndpoint};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a simulation
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub requests: usize,
    pub succeeded: usize,
    pub stats: LoopbackStats,
}

/// Build `args.requests` requests on blocking tasks, dispatch each through
/// one shared loopback network, and check every echoed response.
pub async fn run(args: &SimulateArgs) -> anyhow::Result<SimulationReport> {
    let server = args
        .server_host
        .as_ref()
        .map(|host| ServerEndpoint::new(host.clone(), "/oxen/v4/lsrpc", "https", 443));
    let network = Arc::new(LoopbackNetwork::generate(args.hops, server)?);
    info!(
        hops = args.hops,
        encryption = %args.encryption,
        destination = network.destination().kind(),
        "simulating {} request(s)",
        args.requests
    );

    let mut tasks = Vec::with_capacity(args.requests);
    for i in 0..args.requests {
        let network = Arc::clone(&network);
        let encryption = args.encryption;
        let payload = format!("{}#{i}", args.payload).into_bytes();
        tasks.push(tokio::task::spawn_blocking(move || {
            round_trip(&network, encryption, &payload)
        }));
    }

    let mut succeeded = 0;
    for (i, task) in tasks.into_iter().enumerate() {
        task.await
            .context("simulation task panicked")?
            .with_context(|| format!("request {i}"))?;
        succeeded += 1;
    }

    Ok(SimulationReport {
        requests: args.requests,
        succeeded,
        stats: network.stats(),
    })
}

fn round_trip(
    network: &LoopbackNetwork,
    encryption: EncryptionType,
    payload: &[u8],
) -> anyhow::Result<()> {
    let mut builder = network.builder(encryption)?;
    let request = builder.build(payload)?;
    debug!(request = %request_fingerprint(&request), len = request.len(), "dispatching");

    let response = network.dispatch(encryption, &request)?;
    let plaintext = builder.decrypt(&response)?;

    let mut expected = ECHO_PREFIX.to_vec();
    expected.extend_from_slice(payload);
    if plaintext != expected {
        anyhow::bail!("echo mismatch");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(hops: usize, requests: usize, server_host: Option<&str>) -> SimulateArgs {
        SimulateArgs {
            hops,
            encryption: EncryptionType::AesGcm,
            requests,
            payload: "sim".into(),
            server_host: server_host.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_concurrent_simulation() {
        let report = run(&args(4, 16, None)).await.unwrap();
        assert_eq!(report.succeeded, 16);
        assert_eq!(report.stats.requests_delivered, 16);
        assert_eq!(report.stats.layers_processed, 64);
        assert_eq!(report.stats.requests_dropped, 0);
    }

    #[tokio::test]
    async fn test_server_simulation() {
        let report = run(&args(1, 2, Some("open.example"))).await.unwrap();
        assert_eq!(report.succeeded, 2);
    }
}
