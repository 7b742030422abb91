//! Vendor-neutral reachability probe.
//!
//! Opens a TCP connection to the target's listener and reports how long it
//! took. The address comes from the connection profile: either `address`
//! (`host:port`) or the authority of a `dsn` URL.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use url::Url;

use crate::health::{MetricValue, ProbeResult};
use crate::probe::{Probe, ProbeFailure};
use crate::registry::Target;

/// TCP connect probe.
#[derive(Debug, Clone, Default)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve `host:port` from a target's connection profile.
pub fn resolve_address(target: &Target) -> Result<String, ProbeFailure> {
    let profile = &target.connection_profile;
    if let Some(address) = profile.get("address") {
        return Ok(address.to_string());
    }

    let dsn = profile.get("dsn").ok_or_else(|| {
        ProbeFailure::Other(format!("target '{}' has no address or dsn", target.id))
    })?;
    let url = Url::parse(dsn).map_err(|e| ProbeFailure::Other(format!("invalid dsn: {}", e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| ProbeFailure::Other("dsn has no host".to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ProbeFailure::Other("dsn has no port".to_string()))?;
    Ok(format!("{}:{}", host, port))
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self, target: &Target, timeout: Duration) -> Result<ProbeResult, ProbeFailure> {
        let address = resolve_address(target)?;
        let start = Instant::now();

        match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_stream)) => {
                let elapsed = start.elapsed();
                Ok(ProbeResult::reachable(elapsed.as_millis() as u64)
                    .with_metric("connect_ms", MetricValue::Number(elapsed.as_secs_f64() * 1000.0)))
            }
            Ok(Err(e)) => Err(ProbeFailure::Unreachable(format!("{}: {}", address, e))),
            Err(_) => Ok(ProbeResult::unreachable(
                format!("connect to {} timed out after {}ms", address, timeout.as_millis()),
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}
