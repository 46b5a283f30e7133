use super::{LatencyStats, ProbeResult, Status};
use crate::{
    config::Config,
    engine::{NetEngine, PingSpec, RecordType},
    error::ProbeError,
};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_NAME: &str = "default-nameserver";

pub fn public_name(addr: &str) -> String {
    format!("nameserver:{addr}")
}

fn ping_spec(cfg: &Config) -> PingSpec {
    PingSpec {
        count: cfg.nameserver.ping_count,
        interval: Duration::from_millis(cfg.nameserver.ping_interval_ms),
        timeout: Duration::from_millis(cfg.nameserver.ping_timeout_ms),
    }
}

/// Checks the resolver from the system configuration. A missing or unreadable
/// configuration yields one `Indeterminate` result.
pub async fn check_default_nameserver(cfg: &Config, engine: &dyn NetEngine) -> ProbeResult {
    match engine.system_nameserver().await {
        Ok(addr) => check_nameserver(cfg, engine, DEFAULT_NAME, addr).await,
        Err(err) => ProbeResult::indeterminate(
            DEFAULT_NAME,
            format!("error reading default nameserver from system: {err}"),
        ),
    }
}

/// Checks one of the configured public resolvers.
pub async fn check_public_resolver(cfg: &Config, engine: &dyn NetEngine, raw: &str) -> ProbeResult {
    let name = public_name(raw);
    match raw.parse::<IpAddr>() {
        Ok(addr) => check_nameserver(cfg, engine, &name, addr).await,
        Err(_) => ProbeResult::indeterminate(name, format!("not an IP address: {raw}")),
    }
}

/// ICMP and DNS reachability are measured independently and then combined.
pub async fn check_nameserver(
    cfg: &Config,
    engine: &dyn NetEngine,
    name: &str,
    addr: IpAddr,
) -> ProbeResult {
    let server = SocketAddr::new(addr, cfg.nameserver.port);
    let spec = ping_spec(cfg);
    let (icmp, dns) = tokio::join!(
        icmp_latency(engine, addr, &spec),
        engine.query(
            server,
            RecordType::A,
            &cfg.nameserver.reference_domain,
            cfg.nameserver.query_timeout(),
        )
    );
    debug!("{name}: icmp={:?} dns_ok={}", icmp.as_ref().ok(), dns.is_ok());
    combine(name, addr, icmp, dns.map(|_| ()))
}

async fn icmp_latency(
    engine: &dyn NetEngine,
    addr: IpAddr,
    spec: &PingSpec,
) -> Result<LatencyStats, ProbeError> {
    let stats = engine.ping(addr, spec).await?;
    if stats.received == 0 {
        return Err(ProbeError::transport(format!(
            "0/{} echo replies",
            stats.transmitted
        )));
    }
    Ok(LatencyStats::from(&stats))
}

pub fn combine(
    name: &str,
    addr: IpAddr,
    icmp: Result<LatencyStats, ProbeError>,
    dns: Result<(), ProbeError>,
) -> ProbeResult {
    let icmp_part = match &icmp {
        Ok(latency) => format!("ICMP reachable {latency}"),
        Err(_) => "ICMP unreachable".to_string(),
    };
    let dns_part = match &dns {
        Ok(()) => "DNS reachable".to_string(),
        Err(err) => format!("DNS unreachable: {err}"),
    };
    let status = match (&icmp, &dns) {
        (Ok(_), Ok(())) => Status::Reachable,
        (Err(_), Ok(())) | (Ok(_), Err(_)) => Status::Degraded,
        (Err(_), Err(_)) => Status::Unreachable,
    };
    ProbeResult::new(name, status, format!("{addr} ({icmp_part}, {dns_part})"))
        .with_latency(icmp.ok())
}
