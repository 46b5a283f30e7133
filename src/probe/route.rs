use super::{LatencyStats, ProbeResult};
use crate::{
    config::Config,
    engine::{NetEngine, PingSpec},
};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

pub const NAME: &str = "default-route";

/// The route verdict plus what later probes need from it.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub gateway: Option<IpAddr>,
    pub latency: Option<LatencyStats>,
    pub result: ProbeResult,
}

pub fn ping_spec(cfg: &Config) -> PingSpec {
    PingSpec {
        count: cfg.route.ping_count,
        interval: Duration::from_millis(cfg.route.ping_interval_ms),
        timeout: Duration::from_millis(cfg.route.ping_timeout_ms),
    }
}

/// `gateway_tx`, when given, receives the gateway as soon as it is known,
/// before the ICMP measurement starts.
pub async fn discover_default_route(
    cfg: &Config,
    engine: &dyn NetEngine,
    gateway_tx: Option<oneshot::Sender<Option<IpAddr>>>,
) -> RouteOutcome {
    let discovered = engine.default_gateway().await;
    if let Some(tx) = gateway_tx {
        let _ = tx.send(discovered.as_ref().ok().copied());
    }

    let gateway = match discovered {
        Ok(gw) => gw,
        Err(err) => {
            return RouteOutcome {
                gateway: None,
                latency: None,
                result: ProbeResult::indeterminate(
                    NAME,
                    format!("error reading default route: {err}"),
                ),
            };
        }
    };

    debug!("default gateway {gateway}");
    let result = match engine.ping(gateway, &ping_spec(cfg)).await {
        Ok(stats) if stats.received > 0 => {
            let latency = LatencyStats::from(&stats);
            return RouteOutcome {
                gateway: Some(gateway),
                latency: Some(latency),
                result: ProbeResult::reachable(
                    NAME,
                    format!("{gateway} (reachable via ICMP, {latency})"),
                )
                .with_latency(Some(latency)),
            };
        }
        Ok(stats) => ProbeResult::unreachable(
            NAME,
            format!(
                "{gateway} (unreachable via ICMP, 0/{} replies)",
                stats.transmitted
            ),
        ),
        Err(err) => ProbeResult::indeterminate(
            NAME,
            format!("{gateway} (could not measure ICMP: {err})"),
        ),
    };

    RouteOutcome {
        gateway: Some(gateway),
        latency: None,
        result,
    }
}
