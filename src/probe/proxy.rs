use super::ProbeResult;
use crate::{config::Config, engine::NetEngine, error::ProbeError};
use ipnet::Ipv4Net;
use regex::Regex;
use serde::Deserialize;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;
use tracing::debug;

pub const NAME: &str = "proxy-detector";

static PROXY_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@/]*@)?(\[[^\]]+\]|[^:/?#\[\]]+)").expect("Invalid proxy host regex")
});

/// Root document of the proxy controller API. Either marker is positive
/// evidence; `hello` is checked first.
#[derive(Debug, Default, Deserialize)]
pub struct ApiRoot {
    #[serde(default)]
    pub hello: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiRoot {
    pub fn evidence(&self) -> Option<&'static str> {
        if self.hello.as_deref() == Some("clash") {
            return Some("hello=clash");
        }
        if self.message.as_deref() == Some("Unauthorized") {
            return Some("message=Unauthorized");
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub host: String,
    pub source: &'static str,
}

impl Candidate {
    fn api_url(&self, port: u16) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{port}", self.host)
        } else {
            format!("http://{}:{port}", self.host)
        }
    }
}

/// Host part of a proxy URL such as `http://user:pw@10.0.0.1:7890/`.
pub fn proxy_host(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url.split_once("://").map_or(url, |(_, r)| r);
    let caps = PROXY_HOST.captures(rest)?;
    let host = caps[1].trim_start_matches('[').trim_end_matches(']');
    (!host.is_empty()).then(|| host.to_string())
}

/// Env proxy first; the gateway is only awaited when the env yields nothing.
pub async fn resolve_candidate<F>(engine: &dyn NetEngine, gateway: F) -> Option<Candidate>
where
    F: Future<Output = Option<IpAddr>>,
{
    match engine.system_proxy() {
        Ok(url) => match proxy_host(&url) {
            Some(host) => {
                return Some(Candidate {
                    host,
                    source: "system proxy",
                });
            }
            None => debug!("ignoring unparseable proxy url {url}"),
        },
        Err(err) => debug!("no system proxy: {err}"),
    }
    gateway.await.map(|gw| Candidate {
        host: gw.to_string(),
        source: "default gateway",
    })
}

pub async fn detect_transparent_proxy<F>(
    cfg: &Config,
    engine: &dyn NetEngine,
    gateway: F,
) -> ProbeResult
where
    F: Future<Output = Option<IpAddr>>,
{
    let Some(candidate) = resolve_candidate(engine, gateway).await else {
        return ProbeResult::indeterminate(
            NAME,
            "no candidate address (no system proxy, no default gateway)",
        );
    };

    let url = candidate.api_url(cfg.proxy.api_port);
    let api_err = match probe_api(cfg, engine, &url).await {
        Ok(evidence) => {
            return ProbeResult::reachable(
                NAME,
                format!("proxy API at {url} via {} ({evidence})", candidate.source),
            );
        }
        Err(err) => err,
    };
    debug!("proxy API probe at {url} negative: {api_err}");

    if !cfg.proxy.fake_ip_heuristic {
        return ProbeResult::indeterminate(
            NAME,
            format!("API probe at {url} negative ({api_err}); fake-IP heuristic disabled"),
        );
    }

    match fake_ip_signal(cfg, engine).await {
        Ok(Some(addr)) => ProbeResult::reachable(
            NAME,
            format!(
                "{} resolved to fake-IP address {addr} (API probe at {url}: {api_err})",
                cfg.proxy.probe_domain
            ),
        ),
        Ok(None) if matches!(api_err, ProbeError::Protocol(_)) => ProbeResult::indeterminate(
            NAME,
            format!("unrecognized response from {url}: {api_err}"),
        ),
        Ok(None) => ProbeResult::unreachable(
            NAME,
            format!(
                "no transparent proxy at {} ({}): {api_err}; no fake-IP resolution",
                candidate.host, candidate.source
            ),
        ),
        Err(err) => ProbeResult::indeterminate(
            NAME,
            format!("API probe at {url} negative ({api_err}); fake-IP heuristic failed: {err}"),
        ),
    }
}

/// `Ok(evidence)` when the controller API answers with a known marker.
pub async fn probe_api(
    cfg: &Config,
    engine: &dyn NetEngine,
    url: &str,
) -> Result<&'static str, ProbeError> {
    let resp = engine.http_get(url, cfg.proxy.api_timeout()).await?;
    let root: ApiRoot = serde_json::from_str(&resp.body).map_err(|e| {
        ProbeError::protocol(format!("HTTP {} with non-JSON body: {e}", resp.status))
    })?;
    root.evidence()
        .ok_or_else(|| ProbeError::ambiguous(format!("HTTP {} without proxy markers", resp.status)))
}

/// Resolves a name that cannot exist; proxies running in fake-IP mode answer
/// it from their reserved block anyway. `Ok(None)` means no such answer; a
/// lookup that outlives `lookup_timeout_ms` is an error.
pub async fn fake_ip_signal(
    cfg: &Config,
    engine: &dyn NetEngine,
) -> Result<Option<Ipv4Addr>, ProbeError> {
    let range: Ipv4Net = cfg.proxy.fake_ip_range.parse().map_err(|_| {
        ProbeError::unavailable(format!("invalid fake_ip_range: {}", cfg.proxy.fake_ip_range))
    })?;

    let limit = cfg.proxy.lookup_timeout();
    let lookup = tokio::time::timeout(limit, engine.lookup_host(&cfg.proxy.probe_domain))
        .await
        .map_err(|_| {
            ProbeError::transport(format!(
                "lookup of {} timed out after {limit:?}",
                cfg.proxy.probe_domain
            ))
        })?;
    let addrs = match lookup {
        Ok(addrs) => addrs,
        Err(err) => {
            debug!("{} did not resolve: {err}", cfg.proxy.probe_domain);
            return Ok(None);
        }
    };

    let first_v4 = addrs.into_iter().find_map(|a| match a {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    });
    Ok(first_v4.filter(|a| range.contains(a)))
}
