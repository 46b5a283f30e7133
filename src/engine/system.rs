use super::{
    dns::HickoryDns, http::HttpClient, ping::SystemPing, tailscale::TailscaleCli, types::*,
    NetEngine,
};
use crate::{config::Config, error::ProbeError};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Proxy variables in the order they are consulted.
pub const PROXY_ENV_VARS: [&str; 3] = ["all_proxy", "http_proxy", "https_proxy"];

static NAMESERVER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^nameserver[ \t]+(\S+)").expect("Invalid nameserver regex"));

static ROUTE_GATEWAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*gateway:\s*(\S+)").expect("Invalid gateway regex"));

const RTF_UP: u32 = 0x0001;
const RTF_GATEWAY: u32 = 0x0002;

/// Talks to the real OS: routing table, resolv.conf, env, `ping`, DNS,
/// HTTP and the tailscale CLI.
pub struct SystemEngine {
    resolv_conf: PathBuf,
    http: HttpClient,
    dns: HickoryDns,
    ping: SystemPing,
    mesh: TailscaleCli,
}

impl SystemEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            resolv_conf: PathBuf::from(&cfg.nameserver.resolv_conf_path),
            http: HttpClient::new()?,
            dns: HickoryDns,
            ping: SystemPing::default(),
            mesh: TailscaleCli::new(&cfg.mesh.command),
        })
    }
}

#[async_trait]
impl NetEngine for SystemEngine {
    async fn default_gateway(&self) -> Result<IpAddr, ProbeError> {
        discover_gateway().await
    }

    async fn system_nameserver(&self) -> Result<IpAddr, ProbeError> {
        let raw = tokio::fs::read_to_string(&self.resolv_conf).await?;
        parse_resolv_conf(&raw)
    }

    fn system_proxy(&self) -> Result<String, ProbeError> {
        proxy_from_env(|k| std::env::var(k).ok())
    }

    async fn ping(&self, host: IpAddr, spec: &PingSpec) -> Result<PingStats, ProbeError> {
        self.ping.run(host, spec).await
    }

    async fn query(
        &self,
        server: SocketAddr,
        record: RecordType,
        name: &str,
        timeout: Duration,
    ) -> Result<Vec<IpAddr>, ProbeError> {
        self.dns.query(server, record, name, timeout).await
    }

    async fn lookup_host(&self, name: &str) -> Result<Vec<IpAddr>, ProbeError> {
        let name = name.trim_end_matches('.');
        let addrs = tokio::net::lookup_host((name, 0u16)).await?;
        Ok(addrs.map(|a| a.ip()).collect())
    }

    async fn http_get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProbeError> {
        self.http.get(url, timeout).await
    }

    async fn mesh_status(&self, timeout: Duration) -> Result<MeshStatus, ProbeError> {
        self.mesh.status(timeout).await
    }
}

pub fn proxy_from_env(get: impl Fn(&str) -> Option<String>) -> Result<String, ProbeError> {
    PROXY_ENV_VARS
        .iter()
        .filter_map(|k| get(k))
        .find(|v| !v.trim().is_empty())
        .ok_or_else(|| ProbeError::unavailable("no proxy detected"))
}

pub fn parse_resolv_conf(raw: &str) -> Result<IpAddr, ProbeError> {
    let caps = NAMESERVER_LINE
        .captures(raw)
        .ok_or_else(|| ProbeError::unavailable("no nameserver entry in resolver configuration"))?;
    // Drop an IPv6 zone suffix such as `%eth0`.
    let addr = caps[1].split('%').next().unwrap_or_default();
    addr.parse()
        .map_err(|_| ProbeError::unavailable(format!("invalid nameserver address: {}", &caps[1])))
}

#[cfg(target_os = "linux")]
async fn discover_gateway() -> Result<IpAddr, ProbeError> {
    let raw = tokio::fs::read_to_string("/proc/net/route").await?;
    parse_proc_net_route(&raw).map(IpAddr::V4)
}

#[cfg(any(target_os = "macos", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
async fn discover_gateway() -> Result<IpAddr, ProbeError> {
    let out = tokio::process::Command::new("route")
        .args(["-n", "get", "default"])
        .kill_on_drop(true)
        .output()
        .await?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    debug!("route -n get default: {}", stdout.trim());
    parse_route_get(&stdout)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
)))]
async fn discover_gateway() -> Result<IpAddr, ProbeError> {
    Err(ProbeError::unavailable(
        "default route discovery is not supported on this OS",
    ))
}

/// Picks the default-destination entry with the gateway flag set. Addresses
/// in the table are little-endian hex.
pub fn parse_proc_net_route(raw: &str) -> Result<Ipv4Addr, ProbeError> {
    for line in raw.lines().skip(1) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < 8 {
            continue;
        }
        let (dest, gw, flags, mask) = (cols[1], cols[2], cols[3], cols[7]);
        let flags = u32::from_str_radix(flags, 16).unwrap_or(0);
        if dest != "00000000" || mask != "00000000" {
            continue;
        }
        if flags & RTF_UP == 0 || flags & RTF_GATEWAY == 0 {
            continue;
        }
        let gw = u32::from_str_radix(gw, 16)
            .map_err(|_| ProbeError::protocol(format!("bad gateway field: {gw}")))?;
        debug!("default route via {} on {}", Ipv4Addr::from(gw.to_le_bytes()), cols[0]);
        return Ok(Ipv4Addr::from(gw.to_le_bytes()));
    }
    Err(ProbeError::unavailable("no default route in routing table"))
}

pub fn parse_route_get(stdout: &str) -> Result<IpAddr, ProbeError> {
    let caps = ROUTE_GATEWAY
        .captures(stdout)
        .ok_or_else(|| ProbeError::unavailable("no default route in routing table"))?;
    caps[1]
        .parse()
        .map_err(|_| ProbeError::protocol(format!("gateway is not an address: {}", &caps[1])))
}
