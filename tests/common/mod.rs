#![allow(dead_code)]

use async_trait::async_trait;
use netcheck::config::Config;
use netcheck::engine::http::HttpClient;
use netcheck::engine::{
    HttpResponse, MeshPeer, MeshStatus, NetEngine, PingSpec, PingStats, RecordType,
};
use netcheck::error::ProbeError;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const GATEWAY: &str = "192.168.1.1";
pub const SYSTEM_NS: &str = "192.168.1.53";

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("test address")
}

pub fn replies(received: u32) -> PingStats {
    PingStats {
        transmitted: 3,
        received,
        min: Duration::from_micros(1_400),
        avg: Duration::from_micros(2_600),
        max: Duration::from_micros(4_000),
    }
}

pub fn ok_http(status: u16, body: &str) -> Result<HttpResponse, ProbeError> {
    Ok(HttpResponse {
        status,
        body: body.to_string(),
    })
}

pub fn refused() -> ProbeError {
    ProbeError::transport("connection refused")
}

pub fn exit_peer(hostname: &str, active: bool, relay: Option<&str>, addr: Option<&str>) -> MeshPeer {
    MeshPeer {
        hostname: hostname.to_string(),
        exit_node: true,
        active,
        relay: relay.map(str::to_string),
        direct_addr: addr.map(str::to_string),
    }
}

/// Scripted engine. Anything not scripted per host or URL falls back to the
/// `*_default` outcome.
pub struct FakeEngine {
    pub gateway: Result<IpAddr, ProbeError>,
    pub nameserver: Result<IpAddr, ProbeError>,
    pub proxy: Result<String, ProbeError>,
    pub ping: HashMap<IpAddr, Result<PingStats, ProbeError>>,
    pub ping_default: Result<PingStats, ProbeError>,
    pub ping_delay: Duration,
    pub dns: HashMap<IpAddr, Result<Vec<IpAddr>, ProbeError>>,
    pub dns_default: Result<Vec<IpAddr>, ProbeError>,
    pub dns_delay: Duration,
    pub lookup: Result<Vec<IpAddr>, ProbeError>,
    pub lookup_delay: Duration,
    pub http: HashMap<String, Result<HttpResponse, ProbeError>>,
    pub http_delay: HashMap<String, Duration>,
    pub mesh: Result<MeshStatus, ProbeError>,
    pub panic_in_mesh: bool,
    /// When set, `http_get` goes over the wire instead of the script.
    pub real_http: Option<HttpClient>,
}

impl FakeEngine {
    /// Everything answers the way a healthy network would.
    pub fn healthy() -> Self {
        let cfg = Config::default();
        let mut http = HashMap::new();
        http.insert(cfg.captive.url.clone(), ok_http(204, ""));
        http.insert(cfg.edge.url.clone(), ok_http(200, "fl=12f\nh=www.cloudflare.com\nloc=NL\ncolo=AMS\n"));

        Self {
            gateway: Ok(ip(GATEWAY)),
            nameserver: Ok(ip(SYSTEM_NS)),
            proxy: Err(ProbeError::unavailable("no proxy detected")),
            ping: HashMap::new(),
            ping_default: Ok(replies(3)),
            ping_delay: Duration::ZERO,
            dns: HashMap::new(),
            dns_default: Ok(vec![ip("17.253.144.10")]),
            dns_delay: Duration::ZERO,
            lookup: Err(ProbeError::transport("Name or service not known")),
            lookup_delay: Duration::ZERO,
            http,
            http_delay: HashMap::new(),
            mesh: Ok(MeshStatus {
                self_online: true,
                backend_state: "Running".into(),
                peers: vec![],
            }),
            panic_in_mesh: false,
            real_http: None,
        }
    }

    /// Nothing works: no route, no resolver config, every host silent.
    pub fn dead() -> Self {
        Self {
            gateway: Err(ProbeError::unavailable("no default route in routing table")),
            nameserver: Err(ProbeError::unavailable("no nameserver entry")),
            proxy: Err(ProbeError::unavailable("no proxy detected")),
            ping: HashMap::new(),
            ping_default: Ok(replies(0)),
            ping_delay: Duration::ZERO,
            dns: HashMap::new(),
            dns_default: Err(ProbeError::transport("query timed out")),
            dns_delay: Duration::ZERO,
            lookup: Err(ProbeError::transport("Name or service not known")),
            lookup_delay: Duration::ZERO,
            http: HashMap::new(),
            http_delay: HashMap::new(),
            mesh: Err(ProbeError::transport("failed to connect to local agent")),
            panic_in_mesh: false,
            real_http: None,
        }
    }
}

#[async_trait]
impl NetEngine for FakeEngine {
    async fn default_gateway(&self) -> Result<IpAddr, ProbeError> {
        self.gateway.clone()
    }

    async fn system_nameserver(&self) -> Result<IpAddr, ProbeError> {
        self.nameserver.clone()
    }

    fn system_proxy(&self) -> Result<String, ProbeError> {
        self.proxy.clone()
    }

    async fn ping(&self, host: IpAddr, _spec: &PingSpec) -> Result<PingStats, ProbeError> {
        if !self.ping_delay.is_zero() {
            tokio::time::sleep(self.ping_delay).await;
        }
        self.ping.get(&host).cloned().unwrap_or_else(|| self.ping_default.clone())
    }

    async fn query(
        &self,
        server: SocketAddr,
        _record: RecordType,
        _name: &str,
        _timeout: Duration,
    ) -> Result<Vec<IpAddr>, ProbeError> {
        if !self.dns_delay.is_zero() {
            tokio::time::sleep(self.dns_delay).await;
        }
        self.dns
            .get(&server.ip())
            .cloned()
            .unwrap_or_else(|| self.dns_default.clone())
    }

    async fn lookup_host(&self, _name: &str) -> Result<Vec<IpAddr>, ProbeError> {
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        self.lookup.clone()
    }

    async fn http_get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProbeError> {
        if let Some(delay) = self.http_delay.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(client) = &self.real_http {
            return client.get(url, timeout).await;
        }
        self.http.get(url).cloned().unwrap_or_else(|| Err(refused()))
    }

    async fn mesh_status(&self, _timeout: Duration) -> Result<MeshStatus, ProbeError> {
        if self.panic_in_mesh {
            panic!("mesh agent blew up");
        }
        self.mesh.clone()
    }
}
