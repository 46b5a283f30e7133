pub mod dns;
pub mod http;
pub mod ping;
pub mod system;
pub mod tailscale;
pub mod types;

use crate::error::ProbeError;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub use system::SystemEngine;
pub use types::{HttpResponse, MeshPeer, MeshStatus, PingSpec, PingStats, RecordType};

/// Network primitives the probes are built on. Every call is bounded by the
/// timeout it is given or by the implementation's own limit.
#[async_trait]
pub trait NetEngine: Send + Sync {
    async fn default_gateway(&self) -> Result<IpAddr, ProbeError>;
    async fn system_nameserver(&self) -> Result<IpAddr, ProbeError>;
    /// Proxy URL from the environment, `all_proxy` > `http_proxy` > `https_proxy`.
    fn system_proxy(&self) -> Result<String, ProbeError>;
    async fn ping(&self, host: IpAddr, spec: &PingSpec) -> Result<PingStats, ProbeError>;
    async fn query(
        &self,
        server: SocketAddr,
        record: RecordType,
        name: &str,
        timeout: Duration,
    ) -> Result<Vec<IpAddr>, ProbeError>;
    /// Resolve through the system resolver rather than a chosen server.
    async fn lookup_host(&self, name: &str) -> Result<Vec<IpAddr>, ProbeError>;
    async fn http_get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ProbeError>;
    async fn mesh_status(&self, timeout: Duration) -> Result<MeshStatus, ProbeError>;
}
