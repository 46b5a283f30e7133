use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingSpec {
    pub count: u32,
    pub interval: Duration,
    pub timeout: Duration,
}

/// Outcome of one ping run. `received == 0` is a valid answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingStats {
    pub transmitted: u32,
    pub received: u32,
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,
}

/// Only address queries are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshStatus {
    pub self_online: bool,
    pub backend_state: String,
    pub peers: Vec<MeshPeer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeshPeer {
    pub hostname: String,
    pub exit_node: bool,
    pub active: bool,
    pub relay: Option<String>,
    pub direct_addr: Option<String>,
}
