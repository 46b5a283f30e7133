use super::types::RecordType;
use crate::error::ProbeError;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::RecordType as WireRecordType;
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::debug;

/// Sends one query to one explicit server, bypassing the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HickoryDns;

impl HickoryDns {
    pub async fn query(
        &self,
        server: SocketAddr,
        record: RecordType,
        name: &str,
        timeout: Duration,
    ) -> Result<Vec<IpAddr>, ProbeError> {
        // UDP only; a TCP fallback would double the wait on a silent server.
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(server, Protocol::Udp));

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        let resolver = TokioAsyncResolver::tokio(config, opts);
        let wire = match record {
            RecordType::A => WireRecordType::A,
        };

        debug!("dns query {} {:?} @{}", name, record, server);
        match tokio::time::timeout(timeout, resolver.lookup(name, wire)).await {
            Ok(Ok(lookup)) => Ok(lookup.iter().filter_map(|r| r.ip_addr()).collect()),
            Ok(Err(err)) => classify(server, err),
            Err(_) => Err(ProbeError::transport(format!("query to {server} timed out"))),
        }
    }
}

fn classify(server: SocketAddr, err: ResolveError) -> Result<Vec<IpAddr>, ProbeError> {
    match err.kind() {
        // The server answered; an empty answer still proves it is serving.
        ResolveErrorKind::NoRecordsFound { .. } => Ok(Vec::new()),
        ResolveErrorKind::Timeout => Err(ProbeError::transport(format!(
            "query to {server} timed out"
        ))),
        _ => Err(ProbeError::transport(format!("query to {server} failed: {err}"))),
    }
}
