use super::types::{MeshPeer, MeshStatus};
use crate::error::ProbeError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Reads agent state through `tailscale status --json`.
#[derive(Debug, Clone)]
pub struct TailscaleCli {
    exe: String,
}

impl TailscaleCli {
    pub fn new(exe: &str) -> Self {
        Self { exe: exe.to_string() }
    }

    pub async fn status(&self, timeout: Duration) -> Result<MeshStatus, ProbeError> {
        let mut cmd = Command::new(&self.exe);
        cmd.args(["status", "--json"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("{} status --json timeout={:?}", self.exe, timeout);
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| ProbeError::transport(format!("{} status timed out", self.exe)))??;

        if output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::transport(format!(
                "{} status failed ({}): {}",
                self.exe,
                output.status,
                stderr.trim()
            )));
        }
        parse_status_json(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusJson {
    #[serde(default)]
    backend_state: String,
    #[serde(rename = "Self", default)]
    self_node: Option<PeerJson>,
    #[serde(default)]
    peer: Option<BTreeMap<String, PeerJson>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PeerJson {
    host_name: String,
    online: bool,
    exit_node: bool,
    active: bool,
    relay: String,
    cur_addr: String,
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

pub fn parse_status_json(raw: &[u8]) -> Result<MeshStatus, ProbeError> {
    let status: StatusJson = serde_json::from_slice(raw)
        .map_err(|e| ProbeError::protocol(format!("decoding agent status: {e}")))?;

    let peers = status
        .peer
        .unwrap_or_default()
        .into_values()
        .map(|p| MeshPeer {
            hostname: p.host_name,
            exit_node: p.exit_node,
            active: p.active,
            relay: non_empty(p.relay),
            direct_addr: non_empty(p.cur_addr),
        })
        .collect();

    Ok(MeshStatus {
        self_online: status.self_node.map(|s| s.online).unwrap_or(false),
        backend_state: status.backend_state,
        peers,
    })
}
