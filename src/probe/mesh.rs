use super::ProbeResult;
use crate::{
    config::Config,
    engine::{MeshPeer, MeshStatus, NetEngine},
};

pub const NAME: &str = "vpn-mesh";

/// First peer flagged as exit node. Peer order is unspecified, so this is
/// only meaningful when at most one peer carries the flag.
pub fn find_exit_node(peers: &[MeshPeer]) -> Option<&MeshPeer> {
    peers.iter().find(|p| p.exit_node)
}

pub async fn get_mesh_status(cfg: &Config, engine: &dyn NetEngine) -> ProbeResult {
    match engine.mesh_status(cfg.mesh.status_timeout()).await {
        Ok(status) => classify(&status),
        Err(err) => ProbeResult::indeterminate(NAME, format!("could not determine agent status: {err}")),
    }
}

pub fn classify(status: &MeshStatus) -> ProbeResult {
    if !status.self_online {
        return ProbeResult::degraded(
            NAME,
            format!("offline: BackendState={}", status.backend_state),
        );
    }

    let Some(exit) = find_exit_node(&status.peers) else {
        return ProbeResult::reachable(NAME, "no exit node in use");
    };

    let host = &exit.hostname;
    if !exit.active {
        return ProbeResult::degraded(NAME, format!("exit node \"{host}\" inactive"));
    }

    match (&exit.direct_addr, &exit.relay) {
        (Some(addr), _) => {
            ProbeResult::reachable(NAME, format!("exit node \"{host}\" via direct path {addr}"))
        }
        (None, Some(relay)) => {
            ProbeResult::degraded(NAME, format!("exit node \"{host}\" via relay {relay}"))
        }
        (None, None) => {
            ProbeResult::indeterminate(NAME, format!("exit node \"{host}\" (unknown connection)"))
        }
    }
}
