use super::ProbeResult;
use crate::{config::Config, engine::NetEngine};

pub const NAME: &str = "captive-portal";

/// One unauthenticated GET; only the expected empty "no content" answer counts.
pub async fn check_captive_portal(cfg: &Config, engine: &dyn NetEngine) -> ProbeResult {
    let expected = cfg.captive.expected_status;
    match engine.http_get(&cfg.captive.url, cfg.captive.timeout()).await {
        Ok(resp) if resp.status == expected && resp.body.is_empty() => {
            ProbeResult::reachable(NAME, format!("no captive portal (HTTP {})", resp.status))
        }
        Ok(resp) if resp.status == expected => ProbeResult::unreachable(
            NAME,
            format!(
                "HTTP {} with unexpected {}-byte body; possible captive portal",
                resp.status,
                resp.body.len()
            ),
        ),
        Ok(resp) => ProbeResult::unreachable(
            NAME,
            format!(
                "expected HTTP {expected}, got HTTP {}; possible captive portal",
                resp.status
            ),
        ),
        Err(err) => ProbeResult::unreachable(NAME, format!("captive portal check failed: {err}")),
    }
}
