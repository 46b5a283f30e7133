use super::ProbeResult;
use crate::{config::Config, engine::NetEngine};
use regex::Regex;
use std::sync::LazyLock;

pub const NAME: &str = "edge-location";

static LOC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^loc=([^\r\n]+)\r?$").expect("Invalid loc regex"));

/// The `loc=<token>` line of a trace page.
pub fn parse_location(body: &str) -> Option<String> {
    LOC_LINE.captures(body).map(|c| c[1].trim().to_string())
}

pub async fn get_edge_location(cfg: &Config, engine: &dyn NetEngine) -> ProbeResult {
    let resp = match engine.http_get(&cfg.edge.url, cfg.edge.timeout()).await {
        Ok(resp) => resp,
        Err(err) => {
            return ProbeResult::unreachable(NAME, format!("request to {} failed: {err}", cfg.edge.url));
        }
    };

    match parse_location(&resp.body) {
        Some(loc) => ProbeResult::reachable(NAME, loc),
        None => ProbeResult::indeterminate(
            NAME,
            format!("could not determine edge location (HTTP {})", resp.status),
        ),
    }
}
