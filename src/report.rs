use crate::{
    probe::{ProbeResult, Status},
    util::now_rfc3339,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Probe categories in report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Route,
    Nameserver,
    VpnMesh,
    RemoteResolvers,
    ProxyDetector,
    CaptivePortal,
    EdgeLocation,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Route,
        Category::Nameserver,
        Category::VpnMesh,
        Category::RemoteResolvers,
        Category::ProxyDetector,
        Category::CaptivePortal,
        Category::EdgeLocation,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub reachable: usize,
    pub degraded: usize,
    pub unreachable: usize,
    pub indeterminate: usize,
}

impl Summary {
    fn tally(results: &[ProbeResult]) -> Self {
        let mut s = Summary::default();
        for r in results {
            match r.status() {
                Status::Reachable => s.reachable += 1,
                Status::Degraded => s.degraded += 1,
                Status::Unreachable => s.unreachable += 1,
                Status::Indeterminate => s.indeterminate += 1,
            }
        }
        s
    }
}

/// Finalized, read-only set of results.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started: String,
    pub finished: String,
    pub summary: Summary,
    results: Vec<ProbeResult>,
}

impl Report {
    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.name() == name)
    }
}

/// Collects results as probes finish. Only the pipeline writes to it.
#[derive(Debug)]
pub struct ReportBuilder {
    started: String,
    entries: Vec<(Category, ProbeResult)>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            started: now_rfc3339(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, category: Category, result: ProbeResult) {
        self.entries.push((category, result));
    }

    /// Orders by category; the sort is stable, so a fanned-out group keeps
    /// its completion order.
    pub fn finish(mut self) -> Report {
        self.entries.sort_by_key(|(c, _)| *c);
        let results: Vec<ProbeResult> = self.entries.into_iter().map(|(_, r)| r).collect();
        Report {
            started: self.started,
            finished: now_rfc3339(),
            summary: Summary::tally(&results),
            results,
        }
    }
}

pub fn render_text<W: Write>(report: &Report, w: &mut W) -> io::Result<()> {
    for r in report.results() {
        writeln!(w, "{} {}: {}", r.status().glyph(), r.name(), r.detail())?;
    }
    let s = &report.summary;
    writeln!(
        w,
        "{} checks: {} reachable, {} degraded, {} unreachable, {} indeterminate",
        report.len(),
        s.reachable,
        s.degraded,
        s.unreachable,
        s.indeterminate
    )
}

pub fn render_json<W: Write>(report: &Report, w: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, report)?;
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_orders_by_category_and_keeps_group_order() {
        let mut b = ReportBuilder::new();
        b.push(Category::EdgeLocation, ProbeResult::reachable("edge-location", "AMS"));
        b.push(Category::RemoteResolvers, ProbeResult::reachable("nameserver:8.8.8.8", "ok"));
        b.push(Category::Route, ProbeResult::unreachable("default-route", "10.0.0.1"));
        b.push(Category::RemoteResolvers, ProbeResult::degraded("nameserver:1.1.1.1", "ok"));
        let report = b.finish();
        let names: Vec<&str> = report.results().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            ["default-route", "nameserver:8.8.8.8", "nameserver:1.1.1.1", "edge-location"]
        );
        assert_eq!(report.summary.reachable, 2);
        assert_eq!(report.summary.unreachable, 1);
    }

    #[test]
    fn text_lines_carry_glyphs() {
        let mut b = ReportBuilder::new();
        b.push(Category::Route, ProbeResult::reachable("default-route", "10.0.0.1"));
        b.push(Category::VpnMesh, ProbeResult::degraded("vpn-mesh", "offline"));
        b.push(Category::EdgeLocation, ProbeResult::indeterminate("edge-location", "?"));
        let mut out = Vec::new();
        render_text(&b.finish(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[+] default-route: 10.0.0.1"));
        assert!(text.contains("[~] vpn-mesh: offline"));
        assert!(text.contains("[!] edge-location: ?"));
        assert!(text.contains("3 checks:"));
    }
}
