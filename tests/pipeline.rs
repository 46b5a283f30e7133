mod common;

use common::{ok_http, FakeEngine, GATEWAY};
use netcheck::config::Config;
use netcheck::pipeline::{Pipeline, ResultSink};
use netcheck::probe::{ProbeResult, Status};
use netcheck::report::Category;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn position(&self, needle: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == needle)
            .unwrap_or_else(|| panic!("no event {needle}"))
    }
}

impl ResultSink for Recorder {
    fn on_result(&self, _category: Category, result: &ProbeResult) {
        self.events.lock().unwrap().push(result.name().to_string());
    }

    fn on_group_complete(&self, category: Category, results: &[ProbeResult]) {
        self.events
            .lock()
            .unwrap()
            .push(format!("group:{category:?}:{}", results.len()));
    }
}

fn statuses(report: &netcheck::report::Report) -> HashMap<String, Status> {
    report
        .results()
        .iter()
        .map(|r| (r.name().to_string(), r.status()))
        .collect()
}

#[tokio::test]
async fn healthy_run_reports_every_probe_in_category_order() {
    let cfg = Config::default();
    let pipeline = Pipeline::new(&cfg, FakeEngine::healthy());
    let scheduled = pipeline.scheduled(&Category::ALL);
    let report = pipeline.run().await;

    assert_eq!(scheduled.len(), 10);
    assert_eq!(report.len(), scheduled.len());

    let names: Vec<&str> = report.results().iter().map(|r| r.name()).collect();
    assert_eq!(&names[..3], ["default-route", "default-nameserver", "vpn-mesh"]);
    let mut resolvers: Vec<&str> = names[3..7].to_vec();
    resolvers.sort();
    assert_eq!(
        resolvers,
        ["nameserver:1.1.1.1", "nameserver:1.1.1.2", "nameserver:8.8.4.4", "nameserver:8.8.8.8"]
    );
    assert_eq!(&names[7..], ["proxy-detector", "captive-portal", "edge-location"]);

    assert_eq!(report.get("edge-location").unwrap().detail(), "NL");
    assert_eq!(report.get("proxy-detector").unwrap().status(), Status::Unreachable);
    assert_eq!(report.summary.reachable, 9);
}

#[tokio::test]
async fn nothing_is_dropped_when_everything_fails() {
    let cfg = Config::default();
    let report = Pipeline::new(&cfg, FakeEngine::dead()).run().await;

    assert_eq!(report.len(), 10);
    assert_eq!(report.get("default-route").unwrap().status(), Status::Indeterminate);
    assert_eq!(report.get("default-nameserver").unwrap().status(), Status::Indeterminate);
    assert_eq!(report.get("vpn-mesh").unwrap().status(), Status::Indeterminate);
    assert_eq!(report.get("nameserver:8.8.8.8").unwrap().status(), Status::Unreachable);
    assert_eq!(report.get("proxy-detector").unwrap().status(), Status::Indeterminate);
    assert_eq!(report.get("captive-portal").unwrap().status(), Status::Unreachable);
    assert_eq!(report.get("edge-location").unwrap().status(), Status::Unreachable);
}

#[tokio::test]
async fn panicking_probe_keeps_its_slot() {
    let cfg = Config::default();
    let mut engine = FakeEngine::healthy();
    engine.panic_in_mesh = true;
    let report = Pipeline::new(&cfg, engine).run().await;

    assert_eq!(report.len(), 10);
    let mesh = report.get("vpn-mesh").unwrap();
    assert_eq!(mesh.status(), Status::Indeterminate);
    assert!(mesh.detail().contains("probe task failed"));
    assert_eq!(report.get("edge-location").unwrap().status(), Status::Reachable);
}

#[tokio::test]
async fn slow_edge_does_not_hold_back_resolvers() {
    let cfg = Config::default();
    let mut engine = FakeEngine::healthy();
    engine
        .http_delay
        .insert(cfg.edge.url.clone(), Duration::from_millis(300));
    let recorder = Arc::new(Recorder::default());
    let report = Pipeline::new(&cfg, engine)
        .with_sink(recorder.clone())
        .run()
        .await;

    let edge = recorder.position("edge-location");
    let group = recorder.position("group:RemoteResolvers:4");
    for addr in &cfg.nameserver.public_resolvers {
        assert!(recorder.position(&format!("nameserver:{addr}")) < edge);
    }
    assert!(group < edge);
    let events = recorder.events();
    assert_eq!(
        events[events.len() - 2..],
        ["edge-location".to_string(), "group:EdgeLocation:1".to_string()]
    );
    // Report order is unaffected by completion order.
    assert_eq!(report.results().last().unwrap().name(), "edge-location");
}

#[tokio::test]
async fn slow_resolvers_do_not_hold_back_edge() {
    let cfg = Config::default();
    let mut engine = FakeEngine::healthy();
    engine.dns_delay = Duration::from_millis(300);
    let recorder = Arc::new(Recorder::default());
    let report = Pipeline::new(&cfg, engine)
        .with_sink(recorder.clone())
        .run()
        .await;

    let edge = recorder.position("edge-location");
    for addr in &cfg.nameserver.public_resolvers {
        assert!(edge < recorder.position(&format!("nameserver:{addr}")));
    }
    assert_eq!(report.len(), 10);
}

#[tokio::test]
async fn budget_turns_stuck_probe_into_indeterminate() {
    let mut cfg = Config::default();
    cfg.global.overall_timeout_ms = 100;
    let mut engine = FakeEngine::healthy();
    engine
        .http_delay
        .insert(cfg.edge.url.clone(), Duration::from_secs(5));

    let started = std::time::Instant::now();
    let report = Pipeline::new(&cfg, engine).run().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.len(), 10);
    let edge = report.get("edge-location").unwrap();
    assert_eq!(edge.status(), Status::Indeterminate);
    assert!(edge.detail().contains("timed out"));
    assert_eq!(report.get("captive-portal").unwrap().status(), Status::Reachable);
}

#[tokio::test]
async fn proxy_alone_still_finds_the_gateway() {
    let cfg = Config::default();
    let mut engine = FakeEngine::healthy();
    engine.http.insert(
        format!("http://{GATEWAY}:9090"),
        ok_http(200, r#"{"hello":"clash"}"#),
    );
    let pipeline = Pipeline::new(&cfg, engine);
    let report = pipeline.run_selected(&[Category::ProxyDetector]).await;

    assert_eq!(report.len(), 1);
    let r = report.get("proxy-detector").unwrap();
    assert_eq!(r.status(), Status::Reachable);
    assert!(r.detail().contains(GATEWAY));
}

#[tokio::test]
async fn selection_limits_the_schedule() {
    let cfg = Config::default();
    let pipeline = Pipeline::new(&cfg, FakeEngine::healthy());
    let only = [Category::RemoteResolvers, Category::EdgeLocation];
    let report = pipeline.run_selected(&only).await;

    assert_eq!(report.len(), pipeline.scheduled(&only).len());
    assert_eq!(report.len(), 5);
    assert!(report.get("default-route").is_none());
}

#[tokio::test]
async fn repeated_runs_agree() {
    let cfg = Config::default();
    let mut engine = FakeEngine::healthy();
    engine.ping.insert(common::ip("1.1.1.1"), Ok(common::replies(0)));
    let pipeline = Pipeline::new(&cfg, engine);

    let first = pipeline.run().await;
    let second = pipeline.run().await;

    assert_eq!(statuses(&first), statuses(&second));
    assert_eq!(first.get("nameserver:1.1.1.1").unwrap().status(), Status::Degraded);
}

#[tokio::test]
async fn hung_resolver_does_not_stall_the_report() {
    let mut cfg = Config::default();
    cfg.proxy.lookup_timeout_ms = 200;
    let mut engine = FakeEngine::healthy();
    engine.lookup_delay = Duration::from_secs(30);

    let report = tokio::time::timeout(Duration::from_secs(3), Pipeline::new(&cfg, engine).run())
        .await
        .expect("report finished within the lookup bound");

    assert_eq!(report.len(), 10);
    assert_eq!(report.get("proxy-detector").unwrap().status(), Status::Indeterminate);
}

#[tokio::test]
async fn route_over_budget_still_hands_gateway_to_proxy() {
    let mut cfg = Config::default();
    cfg.global.overall_timeout_ms = 300;
    let mut engine = FakeEngine::healthy();
    engine.ping_delay = Duration::from_secs(2);
    engine.http.insert(
        format!("http://{GATEWAY}:9090"),
        ok_http(200, r#"{"hello":"clash"}"#),
    );

    let report = Pipeline::new(&cfg, engine).run().await;

    let route = report.get("default-route").unwrap();
    assert_eq!(route.status(), Status::Indeterminate);
    assert!(route.detail().contains("timed out"));
    let proxy = report.get("proxy-detector").unwrap();
    assert_eq!(proxy.status(), Status::Reachable, "{}", proxy.detail());
    assert!(proxy.detail().contains(GATEWAY));
}
