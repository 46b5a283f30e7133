use crate::{
    config::Config,
    engine::NetEngine,
    probe::{captive, edge, mesh, nameserver, proxy, route, ProbeResult, Status},
    report::{Category, Report, ReportBuilder},
};
use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Receives results as they complete, before the report is finalized.
pub trait ResultSink: Send + Sync {
    fn on_result(&self, category: Category, result: &ProbeResult);

    /// Called once every probe of `category` has reported.
    fn on_group_complete(&self, _category: Category, _results: &[ProbeResult]) {}
}

/// Forwards results to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ResultSink for TracingSink {
    fn on_result(&self, category: Category, result: &ProbeResult) {
        match result.status() {
            Status::Reachable | Status::Degraded => {
                info!(?category, name = result.name(), status = %result.status(), "{}", result.detail())
            }
            Status::Unreachable | Status::Indeterminate => {
                warn!(?category, name = result.name(), status = %result.status(), "{}", result.detail())
            }
        }
    }

    fn on_group_complete(&self, category: Category, results: &[ProbeResult]) {
        let ok = results
            .iter()
            .filter(|r| r.status() == Status::Reachable)
            .count();
        info!(?category, "{ok}/{} reachable", results.len());
    }
}

type Slot = (usize, Category, ProbeResult);

pub struct Pipeline<E: NetEngine + 'static> {
    cfg: Arc<Config>,
    engine: Arc<E>,
    sink: Arc<dyn ResultSink>,
}

impl<E: NetEngine + 'static> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: Arc::new(cfg.clone()),
            engine: Arc::new(engine),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Names that `run_selected(only)` will report, in report order.
    pub fn scheduled(&self, only: &[Category]) -> Vec<(Category, String)> {
        let mut out = Vec::new();
        for category in Category::ALL {
            if !only.contains(&category) {
                continue;
            }
            match category {
                Category::Route => out.push((category, route::NAME.to_string())),
                Category::Nameserver => out.push((category, nameserver::DEFAULT_NAME.to_string())),
                Category::VpnMesh => out.push((category, mesh::NAME.to_string())),
                Category::RemoteResolvers => {
                    for addr in &self.cfg.nameserver.public_resolvers {
                        out.push((category, nameserver::public_name(addr)));
                    }
                }
                Category::ProxyDetector => out.push((category, proxy::NAME.to_string())),
                Category::CaptivePortal => out.push((category, captive::NAME.to_string())),
                Category::EdgeLocation => out.push((category, edge::NAME.to_string())),
            }
        }
        out
    }

    pub async fn run(&self) -> Report {
        self.run_selected(&Category::ALL).await
    }

    /// Launches every selected probe at once. Only the proxy detector waits
    /// on another probe, and only for the gateway address.
    pub async fn run_selected(&self, only: &[Category]) -> Report {
        let plan = self.scheduled(only);
        let (tx, mut rx) = mpsc::unbounded_channel::<Slot>();
        // Ids follow the order of `plan`; probes are spawned in that order.
        let mut id = 0usize;
        let mut next = || {
            id += 1;
            id - 1
        };

        let (gw_tx, gw_rx) = oneshot::channel::<Option<IpAddr>>();
        let selected = |c: Category| only.contains(&c);

        if selected(Category::Route) {
            let (cfg, engine) = self.handles();
            self.spawn_probe(next(), Category::Route, route::NAME, &tx, async move {
                route::discover_default_route(&cfg, engine.as_ref(), Some(gw_tx))
                    .await
                    .result
            });
        } else if selected(Category::ProxyDetector) {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                let _ = gw_tx.send(engine.default_gateway().await.ok());
            });
        }

        if selected(Category::Nameserver) {
            let (cfg, engine) = self.handles();
            self.spawn_probe(next(), Category::Nameserver, nameserver::DEFAULT_NAME, &tx, async move {
                nameserver::check_default_nameserver(&cfg, engine.as_ref()).await
            });
        }

        if selected(Category::VpnMesh) {
            let (cfg, engine) = self.handles();
            self.spawn_probe(next(), Category::VpnMesh, mesh::NAME, &tx, async move {
                mesh::get_mesh_status(&cfg, engine.as_ref()).await
            });
        }

        if selected(Category::RemoteResolvers) {
            for addr in self.cfg.nameserver.public_resolvers.clone() {
                let (cfg, engine) = self.handles();
                let name = nameserver::public_name(&addr);
                self.spawn_probe(next(), Category::RemoteResolvers, &name, &tx, async move {
                    nameserver::check_public_resolver(&cfg, engine.as_ref(), &addr).await
                });
            }
        }

        if selected(Category::ProxyDetector) {
            let (cfg, engine) = self.handles();
            self.spawn_probe(next(), Category::ProxyDetector, proxy::NAME, &tx, async move {
                let gateway = async move { gw_rx.await.ok().flatten() };
                proxy::detect_transparent_proxy(&cfg, engine.as_ref(), gateway).await
            });
        }

        if selected(Category::CaptivePortal) {
            let (cfg, engine) = self.handles();
            self.spawn_probe(next(), Category::CaptivePortal, captive::NAME, &tx, async move {
                captive::check_captive_portal(&cfg, engine.as_ref()).await
            });
        }

        if selected(Category::EdgeLocation) {
            let (cfg, engine) = self.handles();
            self.spawn_probe(next(), Category::EdgeLocation, edge::NAME, &tx, async move {
                edge::get_edge_location(&cfg, engine.as_ref()).await
            });
        }
        drop(tx);

        let mut pending: HashMap<Category, usize> = HashMap::new();
        for (category, _) in &plan {
            *pending.entry(*category).or_default() += 1;
        }

        let mut seen = vec![false; plan.len()];
        let mut groups: HashMap<Category, Vec<ProbeResult>> = HashMap::new();
        let mut builder = ReportBuilder::new();

        while let Some((id, category, result)) = rx.recv().await {
            self.sink.on_result(category, &result);
            if let Some(flag) = seen.get_mut(id) {
                *flag = true;
            }
            groups.entry(category).or_default().push(result.clone());
            builder.push(category, result);

            if let Some(left) = pending.get_mut(&category) {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    let members = groups.remove(&category).unwrap_or_default();
                    self.sink.on_group_complete(category, &members);
                }
            }
        }

        // Every scheduled probe owns a slot, even if its task vanished.
        for (id, (category, name)) in plan.into_iter().enumerate() {
            if !seen[id] {
                warn!("{name} did not report a result");
                builder.push(category, ProbeResult::indeterminate(name, "probe did not report a result"));
            }
        }

        let report = builder.finish();
        debug!("report finalized with {} results", report.len());
        report
    }

    fn handles(&self) -> (Arc<Config>, Arc<E>) {
        (Arc::clone(&self.cfg), Arc::clone(&self.engine))
    }

    /// Runs `fut` on its own task so a panic or the optional wall-clock
    /// budget only affects this probe's slot.
    fn spawn_probe<F>(
        &self,
        id: usize,
        category: Category,
        name: &str,
        tx: &mpsc::UnboundedSender<Slot>,
        fut: F,
    ) where
        F: Future<Output = ProbeResult> + Send + 'static,
    {
        let tx = tx.clone();
        let name = name.to_string();
        let budget = self.cfg.global.overall_timeout();

        tokio::spawn(async move {
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                match budget {
                    Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                        ProbeResult::indeterminate(task_name, format!("timed out after {limit:?}"))
                    }),
                    None => fut.await,
                }
            });

            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    warn!("{name} task failed: {err}");
                    ProbeResult::indeterminate(name, format!("probe task failed: {err}"))
                }
            };
            let _ = tx.send((id, category, result));
        });
    }
}
