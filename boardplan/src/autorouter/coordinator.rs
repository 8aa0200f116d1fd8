//! Route Coordinator
//!
//! Owns the routing backends and serializes routing per group: one critical
//! section covers the cache read, the dispatch decision and in-flight
//! registration, so concurrent requests for the same group never
//! double-dispatch.

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::autorouter::cache::SharedRouteCache;
use crate::autorouter::config::{DispatchTarget, RouterSettings};
use crate::autorouter::plan::RoutingPlan;
use crate::autorouter::server::ServerRouter;
use crate::autorouter::{RouteOptions, RouteOutcome, RouteSource, RoutingBackend, RoutingError};
use crate::schema::PcbTrace;

type RouteResult = Result<Arc<Vec<PcbTrace>>, RoutingError>;
type RouteFuture = BoxFuture<'static, RouteResult>;

struct InFlight {
    id: u64,
    fingerprint: String,
    route: WeakShared<RouteFuture>,
}

type InFlightMap = Arc<Mutex<HashMap<String, InFlight>>>;

enum Step {
    Await(Shared<RouteFuture>),
    WaitThenRetry(Shared<RouteFuture>),
}

fn lock(map: &InFlightMap) -> MutexGuard<'_, HashMap<String, InFlight>> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}

/// Dispatches routing plans to the configured backends
pub struct RouteCoordinator {
    settings: RouterSettings,
    local: Option<Arc<dyn RoutingBackend>>,
    server: Option<Arc<dyn RoutingBackend>>,
    algorithms: HashMap<String, Arc<dyn RoutingBackend>>,
    in_flight: InFlightMap,
    next_id: AtomicU64,
}

impl RouteCoordinator {
    /// Create a coordinator with no backends configured
    pub fn new(settings: RouterSettings) -> Self {
        Self {
            settings,
            local: None,
            server: None,
            algorithms: HashMap::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn with_local(mut self, backend: Arc<dyn RoutingBackend>) -> Self {
        self.local = Some(backend);
        self
    }

    pub fn with_server(mut self, backend: Arc<dyn RoutingBackend>) -> Self {
        self.server = Some(backend);
        self
    }

    /// Use a [`ServerRouter`] built from this coordinator's settings.
    pub fn with_default_server(self) -> Self {
        let server = Arc::new(ServerRouter::new(self.settings.clone()));
        self.with_server(server)
    }

    /// Register a routing algorithm selectable through `algorithmFn`.
    pub fn register_algorithm(
        mut self,
        name: impl Into<String>,
        backend: Arc<dyn RoutingBackend>,
    ) -> Self {
        self.algorithms.insert(name.into(), backend);
        self
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Whether a route for `group` is currently in flight.
    pub fn is_routing(&self, group: &str) -> bool {
        lock(&self.in_flight)
            .get(group)
            .map(|entry| entry.route.upgrade().is_some())
            .unwrap_or(false)
    }

    fn backend_for(
        &self,
        plan: &RoutingPlan,
    ) -> Result<(DispatchTarget, Arc<dyn RoutingBackend>), RoutingError> {
        let target = plan.config.dispatch(&self.settings);
        let backend = match &target {
            DispatchTarget::Algorithm { name } => {
                self.algorithms
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RoutingError::UnknownAlgorithm {
                        group: plan.group.clone(),
                        name: name.clone(),
                    })?
            }
            DispatchTarget::Local => self.local.clone().ok_or_else(|| RoutingError::NoBackend {
                group: plan.group.clone(),
                backend: "local",
            })?,
            DispatchTarget::Server { .. } => {
                self.server.clone().ok_or_else(|| RoutingError::NoBackend {
                    group: plan.group.clone(),
                    backend: "server",
                })?
            }
        };
        Ok((target, backend))
    }

    fn start_route(
        &self,
        id: u64,
        plan: RoutingPlan,
        backend: Arc<dyn RoutingBackend>,
        cache: SharedRouteCache,
    ) -> Shared<RouteFuture> {
        let timeout = self.settings.timeout();
        let in_flight = self.in_flight.clone();

        let route = async move {
            let result = match tokio::time::timeout(timeout, backend.route(&plan)).await {
                Ok(Ok(traces)) => {
                    cache.store(&plan.fingerprint, traces.clone());
                    Ok(Arc::new(traces))
                }
                Ok(Err(e)) => Err(RoutingError::Failed {
                    group: plan.group.clone(),
                    message: e.message,
                }),
                Err(_) => Err(RoutingError::Timeout {
                    group: plan.group.clone(),
                    elapsed: timeout,
                }),
            };

            let mut map = lock(&in_flight);
            if map.get(&plan.group).map(|entry| entry.id) == Some(id) {
                map.remove(&plan.group);
            }
            result
        };
        route.boxed().shared()
    }

    /// Route one plan against its group's cache.
    ///
    /// A cache hit with `serverCacheEnabled` returns without dispatch. A
    /// request that finds the same fingerprint in flight joins it; a
    /// different fingerprint waits for the current route, then retries.
    /// Dropping every caller of an in-flight route cancels it and leaves the
    /// cache untouched.
    pub async fn route(
        &self,
        plan: &RoutingPlan,
        cache: &SharedRouteCache,
        options: RouteOptions,
    ) -> Result<RouteOutcome, RoutingError> {
        loop {
            let step = {
                let mut in_flight = lock(&self.in_flight);
                let live = in_flight.get(&plan.group).and_then(|entry| {
                    entry
                        .route
                        .upgrade()
                        .map(|route| (entry.fingerprint == plan.fingerprint, route))
                });

                match live {
                    Some((true, route)) => {
                        tracing::debug!("Joining in-flight route of group `{}`", plan.group);
                        Step::Await(route)
                    }
                    Some((false, route)) => Step::WaitThenRetry(route),
                    None => {
                        if plan.config.server_cache_enabled {
                            if let Some(traces) = cache.lookup(&plan.fingerprint) {
                                tracing::info!("Route cache hit for group {}", plan.group);
                                return Ok(RouteOutcome {
                                    traces: Arc::new(traces),
                                    source: RouteSource::Cache,
                                    fingerprint: plan.fingerprint.clone(),
                                });
                            }
                        }

                        let (target, backend) = self.backend_for(plan)?;
                        tracing::info!("Routing group {} via {}", plan.group, target);

                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        let route = self.start_route(id, plan.clone(), backend, cache.clone());
                        if let Some(weak) = route.downgrade() {
                            in_flight.insert(
                                plan.group.clone(),
                                InFlight {
                                    id,
                                    fingerprint: plan.fingerprint.clone(),
                                    route: weak,
                                },
                            );
                        }
                        Step::Await(route)
                    }
                }
            };

            match step {
                Step::Await(route) => return self.finish(plan, cache, options, route.await),
                Step::WaitThenRetry(route) => {
                    tracing::debug!(
                        "Group `{}` has a route in flight for another fingerprint; waiting",
                        plan.group
                    );
                    let _ = route.await;
                }
            }
        }
    }

    fn finish(
        &self,
        plan: &RoutingPlan,
        cache: &SharedRouteCache,
        options: RouteOptions,
        result: RouteResult,
    ) -> Result<RouteOutcome, RoutingError> {
        match result {
            Ok(traces) => Ok(RouteOutcome {
                traces,
                source: RouteSource::Routed,
                fingerprint: plan.fingerprint.clone(),
            }),
            Err(e) => {
                if options.stale_on_failure {
                    if let Some(stale) = cache.snapshot() {
                        tracing::warn!("{}; using the previous route cache", e);
                        return Ok(RouteOutcome {
                            traces: Arc::new(stale.pcb_traces),
                            source: RouteSource::Stale,
                            fingerprint: stale.cache_key,
                        });
                    }
                }
                Err(e)
            }
        }
    }
}
