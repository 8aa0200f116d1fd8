//! Autorouting
//!
//! Resolves the `autorouter` prop into a canonical [`AutorouterConfig`],
//! builds a fingerprinted [`RoutingPlan`] and dispatches it through the
//! [`RouteCoordinator`], which consults the group's route cache first and
//! keeps at most one route in flight per group.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod fingerprint;
pub mod plan;
pub mod server;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::schema::PcbTrace;

pub use cache::SharedRouteCache;
pub use config::{AutorouterConfig, DispatchTarget, RouterSettings};
pub use coordinator::RouteCoordinator;
pub use fingerprint::fingerprint;
pub use plan::{CircuitSnapshot, RoutingPlan, SubcircuitGeometry};
pub use server::ServerRouter;

/// Failure reported by a routing backend
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::new(e.to_string())
    }
}

/// Routing errors. The only class eligible for caller-directed retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("routing group `{group}` failed: {message}")]
    Failed { group: String, message: String },
    #[error("routing group `{group}` timed out after {}s", .elapsed.as_secs())]
    Timeout { group: String, elapsed: Duration },
    #[error("group `{group}` names unregistered routing algorithm `{name}`")]
    UnknownAlgorithm { group: String, name: String },
    #[error("no {backend} backend is configured for group `{group}`")]
    NoBackend { group: String, backend: &'static str },
}

impl RoutingError {
    pub fn group(&self) -> &str {
        match self {
            RoutingError::Failed { group, .. }
            | RoutingError::Timeout { group, .. }
            | RoutingError::UnknownAlgorithm { group, .. }
            | RoutingError::NoBackend { group, .. } => group,
        }
    }
}

/// Something that turns a routing plan into traces: a local router, a
/// remote autorouting service or a registered algorithm.
#[async_trait]
pub trait RoutingBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn route(&self, plan: &RoutingPlan) -> Result<Vec<PcbTrace>, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// Served from the route cache without dispatch.
    Cache,
    Routed,
    /// Previous cache contents returned after a routing failure.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub traces: Arc<Vec<PcbTrace>>,
    pub source: RouteSource,
    /// Key the traces were routed for. For [`RouteSource::Stale`] this is the
    /// stored cache key, not the plan's fingerprint.
    pub fingerprint: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
    /// Return the previous cache contents instead of surfacing a routing error.
    pub stale_on_failure: bool,
}
