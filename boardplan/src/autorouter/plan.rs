//! The routing request handed to a backend.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::autorouter::config::AutorouterConfig;
use crate::autorouter::fingerprint::{fingerprint, sha256_hex};
use crate::lint::Lint;
use crate::resolver::ResolvedLayoutPlan;
use crate::schema::{GroupProps, PcbRouteCache};
use crate::units::{AreaHint, Distance, Point};

/// The subcircuit's circuit description, produced by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    /// Identity of the circuit topology; feeds the fingerprint.
    pub topology_id: String,
    #[serde(skip)]
    pub circuit: Arc<Value>,
}

impl CircuitSnapshot {
    pub fn new(topology_id: impl Into<String>, circuit: Value) -> Self {
        Self {
            topology_id: topology_id.into(),
            circuit: Arc::new(circuit),
        }
    }

    /// Snapshot whose topology identity is the digest of the circuit JSON.
    pub fn from_json(circuit: Value) -> Self {
        let topology_id = sha256_hex(circuit.to_string().as_bytes());
        Self::new(topology_id, circuit)
    }
}

/// Board geometry a router needs beyond the circuit itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubcircuitGeometry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<Point>>,
    pub outline_offset: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_trace_width: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_trace_width: Option<Distance>,
    pub square: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_area: Option<AreaHint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filled_area: Option<AreaHint>,
}

/// Fully resolved routing request of one subcircuit group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingPlan {
    pub group: String,
    pub config: AutorouterConfig,
    pub geometry: SubcircuitGeometry,
    pub circuit: CircuitSnapshot,
    pub fingerprint: String,
    /// Cache to consult before dispatch: `pcbRouteCache`, else `autorouter.cache`.
    #[serde(skip)]
    pub seed_cache: Option<PcbRouteCache>,
}

impl RoutingPlan {
    /// Build the plan of a subcircuit group.
    ///
    /// Returns `Ok(None)` for plain groups and for subcircuits with
    /// `routingDisabled`. `pcb` supplies the resolved board size when the
    /// PCB view resolved.
    pub fn build(
        group: &str,
        props: &GroupProps,
        pcb: Option<&ResolvedLayoutPlan>,
        circuit: CircuitSnapshot,
        board_clearance: Distance,
    ) -> Result<Option<RoutingPlan>, serde_json::Error> {
        let Some(sub) = &props.subcircuit else {
            return Ok(None);
        };
        if sub.routing_disabled == Some(true) {
            tracing::debug!("Group `{}` has routing disabled", group);
            return Ok(None);
        }

        let config = AutorouterConfig::resolve(sub.autorouter.as_ref(), board_clearance);
        let fingerprint = fingerprint(&circuit.topology_id, &config)?;
        let seed_cache = sub.pcb_route_cache.clone().or_else(|| config.cache.clone());

        let geometry = SubcircuitGeometry {
            width: pcb.and_then(|p| p.box_model.width),
            height: pcb.and_then(|p| p.box_model.height),
            outline: sub.outline.clone(),
            outline_offset: Point {
                x: sub.outline_offset_x.unwrap_or(Distance::ZERO),
                y: sub.outline_offset_y.unwrap_or(Distance::ZERO),
            },
            default_trace_width: sub.default_trace_width,
            min_trace_width: sub.min_trace_width,
            square: sub.square.unwrap_or(false),
            empty_area: sub.empty_area,
            filled_area: sub.filled_area,
        };

        Ok(Some(RoutingPlan {
            group: group.to_string(),
            config,
            geometry,
            circuit,
            fingerprint,
            seed_cache,
        }))
    }

    pub fn lints(&self) -> Vec<Lint> {
        match &self.config.algorithm_fn {
            Some(name) if self.config.has_ignored_server_fields() => {
                vec![Lint::IgnoredServerFields {
                    algorithm: name.clone(),
                }]
            }
            _ => Vec::new(),
        }
    }
}
