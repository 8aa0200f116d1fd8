//! Boardplan - layout and autorouting plan resolution for group trees
//!
//! Groups declare their layout through a loose bag of optional props: a
//! generic layer, `pcb*`/`sch*` prefixed keys and nested `pcbLayout` /
//! `schLayout` overrides. This library validates those props in one pass and
//! resolves them into one explicit layout plan per view, plus a fingerprinted
//! routing plan for subcircuits.
//!
//! # Quick Start
//!
//! ```no_run
//! use boardplan::{BoardplanCore, ResolveOptions, View};
//! use serde_json::json;
//!
//! let tree = json!({
//!     "name": "board",
//!     "pcbGrid": true,
//!     "pcbGridCols": 2,
//!     "children": [{ "type": "group", "name": "power", "schPack": true }]
//! });
//!
//! for report in BoardplanCore::resolve_tree(&tree, &ResolveOptions::default()) {
//!     if let Ok(group) = &report.result {
//!         let pcb = group.plan(View::Pcb);
//!         println!("{}: {:?}", report.path, pcb.map(|p| p.mode.name()));
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **Single-pass validation**: every shape error of a group in one report
//! - **Layout resolution**: exactly one [`LayoutMode`] per view, conflicts reported
//! - **Box model**: padding precedence and three-state borders
//! - **Autorouting**: preset desugaring, route cache, at most one route in flight per group

pub mod autorouter;
pub mod core;
pub mod lint;
pub mod resolver;
pub mod schema;
pub mod tree;
pub mod units;

// Re-export main types
pub use crate::core::{load_json, BoardplanCore, BoardplanError, ResolveOptions, ResolvedGroup};
pub use autorouter::{
    AutorouterConfig, BackendError, CircuitSnapshot, RouteCoordinator, RouteOptions,
    RouteOutcome, RouteSource, RouterSettings, RoutingBackend, RoutingError, RoutingPlan,
    ServerRouter, SharedRouteCache,
};
pub use lint::Lint;
pub use resolver::{ChildSummary, LayoutMode, Padding, ResolveError, ResolvedLayoutPlan};
pub use schema::{BorderSetting, GroupProps, SchemaError, View};
pub use tree::GroupReport;
pub use units::{Distance, LengthNormalizer, MillimeterNormalizer};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BoardplanCore, BoardplanError, LayoutMode, ResolveOptions, ResolvedGroup,
        ResolvedLayoutPlan, RouteCoordinator, RoutingPlan, View,
    };
}
