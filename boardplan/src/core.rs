//! Core resolution API shared by the library and the CLI.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use crate::autorouter::{CircuitSnapshot, RoutingError, RoutingPlan};
use crate::lint::Lint;
use crate::resolver::{resolve_views, ChildSummary, ResolveError, ResolvedLayoutPlan};
use crate::schema::{validate_group, GroupProps, Position, SchemaError, View};
use crate::tree::{self, GroupReport};
use crate::units::{Distance, LengthNormalizer, MillimeterNormalizer};

const DEFAULT_BOARD_CLEARANCE_MM: f64 = 0.15;

#[derive(Debug, thiserror::Error)]
pub enum BoardplanError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("group `{group}`: {lint}")]
    Lint { group: String, lint: Lint },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for resolution runs (library or CLI).
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    /// Promote lints to errors.
    pub strict_lints: bool,
    /// Board-wide minimum clearance, the default `traceClearance`.
    pub board_clearance: Distance,
    pub normalizer: Arc<dyn LengthNormalizer>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            strict_lints: false,
            board_clearance: Distance::from_mm(DEFAULT_BOARD_CLEARANCE_MM),
            normalizer: Arc::new(MillimeterNormalizer),
        }
    }
}

/// One group with both of its views resolved.
#[derive(Debug, Clone)]
pub struct ResolvedGroup {
    pub path: String,
    pub props: GroupProps,
    /// A conflict aborts only the view it occurs in.
    pub pcb: Result<ResolvedLayoutPlan, ResolveError>,
    pub schematic: Result<ResolvedLayoutPlan, ResolveError>,
}

impl ResolvedGroup {
    pub fn plan(&self, view: View) -> Result<&ResolvedLayoutPlan, &ResolveError> {
        match view {
            View::Pcb => self.pcb.as_ref(),
            View::Schematic => self.schematic.as_ref(),
        }
    }

    pub fn is_subcircuit(&self) -> bool {
        self.props.is_subcircuit()
    }

    /// Group-level lints followed by those of each resolved view.
    pub fn lints(&self) -> Vec<Lint> {
        let mut lints = self.props.lints.clone();
        for view in View::ALL {
            if let Ok(plan) = self.plan(view) {
                lints.extend(plan.lints.iter().cloned());
            }
        }
        lints
    }
}

/// Core resolution API used by both the library and the CLI.
pub struct BoardplanCore;

impl BoardplanCore {
    /// Validate the raw props of one group.
    pub fn validate(
        value: &Value,
        group: &str,
        options: &ResolveOptions,
    ) -> Result<GroupProps, BoardplanError> {
        let props = validate_group(value, group, options.normalizer.as_ref())?;
        for lint in &props.lints {
            tracing::warn!("Group `{}`: {}", group, lint);
        }
        if options.strict_lints {
            if let Some(lint) = props.lints.first() {
                return Err(BoardplanError::Lint {
                    group: group.to_string(),
                    lint: lint.clone(),
                });
            }
        }
        Ok(props)
    }

    /// Validate and resolve one group.
    ///
    /// `children` summarizes the group's direct children; `inherited` is the
    /// parent's effective position in the PCB and schematic views.
    pub fn resolve_group(
        value: &Value,
        group: &str,
        children: &[ChildSummary],
        inherited: [Option<Position>; 2],
        options: &ResolveOptions,
    ) -> Result<ResolvedGroup, BoardplanError> {
        let props = Self::validate(value, group, options)?;
        let views = resolve_views(group, &props, children, inherited, options.strict_lints);
        for plan in [&views.pcb, &views.schematic].into_iter().flatten() {
            for lint in &plan.lints {
                tracing::warn!("Group `{}`: {}", group, lint);
            }
        }
        Ok(ResolvedGroup {
            path: group.to_string(),
            props,
            pcb: views.pcb,
            schematic: views.schematic,
        })
    }

    /// Resolve every group of a tree, top down. Reports are in pre-order;
    /// a failing group does not stop its siblings or descendants.
    pub fn resolve_tree(root: &Value, options: &ResolveOptions) -> Vec<GroupReport> {
        let mut reports = Vec::new();
        tree::walk(
            root,
            tree::root_path(root),
            0,
            [None, None],
            options,
            &mut reports,
        );
        reports
    }

    /// Read a tree from a JSON file and resolve it.
    pub fn resolve_file(
        path: &Path,
        options: &ResolveOptions,
    ) -> Result<Vec<GroupReport>, BoardplanError> {
        let root = load_json(path)?;
        Ok(Self::resolve_tree(&root, options))
    }

    /// Routing plan of a resolved subcircuit group, or `None` for plain
    /// groups and subcircuits with routing disabled.
    pub fn routing_plan(
        group: &ResolvedGroup,
        circuit: CircuitSnapshot,
        options: &ResolveOptions,
    ) -> Result<Option<RoutingPlan>, BoardplanError> {
        let plan = RoutingPlan::build(
            &group.path,
            &group.props,
            group.pcb.as_ref().ok(),
            circuit,
            options.board_clearance,
        )?;
        if let Some(plan) = &plan {
            for lint in plan.lints() {
                tracing::warn!("Group `{}`: {}", group.path, lint);
                if options.strict_lints {
                    return Err(BoardplanError::Lint {
                        group: group.path.clone(),
                        lint,
                    });
                }
            }
        }
        Ok(plan)
    }
}

/// Parse a JSON file.
pub fn load_json(path: &Path) -> Result<Value, BoardplanError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_lints_fail_the_group() {
        let value = json!({ "grid": true });
        assert!(BoardplanCore::validate(&value, "root", &ResolveOptions::default()).is_ok());

        let strict = ResolveOptions {
            strict_lints: true,
            ..Default::default()
        };
        let err = BoardplanCore::validate(&value, "root", &strict).unwrap_err();
        assert!(matches!(err, BoardplanError::Lint { .. }));
        assert!(err.to_string().contains("pcbGrid"));
    }

    #[test]
    fn test_conflict_aborts_one_view_only() {
        let group = BoardplanCore::resolve_group(
            &json!({ "pcbGrid": true, "pcbPack": true, "schFlexDirection": "column" }),
            "root",
            &[],
            [None, None],
            &ResolveOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            group.pcb,
            Err(ResolveError::ConflictingLayoutMode { .. })
        ));
        assert!(group.schematic.unwrap().mode.is_flex());
    }

    #[test]
    fn test_inherited_position() {
        let group = BoardplanCore::resolve_group(
            &json!({ "schPack": true }),
            "root/child",
            &[],
            [None, Some(Position::Absolute)],
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(group.pcb.unwrap().position, None);
        assert_eq!(group.schematic.unwrap().position, Some(Position::Absolute));
    }
}
