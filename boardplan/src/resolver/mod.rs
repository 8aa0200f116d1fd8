//! Layout Resolver
//!
//! Turns validated group props into one [`ResolvedLayoutPlan`] per view.
//! Each view overlays, in ascending precedence, the generic keys, the
//! view-prefixed keys and the nested `pcbLayout`/`schLayout` object, then
//! settles on exactly one [`LayoutMode`].

pub mod boxmodel;
mod layout;
pub mod mode;

use serde::Serialize;
use thiserror::Error;

use crate::lint::Lint;
use crate::schema::{BorderSetting, GroupProps, PlacementHints, Position, View};
use crate::units::Distance;

pub use boxmodel::{resolve_padding, BoxModel, Padding};
pub use mode::{FlexParams, GridParams, LayoutMode, MatchAdaptParams, ModeFamily, PackParams};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error(
        "group `{group}`: conflicting layout modes in the {view} view ({}); set layoutMode to pick one",
        join_families(.families)
    )]
    ConflictingLayoutMode {
        group: String,
        view: View,
        families: Vec<ModeFamily>,
    },
    #[error("group `{group}`: {lint}")]
    Lint { group: String, view: View, lint: Lint },
}

fn join_families(families: &[ModeFamily]) -> String {
    families
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// What a parent needs to know about one child when choosing its mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSummary {
    pub name: Option<String>,
    pub position: Option<Position>,
    pub placement: PlacementHints,
}

impl ChildSummary {
    pub fn declares_position(&self, view: View) -> bool {
        self.position.is_some() || self.placement.declares(view)
    }
}

/// Everything a placement engine needs for one view of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLayoutPlan {
    pub view: View,
    #[serde(flatten)]
    pub mode: LayoutMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Effective shared `gap`, before any mode-specific override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<Distance>,
    #[serde(flatten)]
    pub box_model: BoxModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lints: Vec<Lint>,
}

impl ResolvedLayoutPlan {
    pub fn padding(&self) -> Padding {
        self.box_model.padding
    }

    pub fn border(&self) -> &BorderSetting {
        &self.box_model.border
    }

    pub fn cell_border(&self) -> &BorderSetting {
        &self.box_model.cell_border
    }
}

/// Context a group inherits from its place in the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    pub children: &'a [ChildSummary],
    /// Effective `position` of the parent in this view.
    pub inherited_position: Option<Position>,
    pub strict_lints: bool,
}

/// Resolve one view of one group.
pub fn resolve_view(
    group: &str,
    props: &GroupProps,
    view: View,
    ctx: ResolveContext<'_>,
) -> Result<ResolvedLayoutPlan, ResolveError> {
    let base = &props.base;
    let layers = layout::ViewLayers::collect(base, view);
    let effective = layers.effective();

    let mut lints = Vec::new();
    let mode = layout::resolve_mode(group, view, &layers, &effective, ctx.children, &mut lints)?;
    if ctx.strict_lints {
        if let Some(lint) = lints.first() {
            return Err(ResolveError::Lint {
                group: group.to_string(),
                view,
                lint: lint.clone(),
            });
        }
    }
    tracing::debug!("Group `{}` {} view resolved to {}", group, view, mode);

    Ok(ResolvedLayoutPlan {
        view,
        mode,
        position: effective.position.or(ctx.inherited_position),
        gap: effective.gap,
        box_model: BoxModel::resolve(&effective, &base.border, &base.cell_border),
        title: match view {
            View::Schematic => base.sch_title.clone(),
            View::Pcb => None,
        },
        lints,
    })
}

/// Both views of one group. A conflict in one view leaves the other intact.
#[derive(Debug, Clone)]
pub struct ViewPlans {
    pub pcb: Result<ResolvedLayoutPlan, ResolveError>,
    pub schematic: Result<ResolvedLayoutPlan, ResolveError>,
}

impl ViewPlans {
    pub fn get(&self, view: View) -> &Result<ResolvedLayoutPlan, ResolveError> {
        match view {
            View::Pcb => &self.pcb,
            View::Schematic => &self.schematic,
        }
    }
}

pub fn resolve_views(
    group: &str,
    props: &GroupProps,
    children: &[ChildSummary],
    inherited: [Option<Position>; 2],
    strict_lints: bool,
) -> ViewPlans {
    let ctx = |inherited_position| ResolveContext {
        children,
        inherited_position,
        strict_lints,
    };
    ViewPlans {
        pcb: resolve_view(group, props, View::Pcb, ctx(inherited[0])),
        schematic: resolve_view(group, props, View::Schematic, ctx(inherited[1])),
    }
}
