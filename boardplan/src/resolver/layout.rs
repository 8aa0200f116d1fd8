//! Per-view layering and layout mode inference.

use crate::lint::Lint;
use crate::resolver::mode::{
    FlexParams, GridParams, LayoutMode, MatchAdaptParams, ModeFamily, PackParams,
};
use crate::resolver::{ChildSummary, ResolveError};
use crate::schema::{BaseGroupProps, FlexDirection, LayoutConfig, LayoutModeKind, View};

/// Tri-state reading of a family's boolean trigger at one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    On,
    Off,
    Unset,
}

/// The layers that feed one view, lowest precedence first.
pub(crate) struct ViewLayers {
    layers: Vec<LayoutConfig>,
}

impl ViewLayers {
    pub(crate) fn collect(props: &BaseGroupProps, view: View) -> Self {
        let mut generic = props.generic.clone();
        if view == View::Schematic {
            // The deprecated unprefixed triggers only reach the PCB view.
            generic.grid = None;
            generic.flex = None;
        }
        let mut layers = vec![generic, props.prefixed(view).clone()];
        if let Some(nested) = props.nested(view) {
            layers.push(nested.clone());
        }
        Self { layers }
    }

    pub(crate) fn effective(&self) -> LayoutConfig {
        self.layers
            .iter()
            .fold(LayoutConfig::default(), |acc, layer| acc.overlay(layer))
    }

    /// Families active in the highest layer that activates any, in
    /// priority order. A `false` trigger suppresses its family from its own
    /// layer downwards.
    fn highest_active(&self) -> Vec<ModeFamily> {
        let mut suppressed: Vec<ModeFamily> = Vec::new();
        for layer in self.layers.iter().rev() {
            for family in ModeFamily::PRIORITY {
                if trigger(family, layer) == Trigger::Off && !suppressed.contains(&family) {
                    suppressed.push(family);
                }
            }
            let active: Vec<ModeFamily> = ModeFamily::PRIORITY
                .into_iter()
                .filter(|f| !suppressed.contains(f))
                .filter(|f| trigger(*f, layer) == Trigger::On || has_fields(*f, layer))
                .collect();
            if !active.is_empty() {
                return active;
            }
        }
        Vec::new()
    }
}

fn trigger(family: ModeFamily, cfg: &LayoutConfig) -> Trigger {
    let flag = match family {
        ModeFamily::Pack => cfg.pack,
        ModeFamily::Grid => cfg.grid,
        ModeFamily::MatchAdapt => cfg.match_adapt,
        ModeFamily::Flex => {
            return match &cfg.flex {
                Some(f) if f.is_truthy() => Trigger::On,
                Some(f) if f.is_explicit_off() => Trigger::Off,
                _ => Trigger::Unset,
            }
        }
    };
    match flag {
        Some(true) => Trigger::On,
        Some(false) => Trigger::Off,
        None => Trigger::Unset,
    }
}

fn has_fields(family: ModeFamily, cfg: &LayoutConfig) -> bool {
    match family {
        ModeFamily::Pack => cfg.has_pack_fields(),
        ModeFamily::Grid => cfg.has_grid_fields(),
        ModeFamily::Flex => cfg.has_flex_fields(),
        ModeFamily::MatchAdapt => cfg.has_match_adapt_fields(),
    }
}

/// Pick the family that governs the view, if any.
///
/// The highest layer in which some family is active decides, whether the
/// family is switched on by its trigger or implied by its fields. Two
/// families in that layer is a conflict.
fn infer_family(
    group: &str,
    view: View,
    layers: &ViewLayers,
) -> Result<Option<ModeFamily>, ResolveError> {
    let candidates = layers.highest_active();
    match candidates.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(*one)),
        _ => Err(ResolveError::ConflictingLayoutMode {
            group: group.to_string(),
            view,
            families: candidates,
        }),
    }
}

fn flex_direction(view: View, cfg: &LayoutConfig, lints: &mut Vec<Lint>) -> FlexDirection {
    if cfg.flex_row == Some(true) && cfg.flex_column == Some(true) {
        lints.push(Lint::AmbiguousFlexDirection { view });
    }
    if let Some(direction) = cfg.flex_direction {
        return direction;
    }
    if cfg.flex_column == Some(true) {
        return FlexDirection::Column;
    }
    if cfg.flex_row == Some(true) {
        return FlexDirection::Row;
    }
    cfg.flex
        .as_ref()
        .and_then(|f| f.direction())
        .unwrap_or(FlexDirection::Row)
}

fn build(
    family: ModeFamily,
    view: View,
    cfg: &LayoutConfig,
    lints: &mut Vec<Lint>,
) -> LayoutMode {
    match family {
        ModeFamily::Grid => LayoutMode::Grid(GridParams {
            cols: cfg.grid_cols.clone(),
            rows: cfg.grid_rows.clone(),
            template_rows: cfg.grid_template_rows.clone(),
            template_columns: cfg.grid_template_columns.clone(),
            template: cfg.grid_template.clone(),
            row_gap: cfg.grid_row_gap.or(cfg.grid_gap).or(cfg.gap),
            column_gap: cfg.grid_column_gap.or(cfg.grid_gap).or(cfg.gap),
        }),
        ModeFamily::Flex => LayoutMode::Flex(FlexParams {
            direction: flex_direction(view, cfg, lints),
            align_items: cfg.align_items,
            justify_content: cfg.justify_content,
            gap: cfg.flex_gap.or(cfg.gap),
        }),
        ModeFamily::Pack => LayoutMode::Pack(PackParams {
            order_strategy: cfg.pack_order_strategy,
            placement_strategy: cfg.pack_placement_strategy,
            gap: cfg.gap,
        }),
        ModeFamily::MatchAdapt => LayoutMode::MatchAdapt(MatchAdaptParams {
            template: cfg.match_adapt_template.clone(),
        }),
    }
}

/// Decide the single layout mode of `view`.
pub(crate) fn resolve_mode(
    group: &str,
    view: View,
    layers: &ViewLayers,
    effective: &LayoutConfig,
    children: &[ChildSummary],
    lints: &mut Vec<Lint>,
) -> Result<LayoutMode, ResolveError> {
    if let Some(kind) = effective.layout_mode {
        if effective.pack == Some(true) {
            lints.push(Lint::IgnoredPackTrigger { view, mode: kind });
        }
        let mode = match kind {
            LayoutModeKind::Grid => build(ModeFamily::Grid, view, effective, lints),
            LayoutModeKind::Flex => build(ModeFamily::Flex, view, effective, lints),
            LayoutModeKind::MatchAdapt => build(ModeFamily::MatchAdapt, view, effective, lints),
            LayoutModeKind::Relative => LayoutMode::Relative,
            LayoutModeKind::None => LayoutMode::None,
        };
        return Ok(mode);
    }

    if let Some(family) = infer_family(group, view, layers)? {
        return Ok(build(family, view, effective, lints));
    }

    if children.iter().any(|child| child.declares_position(view)) {
        Ok(LayoutMode::Relative)
    } else {
        Ok(LayoutMode::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FlexFlag, GridTracks};
    use crate::units::Distance;

    fn resolve(props: &BaseGroupProps, view: View) -> (Result<LayoutMode, ResolveError>, Vec<Lint>) {
        let layers = ViewLayers::collect(props, view);
        let effective = layers.effective();
        let mut lints = Vec::new();
        let mode = resolve_mode("root", view, &layers, &effective, &[], &mut lints);
        (mode, lints)
    }

    #[test]
    fn test_explicit_false_suppresses_lower_trigger() {
        let props = BaseGroupProps {
            generic: LayoutConfig {
                grid: Some(true),
                ..Default::default()
            },
            pcb: LayoutConfig {
                grid: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        assert_eq!(mode.unwrap(), LayoutMode::None);
    }

    #[test]
    fn test_fields_imply_family() {
        let props = BaseGroupProps {
            sch: LayoutConfig {
                grid_cols: Some(GridTracks::Count(2)),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Schematic);
        assert!(mode.unwrap().is_grid());
        let (mode, _) = resolve(&props, View::Pcb);
        assert_eq!(mode.unwrap(), LayoutMode::None);
    }

    #[test]
    fn test_trigger_and_other_family_fields_conflict() {
        let props = BaseGroupProps {
            pcb: LayoutConfig {
                pack: Some(true),
                grid_gap: Some(Distance::from_mm(1.0)),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        match mode.unwrap_err() {
            ResolveError::ConflictingLayoutMode { families, .. } => {
                assert_eq!(families, vec![ModeFamily::Pack, ModeFamily::Grid]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_nested_fields_override_lower_false() {
        let props = BaseGroupProps {
            pcb: LayoutConfig {
                grid: Some(false),
                ..Default::default()
            },
            pcb_layout: Some(LayoutConfig {
                grid_cols: Some(GridTracks::Count(3)),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        assert!(mode.unwrap().is_grid());
    }

    #[test]
    fn test_false_in_same_layer_suppresses_fields() {
        let props = BaseGroupProps {
            pcb: LayoutConfig {
                grid: Some(false),
                grid_cols: Some(GridTracks::Count(3)),
                flex_direction: Some(FlexDirection::Row),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        assert!(mode.unwrap().is_flex());
    }

    #[test]
    fn test_two_truthy_triggers_conflict() {
        let props = BaseGroupProps {
            pcb: LayoutConfig {
                grid: Some(true),
                flex: Some(FlexFlag::Bool(true)),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        match mode.unwrap_err() {
            ResolveError::ConflictingLayoutMode { families, view, .. } => {
                assert_eq!(view, View::Pcb);
                assert_eq!(families, vec![ModeFamily::Grid, ModeFamily::Flex]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_higher_layer_decides() {
        let props = BaseGroupProps {
            pcb: LayoutConfig {
                grid: Some(true),
                ..Default::default()
            },
            pcb_layout: Some(LayoutConfig {
                flex_direction: Some(FlexDirection::Column),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        let LayoutMode::Flex(params) = mode.unwrap() else {
            panic!("expected flex");
        };
        assert_eq!(params.direction, FlexDirection::Column);
    }

    #[test]
    fn test_gap_alone_does_not_pick_a_mode() {
        let props = BaseGroupProps {
            generic: LayoutConfig {
                gap: Some(Distance::from_mm(2.0)),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        assert_eq!(mode.unwrap(), LayoutMode::None);
    }

    #[test]
    fn test_layout_mode_overrides_pack_with_lint() {
        let props = BaseGroupProps {
            generic: LayoutConfig {
                layout_mode: Some(LayoutModeKind::Grid),
                pack: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, lints) = resolve(&props, View::Pcb);
        assert!(mode.unwrap().is_grid());
        assert_eq!(
            lints,
            vec![Lint::IgnoredPackTrigger {
                view: View::Pcb,
                mode: LayoutModeKind::Grid
            }]
        );
    }

    #[test]
    fn test_grid_gap_fallbacks() {
        let props = BaseGroupProps {
            generic: LayoutConfig {
                gap: Some(Distance::from_mm(1.0)),
                ..Default::default()
            },
            pcb: LayoutConfig {
                grid: Some(true),
                grid_row_gap: Some(Distance::from_mm(3.0)),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, _) = resolve(&props, View::Pcb);
        let LayoutMode::Grid(params) = mode.unwrap() else {
            panic!("expected grid");
        };
        assert_eq!(params.row_gap, Some(Distance::from_mm(3.0)));
        assert_eq!(params.column_gap, Some(Distance::from_mm(1.0)));
    }

    #[test]
    fn test_deprecated_flex_skips_schematic() {
        let props = BaseGroupProps {
            generic: LayoutConfig {
                flex: Some(FlexFlag::Text("column".into())),
                ..Default::default()
            },
            ..Default::default()
        };
        let (pcb, _) = resolve(&props, View::Pcb);
        let LayoutMode::Flex(params) = pcb.unwrap() else {
            panic!("expected flex");
        };
        assert_eq!(params.direction, FlexDirection::Column);
        let (sch, _) = resolve(&props, View::Schematic);
        assert_eq!(sch.unwrap(), LayoutMode::None);
    }

    #[test]
    fn test_ambiguous_flex_direction() {
        let props = BaseGroupProps {
            pcb: LayoutConfig {
                flex_row: Some(true),
                flex_column: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let (mode, lints) = resolve(&props, View::Pcb);
        let LayoutMode::Flex(params) = mode.unwrap() else {
            panic!("expected flex");
        };
        assert_eq!(params.direction, FlexDirection::Column);
        assert_eq!(lints, vec![Lint::AmbiguousFlexDirection { view: View::Pcb }]);
    }
}
