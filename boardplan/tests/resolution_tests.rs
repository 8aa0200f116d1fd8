//! Resolution tests for single groups

use boardplan::prelude::*;
use boardplan::resolver::{FlexParams, ModeFamily};
use boardplan::schema::{Border, FlexDirection, JustifyContent};
use boardplan::{BorderSetting, ChildSummary, Distance, Lint, Padding, ResolveError};
use serde_json::{json, Value};

fn resolve(value: Value) -> ResolvedGroup {
    BoardplanCore::resolve_group(&value, "root", &[], [None, None], &ResolveOptions::default())
        .expect("group should validate")
}

fn mm(v: f64) -> Distance {
    Distance::from_mm(v)
}

#[test]
fn test_nested_layout_beats_generic_gap() {
    let group = resolve(json!({ "gap": 2, "pcbLayout": { "gap": 5 } }));
    assert_eq!(group.pcb.unwrap().gap, Some(mm(5.0)));
    assert_eq!(group.schematic.unwrap().gap, Some(mm(2.0)));
}

#[test]
fn test_prefixed_gap_sits_between_generic_and_nested() {
    let group = resolve(json!({ "gap": 1, "pcbGap": 3, "schGap": 4, "schLayout": { "gap": 6 } }));
    assert_eq!(group.pcb.unwrap().gap, Some(mm(3.0)));
    assert_eq!(group.schematic.unwrap().gap, Some(mm(6.0)));
}

#[test]
fn test_explicit_prefixed_false_beats_deprecated_alias() {
    let group = resolve(json!({ "grid": true, "pcbGrid": false }));
    let pcb = group.pcb.as_ref().unwrap();
    assert!(!pcb.mode.is_grid());
    assert!(group.lints().contains(&Lint::DeprecatedAlias {
        key: "grid",
        replacement: "pcbGrid"
    }));
}

#[test]
fn test_deprecated_grid_applies_to_pcb_only() {
    let group = resolve(json!({ "grid": true }));
    assert!(group.pcb.unwrap().mode.is_grid());
    assert_eq!(group.schematic.unwrap().mode, LayoutMode::None);
}

#[test]
fn test_padding_precedence() {
    let group = resolve(json!({ "padding": 1, "paddingX": 2, "paddingLeft": 3 }));
    let expected = Padding {
        left: mm(3.0),
        right: mm(2.0),
        top: mm(1.0),
        bottom: mm(1.0),
    };
    assert_eq!(group.pcb.unwrap().padding(), expected);
    assert_eq!(group.schematic.unwrap().padding(), expected);
}

#[test]
fn test_view_padding_overrides_generic() {
    let group = resolve(json!({ "padding": 1, "pcbPaddingTop": 4, "schLayout": { "paddingY": 2 } }));
    let pcb = group.pcb.unwrap().padding();
    assert_eq!((pcb.top, pcb.bottom), (mm(4.0), mm(1.0)));
    let sch = group.schematic.unwrap().padding();
    assert_eq!((sch.top, sch.bottom, sch.left), (mm(2.0), mm(2.0), mm(1.0)));
}

#[test]
fn test_three_border_states_are_distinguishable() {
    let inherit = resolve(json!({}));
    let suppressed = resolve(json!({ "border": null }));
    let styled = resolve(json!({ "border": { "dashed": true } }));

    let inherit = inherit.pcb.unwrap();
    let suppressed = suppressed.pcb.unwrap();
    let styled = styled.pcb.unwrap();
    assert_eq!(inherit.border(), &BorderSetting::Inherit);
    assert_eq!(suppressed.border(), &BorderSetting::Suppressed);
    assert_eq!(
        styled.border(),
        &BorderSetting::Styled(Border {
            dashed: Some(true),
            ..Default::default()
        })
    );

    let encoded: Vec<Value> = [&inherit, &suppressed, &styled]
        .iter()
        .map(|plan| serde_json::to_value(plan).unwrap()["border"].clone())
        .collect();
    assert_ne!(encoded[0], encoded[1]);
    assert_ne!(encoded[1], encoded[2]);
    assert_ne!(encoded[0], encoded[2]);
}

#[test]
fn test_dashed_and_solid_is_flagged_not_rejected() {
    let group = resolve(json!({ "cellBorder": { "dashed": true, "solid": true } }));
    assert!(group
        .lints()
        .contains(&Lint::AmbiguousBorderStyle { key: "cellBorder" }));
    assert!(matches!(
        group.pcb.unwrap().cell_border(),
        BorderSetting::Styled(_)
    ));
}

#[test]
fn test_generic_grid_and_flex_conflict() {
    let group = resolve(json!({ "grid": true, "flex": true }));
    match group.pcb {
        Err(ResolveError::ConflictingLayoutMode {
            group, families, ..
        }) => {
            assert_eq!(group, "root");
            assert_eq!(families, vec![ModeFamily::Grid, ModeFamily::Flex]);
        }
        other => panic!("expected a conflict, got {:?}", other),
    }
}

#[test]
fn test_layout_mode_disambiguates_conflict() {
    let group = resolve(json!({ "grid": true, "flex": true, "layoutMode": "flex" }));
    assert!(group.pcb.unwrap().mode.is_flex());
}

#[test]
fn test_conflict_message_names_group_and_view() {
    let group = resolve(json!({ "schPack": true, "schMatchAdapt": true }));
    let message = group.schematic.unwrap_err().to_string();
    assert!(message.contains("root"));
    assert!(message.contains("schematic"));
    assert!(message.contains("pack, match-adapt"));
}

#[test]
fn test_exactly_one_mode_for_valid_inputs() {
    let inputs = [
        json!({}),
        json!({ "pcbPack": true, "packOrderStrategy": "largest_to_smallest" }),
        json!({ "layoutMode": "relative" }),
        json!({ "schFlexRow": true, "schJustifyContent": "space-between" }),
        json!({ "gridTemplateColumns": "1fr 1fr" }),
        json!({ "schMatchAdapt": true }),
    ];
    for input in inputs {
        let group = resolve(input.clone());
        for view in View::ALL {
            assert!(group.plan(view).is_ok(), "{} failed for {}", view, input);
        }
    }
}

#[test]
fn test_flex_params() {
    let group = resolve(json!({
        "schFlexColumn": true,
        "schJustifyContent": "space-evenly",
        "schFlexGap": "0.5mm",
        "gap": 3
    }));
    assert_eq!(
        group.schematic.unwrap().mode,
        LayoutMode::Flex(FlexParams {
            direction: FlexDirection::Column,
            align_items: None,
            justify_content: Some(JustifyContent::SpaceEvenly),
            gap: Some(mm(0.5)),
        })
    );
}

#[test]
fn test_children_with_coordinates_make_relative() {
    let children = [ChildSummary {
        name: Some("R1".into()),
        placement: boardplan::schema::PlacementHints {
            sch_x: Some(mm(3.0)),
            ..Default::default()
        },
        ..Default::default()
    }];
    let group = BoardplanCore::resolve_group(
        &json!({}),
        "root",
        &children,
        [None, None],
        &ResolveOptions::default(),
    )
    .unwrap();
    assert_eq!(group.pcb.unwrap().mode, LayoutMode::None);
    assert_eq!(group.schematic.unwrap().mode, LayoutMode::Relative);
}

#[test]
fn test_enum_error_names_key_and_variants() {
    let err = BoardplanCore::validate(
        &json!({ "pcbLayout": { "flexDirection": "diagonal" } }),
        "root/io",
        &ResolveOptions::default(),
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("root/io"));
    assert!(message.contains("pcbLayout.flexDirection"));
    assert!(message.contains("\"row\", \"column\""));
}

#[test]
fn test_schematic_title_and_sizes() {
    let group = resolve(json!({ "schTitle": "Power", "width": 10, "pcbWidth": 30, "schHeight": "2cm" }));
    let pcb = group.pcb.unwrap();
    let sch = group.schematic.unwrap();
    assert_eq!(pcb.title, None);
    assert_eq!(pcb.box_model.width, Some(mm(30.0)));
    assert_eq!(sch.title.as_deref(), Some("Power"));
    assert_eq!(sch.box_model.width, Some(mm(10.0)));
    assert_eq!(sch.box_model.height, Some(mm(20.0)));
}

#[test]
fn test_plan_serializes_mode_tag() {
    let group = resolve(json!({ "pcbGrid": true, "pcbGridCols": 3 }));
    let value = serde_json::to_value(group.pcb.unwrap()).unwrap();
    assert_eq!(value["mode"], "grid");
    assert_eq!(value["cols"], 3);
    assert_eq!(value["view"], "pcb");
}

fn conflict_families(result: Result<&boardplan::ResolvedLayoutPlan, &ResolveError>) -> Vec<ModeFamily> {
    match result {
        Err(ResolveError::ConflictingLayoutMode { families, .. }) => families.clone(),
        other => panic!("expected a conflict, got {:?}", other),
    }
}

#[test]
fn test_trigger_plus_other_family_fields_conflict() {
    let group = resolve(json!({ "pcbFlex": true, "pcbGridCols": 2 }));
    assert_eq!(
        conflict_families(group.plan(View::Pcb)),
        vec![ModeFamily::Grid, ModeFamily::Flex]
    );

    let group = resolve(json!({ "pack": true, "gridCols": 2 }));
    for view in View::ALL {
        assert_eq!(
            conflict_families(group.plan(view)),
            vec![ModeFamily::Pack, ModeFamily::Grid]
        );
    }
}

#[test]
fn test_fields_of_two_families_conflict() {
    let group = resolve(json!({ "schGridCols": 2, "schJustifyContent": "center" }));
    assert_eq!(
        conflict_families(group.plan(View::Schematic)),
        vec![ModeFamily::Grid, ModeFamily::Flex]
    );
    assert_eq!(group.pcb.unwrap().mode, LayoutMode::None);
}

#[test]
fn test_nested_fields_beat_lower_false_trigger() {
    let group = resolve(json!({ "pcbGrid": false, "pcbLayout": { "gridCols": 3 } }));
    let pcb = group.pcb.unwrap();
    let LayoutMode::Grid(grid) = &pcb.mode else {
        panic!("expected grid, got {}", pcb.mode);
    };
    assert_eq!(grid.cols, Some(boardplan::schema::GridTracks::Count(3)));
}

#[test]
fn test_nested_false_suppresses_lower_fields() {
    let group = resolve(json!({ "pcbGridCols": 3, "pcbLayout": { "grid": false } }));
    assert_eq!(group.pcb.unwrap().mode, LayoutMode::None);
}
