//! Group and subcircuit props.

use serde::Serialize;
use serde_json::Value;

use crate::lint::Lint;
use crate::schema::autorouter::{read_autorouter, read_route_cache, AutorouterProp, PcbRouteCache};
use crate::schema::layout_config::{KeySet, LayoutConfig};
use crate::schema::validate::{type_name, FieldReader, IssueKind, Report, SchemaError, SchemaIssue};
use crate::schema::View;
use crate::units::{AreaHint, Distance, LengthNormalizer, Point};

/// Border styling. `dashed` and `solid` are independent flags; picking the
/// rendered stroke style is the renderer's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Border {
    pub stroke_width: Option<Distance>,
    pub dashed: Option<bool>,
    pub solid: Option<bool>,
}

impl Border {
    pub fn is_ambiguous(&self) -> bool {
        self.dashed == Some(true) && self.solid == Some(true)
    }
}

/// `border` / `cellBorder`: absent, `null`, or a border object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "border", rename_all = "snake_case")]
pub enum BorderSetting {
    /// Key absent: the renderer applies its own default.
    #[default]
    Inherit,
    /// `null`: the author explicitly asked for no border.
    Suppressed,
    Styled(Border),
}

/// Explicit coordinates a node declares for its parent's layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementHints {
    pub pcb_x: Option<Distance>,
    pub pcb_y: Option<Distance>,
    pub sch_x: Option<Distance>,
    pub sch_y: Option<Distance>,
}

impl PlacementHints {
    pub fn declares(&self, view: View) -> bool {
        match view {
            View::Pcb => self.pcb_x.is_some() || self.pcb_y.is_some(),
            View::Schematic => self.sch_x.is_some() || self.sch_y.is_some(),
        }
    }

    pub(crate) fn read(reader: &mut FieldReader<'_>, report: &mut Report) -> Self {
        Self {
            pcb_x: reader.length(report, "pcbX"),
            pcb_y: reader.length(report, "pcbY"),
            sch_x: reader.length(report, "schX"),
            sch_y: reader.length(report, "schY"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseGroupProps {
    pub name: Option<String>,
    pub key: Option<Value>,
    pub sch_title: Option<String>,
    /// Unprefixed layout keys, including the deprecated `grid` / `flex`.
    pub generic: LayoutConfig,
    pub pcb: LayoutConfig,
    pub sch: LayoutConfig,
    pub pcb_layout: Option<LayoutConfig>,
    pub sch_layout: Option<LayoutConfig>,
    pub border: BorderSetting,
    pub cell_border: BorderSetting,
    pub placement: PlacementHints,
}

impl BaseGroupProps {
    pub fn prefixed(&self, view: View) -> &LayoutConfig {
        match view {
            View::Pcb => &self.pcb,
            View::Schematic => &self.sch,
        }
    }

    pub fn nested(&self, view: View) -> Option<&LayoutConfig> {
        match view {
            View::Pcb => self.pcb_layout.as_ref(),
            View::Schematic => self.sch_layout.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubcircuitProps {
    /// Threaded through unchanged to the manual-edits store.
    pub manual_edits: Option<Value>,
    pub routing_disabled: Option<bool>,
    pub default_trace_width: Option<Distance>,
    pub min_trace_width: Option<Distance>,
    pub pcb_route_cache: Option<PcbRouteCache>,
    pub autorouter: Option<AutorouterProp>,
    pub sch_auto_layout_enabled: Option<bool>,
    pub sch_trace_auto_label_enabled: Option<bool>,
    /// Reference to a parts-sourcing engine, resolved downstream.
    pub parts_engine: Option<String>,
    pub square: Option<bool>,
    pub empty_area: Option<AreaHint>,
    pub filled_area: Option<AreaHint>,
    pub outline: Option<Vec<Point>>,
    pub outline_offset_x: Option<Distance>,
    pub outline_offset_y: Option<Distance>,
}

/// Validated props of one group node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupProps {
    pub base: BaseGroupProps,
    pub subcircuit: Option<SubcircuitProps>,
    pub lints: Vec<Lint>,
}

impl GroupProps {
    pub fn is_subcircuit(&self) -> bool {
        self.subcircuit.is_some()
    }
}

/// Keys every group accepts besides the layout keys.
pub const GROUP_KEYS: &[&str] = &[
    "name",
    "key",
    "children",
    "type",
    "subcircuit",
    "schTitle",
    "pcbX",
    "pcbY",
    "schX",
    "schY",
    "pcbLayout",
    "schLayout",
    "border",
    "cellBorder",
];

pub const SUBCIRCUIT_KEYS: &[&str] = &[
    "manualEdits",
    "routingDisabled",
    "defaultTraceWidth",
    "minTraceWidth",
    "pcbRouteCache",
    "autorouter",
    "schAutoLayoutEnabled",
    "schTraceAutoLabelEnabled",
    "partsEngine",
    "square",
    "emptyArea",
    "filledArea",
    "outline",
    "outlineOffsetX",
    "outlineOffsetY",
];

fn read_border(reader: &mut FieldReader<'_>, report: &mut Report, key: &str) -> BorderSetting {
    let Some(value) = reader.take(key) else {
        return BorderSetting::Inherit;
    };
    match value {
        Value::Null => BorderSetting::Suppressed,
        Value::Object(obj) => {
            let scope = reader.qualify(key);
            let mut sub = FieldReader::nested(obj, &scope, reader.normalizer());
            let border = Border {
                stroke_width: sub.length(report, "strokeWidth"),
                dashed: sub.boolean(report, "dashed"),
                solid: sub.boolean(report, "solid"),
            };
            for unknown in sub.unrecognized() {
                tracing::debug!("Ignoring unrecognized border key `{}`", unknown);
            }
            BorderSetting::Styled(border)
        }
        other => {
            report.issue(
                reader.qualify(key),
                IssueKind::WrongType {
                    expected: "border object or null",
                    found: type_name(other),
                },
            );
            BorderSetting::Inherit
        }
    }
}

fn read_nested_layout(
    reader: &mut FieldReader<'_>,
    report: &mut Report,
    view: View,
) -> Option<LayoutConfig> {
    let key = view.layout_key();
    let obj = reader.object(report, key)?;
    let mut sub = FieldReader::nested(obj, key, reader.normalizer());
    let cfg = LayoutConfig::read(&mut sub, report, KeySet::Full);
    for unknown in sub.unrecognized() {
        tracing::debug!("Ignoring unrecognized layout key `{}`", unknown);
    }
    Some(cfg)
}

fn read_subcircuit(reader: &mut FieldReader<'_>, report: &mut Report) -> SubcircuitProps {
    SubcircuitProps {
        manual_edits: reader
            .object(report, "manualEdits")
            .map(|obj| Value::Object(obj.clone())),
        routing_disabled: reader.boolean(report, "routingDisabled"),
        default_trace_width: reader.length(report, "defaultTraceWidth"),
        min_trace_width: reader.length(report, "minTraceWidth"),
        pcb_route_cache: read_route_cache(reader, report, "pcbRouteCache"),
        autorouter: read_autorouter(reader, report, "autorouter"),
        sch_auto_layout_enabled: reader.boolean(report, "schAutoLayoutEnabled"),
        sch_trace_auto_label_enabled: reader.boolean(report, "schTraceAutoLabelEnabled"),
        parts_engine: reader.string(report, "partsEngine"),
        square: reader.boolean(report, "square"),
        empty_area: reader.area(report, "emptyArea"),
        filled_area: reader.area(report, "filledArea"),
        outline: reader.points(report, "outline"),
        outline_offset_x: reader.length(report, "outlineOffsetX"),
        outline_offset_y: reader.length(report, "outlineOffsetY"),
    }
}

fn collect_lints(props: &GroupProps) -> Vec<Lint> {
    let mut lints = Vec::new();
    let base = &props.base;

    if base.generic.grid.is_some() {
        lints.push(Lint::DeprecatedAlias {
            key: "grid",
            replacement: "pcbGrid",
        });
    }
    if base.generic.flex.is_some() {
        lints.push(Lint::DeprecatedAlias {
            key: "flex",
            replacement: "pcbFlex",
        });
    }
    for (key, setting) in [("border", &base.border), ("cellBorder", &base.cell_border)] {
        if let BorderSetting::Styled(border) = setting {
            if border.is_ambiguous() {
                lints.push(Lint::AmbiguousBorderStyle { key });
            }
        }
    }

    if let Some(sub) = &props.subcircuit {
        if let (Some(default), Some(min)) = (sub.default_trace_width, sub.min_trace_width) {
            if default < min {
                lints.push(Lint::TraceWidthBelowMinimum { default, min });
            }
        }
        if sub.empty_area.is_some() && sub.filled_area.is_some() {
            lints.push(Lint::ConflictingAreaHints);
        }
    }
    lints
}

/// Validate the raw props of one group.
///
/// `group` is the node's identity used in errors. Children are not
/// validated here; see [`crate::tree`].
pub fn validate_group(
    value: &Value,
    group: &str,
    normalizer: &dyn LengthNormalizer,
) -> Result<GroupProps, SchemaError> {
    let Some(obj) = value.as_object() else {
        return Err(SchemaError::Validation {
            group: group.to_string(),
            issues: vec![SchemaIssue {
                key: group.to_string(),
                kind: IssueKind::WrongType {
                    expected: "object",
                    found: type_name(value),
                },
            }],
        });
    };
    let mut report = Report::default();

    let mut reader = FieldReader::new(obj, normalizer);
    let is_subcircuit = reader.boolean(&mut report, "subcircuit").unwrap_or(false);
    // Consumed by the tree walker.
    reader.take("children");
    reader.take("type");

    let mut base = BaseGroupProps {
        name: reader.string(&mut report, "name"),
        key: reader.opaque("key"),
        sch_title: reader.string(&mut report, "schTitle"),
        generic: LayoutConfig::read(&mut reader, &mut report, KeySet::Full),
        pcb: LayoutConfig::read(&mut reader, &mut report, KeySet::Prefixed(View::Pcb)),
        sch: LayoutConfig::read(&mut reader, &mut report, KeySet::Prefixed(View::Schematic)),
        ..Default::default()
    };
    base.pcb_layout = read_nested_layout(&mut reader, &mut report, View::Pcb);
    base.sch_layout = read_nested_layout(&mut reader, &mut report, View::Schematic);
    base.border = read_border(&mut reader, &mut report, "border");
    base.cell_border = read_border(&mut reader, &mut report, "cellBorder");
    base.placement = PlacementHints::read(&mut reader, &mut report);

    let mut ignored = Vec::new();
    let subcircuit = if is_subcircuit {
        Some(read_subcircuit(&mut reader, &mut report))
    } else {
        for key in SUBCIRCUIT_KEYS {
            if reader.take(key).is_some() {
                ignored.push(Lint::SubcircuitOnlyKey {
                    key: key.to_string(),
                });
            }
        }
        None
    };

    for unknown in reader.unrecognized() {
        tracing::debug!("Group `{}`: ignoring unrecognized key `{}`", group, unknown);
    }
    report.finish(group)?;

    let mut props = GroupProps {
        base,
        subcircuit,
        lints: Vec::new(),
    };
    props.lints = collect_lints(&props);
    props.lints.extend(ignored);
    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MillimeterNormalizer;
    use serde_json::json;

    fn validate(value: Value) -> Result<GroupProps, SchemaError> {
        validate_group(&value, "root", &MillimeterNormalizer)
    }

    #[test]
    fn test_border_three_states() {
        let props = validate(json!({})).unwrap();
        assert_eq!(props.base.border, BorderSetting::Inherit);

        let props = validate(json!({ "border": null })).unwrap();
        assert_eq!(props.base.border, BorderSetting::Suppressed);

        let props = validate(json!({ "border": { "dashed": true } })).unwrap();
        assert_eq!(
            props.base.border,
            BorderSetting::Styled(Border {
                dashed: Some(true),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_border_and_cell_border_are_independent() {
        let props = validate(json!({ "border": null, "cellBorder": { "solid": true } })).unwrap();
        assert_eq!(props.base.border, BorderSetting::Suppressed);
        assert!(matches!(props.base.cell_border, BorderSetting::Styled(_)));
    }

    #[test]
    fn test_dashed_and_solid_is_flagged() {
        let props = validate(json!({ "border": { "dashed": true, "solid": true } })).unwrap();
        assert!(props
            .lints
            .contains(&Lint::AmbiguousBorderStyle { key: "border" }));
    }

    #[test]
    fn test_deprecated_alias_lint() {
        let props = validate(json!({ "grid": true })).unwrap();
        assert!(props.lints.contains(&Lint::DeprecatedAlias {
            key: "grid",
            replacement: "pcbGrid",
        }));
    }

    #[test]
    fn test_all_issues_are_collected() {
        let err = validate(json!({
            "flexDirection": "diagonal",
            "pcbPack": "yes",
            "schLayout": { "alignItems": "middle" }
        }))
        .unwrap_err();
        let keys: Vec<_> = err.issues().iter().map(|i| i.key.clone()).collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"flexDirection".to_string()));
        assert!(keys.contains(&"pcbPack".to_string()));
        assert!(keys.contains(&"schLayout.alignItems".to_string()));
        assert_eq!(err.group(), "root");
    }

    #[test]
    fn test_subcircuit_keys_on_plain_group_are_ignored() {
        let props = validate(json!({ "autorouter": "auto", "square": true })).unwrap();
        assert!(props.subcircuit.is_none());
        assert!(props.lints.contains(&Lint::SubcircuitOnlyKey {
            key: "autorouter".into()
        }));
    }

    #[test]
    fn test_subcircuit_props() {
        let props = validate(json!({
            "subcircuit": true,
            "autorouter": "subcircuit",
            "defaultTraceWidth": "0.1mm",
            "minTraceWidth": "0.15mm",
            "emptyArea": "20%",
            "outline": [{ "x": 0, "y": 0 }, { "x": 10, "y": 0 }, { "x": 10, "y": 10 }],
            "manualEdits": { "pcb_placements": [] }
        }))
        .unwrap();
        let sub = props.subcircuit.as_ref().unwrap();
        assert_eq!(sub.empty_area, Some(AreaHint::Percent(20.0)));
        assert_eq!(sub.outline.as_ref().map(|o| o.len()), Some(3));
        assert!(sub.manual_edits.is_some());
        assert!(props
            .lints
            .iter()
            .any(|l| matches!(l, Lint::TraceWidthBelowMinimum { .. })));
    }

    #[test]
    fn test_non_object_group() {
        let err = validate(json!([1, 2])).unwrap_err();
        assert_eq!(err.issues()[0].key, "root");
    }

    #[test]
    fn test_invalid_distance_is_reported_with_key() {
        let err = validate(json!({ "pcbWidth": "10 bananas" })).unwrap_err();
        match err {
            SchemaError::InvalidDistance { key, .. } => assert_eq!(key, "pcbWidth"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
