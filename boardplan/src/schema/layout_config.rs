//! Layout configuration keys shared by the generic layer, the view-prefixed
//! `pcb*`/`sch*` keys and the nested `pcbLayout`/`schLayout` objects.

use serde::Serialize;
use serde_json::Value;

use crate::schema::keyword::keyword_enum;
use crate::schema::validate::{FieldReader, IssueKind, Report};
use crate::schema::View;
use crate::units::Distance;

keyword_enum! {
    /// Explicitly requested layout mode
    pub enum LayoutModeKind {
        Grid => "grid",
        Flex => "flex",
        MatchAdapt => "match-adapt",
        Relative => "relative",
        None => "none",
    }
}

keyword_enum! {
    pub enum Position {
        Absolute => "absolute",
        Relative => "relative",
    }
}

keyword_enum! {
    pub enum FlexDirection {
        Row => "row",
        Column => "column",
    }
}

keyword_enum! {
    pub enum AlignItems {
        Start => "start",
        Center => "center",
        End => "end",
        Stretch => "stretch",
    }
}

keyword_enum! {
    pub enum JustifyContent {
        Start => "start",
        Center => "center",
        End => "end",
        Stretch => "stretch",
        SpaceBetween => "space-between",
        SpaceAround => "space-around",
        SpaceEvenly => "space-evenly",
    }
}

keyword_enum! {
    /// Order in which children are visited before packing
    pub enum PackOrderStrategy {
        LargestToSmallest => "largest_to_smallest",
        FirstToLast => "first_to_last",
        HighestToLowestPinCount => "highest_to_lowest_pin_count",
    }
}

keyword_enum! {
    pub enum PackPlacementStrategy {
        ShortestConnectionAlongOutline => "shortest_connection_along_outline",
    }
}

/// `gridCols` / `gridRows`: a track count or a track template such as `"1fr 2fr"`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GridTracks {
    Count(u32),
    Template(String),
}

/// `flex` accepts a boolean or a string
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlexFlag {
    Bool(bool),
    Text(String),
}

impl FlexFlag {
    pub fn is_truthy(&self) -> bool {
        match self {
            FlexFlag::Bool(b) => *b,
            FlexFlag::Text(s) => !s.is_empty(),
        }
    }

    pub fn is_explicit_off(&self) -> bool {
        matches!(self, FlexFlag::Bool(false))
    }

    /// `flex: "column"` doubles as a direction shorthand.
    pub fn direction(&self) -> Option<FlexDirection> {
        match self {
            FlexFlag::Text(s) if s == "row" => Some(FlexDirection::Row),
            FlexFlag::Text(s) if s == "column" => Some(FlexDirection::Column),
            _ => None,
        }
    }
}

/// One layer of layout options. Every field is optional; absence means
/// "not set at this layer".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub layout_mode: Option<LayoutModeKind>,
    pub position: Option<Position>,

    pub grid: Option<bool>,
    pub grid_cols: Option<GridTracks>,
    pub grid_rows: Option<GridTracks>,
    pub grid_template_rows: Option<String>,
    pub grid_template_columns: Option<String>,
    pub grid_template: Option<String>,
    pub grid_gap: Option<Distance>,
    pub grid_row_gap: Option<Distance>,
    pub grid_column_gap: Option<Distance>,

    pub flex: Option<FlexFlag>,
    pub flex_direction: Option<FlexDirection>,
    pub align_items: Option<AlignItems>,
    pub justify_content: Option<JustifyContent>,
    pub flex_row: Option<bool>,
    pub flex_column: Option<bool>,
    /// Only settable through `pcbFlexGap` / `schFlexGap`.
    pub flex_gap: Option<Distance>,
    pub gap: Option<Distance>,

    pub pack: Option<bool>,
    pub pack_order_strategy: Option<PackOrderStrategy>,
    pub pack_placement_strategy: Option<PackPlacementStrategy>,

    pub padding: Option<Distance>,
    pub padding_left: Option<Distance>,
    pub padding_right: Option<Distance>,
    pub padding_top: Option<Distance>,
    pub padding_bottom: Option<Distance>,
    pub padding_x: Option<Distance>,
    pub padding_y: Option<Distance>,

    pub width: Option<Distance>,
    pub height: Option<Distance>,

    pub match_adapt: Option<bool>,
    pub match_adapt_template: Option<Value>,
}

/// Which key set a layer is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySet {
    /// Unprefixed keys: the group's top level or a nested `pcbLayout`/`schLayout`.
    Full,
    /// `pcb*` / `sch*` top-level keys.
    Prefixed(View),
}

/// Base names accepted with a view prefix (`pcbGridCols`, `schPack`, ...).
const PREFIXED_KEYS: &[&str] = &[
    "grid",
    "gridCols",
    "gridRows",
    "gridTemplateRows",
    "gridTemplateColumns",
    "gridTemplate",
    "gridGap",
    "gridRowGap",
    "gridColumnGap",
    "flex",
    "flexGap",
    "flexDirection",
    "alignItems",
    "justifyContent",
    "flexRow",
    "flexColumn",
    "gap",
    "pack",
    "width",
    "height",
    "padding",
    "paddingLeft",
    "paddingRight",
    "paddingTop",
    "paddingBottom",
];

/// Unprefixed layout keys.
pub const LAYOUT_KEYS: &[&str] = &[
    "layoutMode",
    "position",
    "grid",
    "gridCols",
    "gridRows",
    "gridTemplateRows",
    "gridTemplateColumns",
    "gridTemplate",
    "gridGap",
    "gridRowGap",
    "gridColumnGap",
    "flex",
    "flexDirection",
    "alignItems",
    "justifyContent",
    "flexRow",
    "flexColumn",
    "gap",
    "pack",
    "packOrderStrategy",
    "packPlacementStrategy",
    "padding",
    "paddingLeft",
    "paddingRight",
    "paddingTop",
    "paddingBottom",
    "paddingX",
    "paddingY",
    "width",
    "height",
    "matchAdapt",
    "matchAdaptTemplate",
];

impl KeySet {
    fn allows(self, base: &str) -> bool {
        match self {
            KeySet::Full => LAYOUT_KEYS.contains(&base),
            KeySet::Prefixed(View::Schematic) if base == "matchAdapt" => true,
            KeySet::Prefixed(_) => PREFIXED_KEYS.contains(&base),
        }
    }

    pub fn key(self, base: &str) -> String {
        match self {
            KeySet::Full => base.to_string(),
            KeySet::Prefixed(view) => {
                let mut chars = base.chars();
                let head = chars.next().map(|c| c.to_ascii_uppercase());
                format!("{}{}{}", view.prefix(), head.unwrap_or_default(), chars.as_str())
            }
        }
    }

    /// Every concrete key name in this set.
    pub fn keys(self) -> Vec<String> {
        let bases: Vec<&str> = match self {
            KeySet::Full => LAYOUT_KEYS.to_vec(),
            KeySet::Prefixed(View::Pcb) => PREFIXED_KEYS.to_vec(),
            KeySet::Prefixed(View::Schematic) => {
                let mut keys = PREFIXED_KEYS.to_vec();
                keys.push("matchAdapt");
                keys
            }
        };
        bases.into_iter().map(|b| self.key(b)).collect()
    }
}

fn read_tracks(reader: &mut FieldReader<'_>, report: &mut Report, key: &str) -> Option<GridTracks> {
    let value = reader.take(key)?;
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(count) if count >= 1 && count <= u32::MAX as u64 => Some(GridTracks::Count(count as u32)),
            _ => {
                report.issue(
                    reader.qualify(key),
                    IssueKind::Invalid(format!("track count must be a positive integer, got {}", n)),
                );
                None
            }
        },
        Value::String(s) => Some(GridTracks::Template(s.clone())),
        other => {
            report.issue(
                reader.qualify(key),
                IssueKind::WrongType {
                    expected: "number or string",
                    found: crate::schema::validate::type_name(other),
                },
            );
            None
        }
    }
}

fn read_flex(reader: &mut FieldReader<'_>, report: &mut Report, key: &str) -> Option<FlexFlag> {
    let value = reader.take(key)?;
    match value {
        Value::Bool(b) => Some(FlexFlag::Bool(*b)),
        Value::String(s) => Some(FlexFlag::Text(s.clone())),
        other => {
            report.issue(
                reader.qualify(key),
                IssueKind::WrongType {
                    expected: "boolean or string",
                    found: crate::schema::validate::type_name(other),
                },
            );
            None
        }
    }
}

impl LayoutConfig {
    /// Read one layer from `reader` using the key names of `keys`.
    pub fn read(reader: &mut FieldReader<'_>, report: &mut Report, keys: KeySet) -> Self {
        let mut cfg = LayoutConfig::default();

        macro_rules! field {
            ($base:literal, |$k:ident| $read:expr) => {
                if keys.allows($base) {
                    let name = keys.key($base);
                    let $k = name.as_str();
                    $read
                } else {
                    None
                }
            };
        }

        cfg.layout_mode = field!("layoutMode", |k| reader.keyword(report, k));
        cfg.position = field!("position", |k| reader.keyword(report, k));

        cfg.grid = field!("grid", |k| reader.boolean(report, k));
        cfg.grid_cols = field!("gridCols", |k| read_tracks(reader, report, k));
        cfg.grid_rows = field!("gridRows", |k| read_tracks(reader, report, k));
        cfg.grid_template_rows = field!("gridTemplateRows", |k| reader.string(report, k));
        cfg.grid_template_columns =
            field!("gridTemplateColumns", |k| reader.string(report, k));
        cfg.grid_template = field!("gridTemplate", |k| reader.string(report, k));
        cfg.grid_gap = field!("gridGap", |k| reader.length(report, k));
        cfg.grid_row_gap = field!("gridRowGap", |k| reader.length(report, k));
        cfg.grid_column_gap = field!("gridColumnGap", |k| reader.length(report, k));

        cfg.flex = field!("flex", |k| read_flex(reader, report, k));
        cfg.flex_direction = field!("flexDirection", |k| reader.keyword(report, k));
        cfg.align_items = field!("alignItems", |k| reader.keyword(report, k));
        cfg.justify_content = field!("justifyContent", |k| reader.keyword(report, k));
        cfg.flex_row = field!("flexRow", |k| reader.boolean(report, k));
        cfg.flex_column = field!("flexColumn", |k| reader.boolean(report, k));
        cfg.flex_gap = field!("flexGap", |k| reader.length(report, k));
        cfg.gap = field!("gap", |k| reader.length(report, k));

        cfg.pack = field!("pack", |k| reader.boolean(report, k));
        cfg.pack_order_strategy = field!("packOrderStrategy", |k| reader.keyword(report, k));
        cfg.pack_placement_strategy =
            field!("packPlacementStrategy", |k| reader.keyword(report, k));

        cfg.padding = field!("padding", |k| reader.length(report, k));
        cfg.padding_left = field!("paddingLeft", |k| reader.length(report, k));
        cfg.padding_right = field!("paddingRight", |k| reader.length(report, k));
        cfg.padding_top = field!("paddingTop", |k| reader.length(report, k));
        cfg.padding_bottom = field!("paddingBottom", |k| reader.length(report, k));
        cfg.padding_x = field!("paddingX", |k| reader.length(report, k));
        cfg.padding_y = field!("paddingY", |k| reader.length(report, k));

        cfg.width = field!("width", |k| reader.length(report, k));
        cfg.height = field!("height", |k| reader.length(report, k));

        cfg.match_adapt = field!("matchAdapt", |k| reader.boolean(report, k));
        cfg.match_adapt_template = field!("matchAdaptTemplate", |k| reader.opaque(k));

        cfg
    }

    /// Field-by-field overlay: every field set in `higher` replaces the
    /// corresponding field of `self`.
    pub fn overlay(&self, higher: &LayoutConfig) -> LayoutConfig {
        macro_rules! pick {
            ($($field:ident),+ $(,)?) => {
                LayoutConfig {
                    $($field: higher.$field.clone().or_else(|| self.$field.clone()),)+
                }
            };
        }

        pick!(
            layout_mode,
            position,
            grid,
            grid_cols,
            grid_rows,
            grid_template_rows,
            grid_template_columns,
            grid_template,
            grid_gap,
            grid_row_gap,
            grid_column_gap,
            flex,
            flex_direction,
            align_items,
            justify_content,
            flex_row,
            flex_column,
            flex_gap,
            gap,
            pack,
            pack_order_strategy,
            pack_placement_strategy,
            padding,
            padding_left,
            padding_right,
            padding_top,
            padding_bottom,
            padding_x,
            padding_y,
            width,
            height,
            match_adapt,
            match_adapt_template,
        )
    }

    pub fn has_grid_fields(&self) -> bool {
        self.grid_cols.is_some()
            || self.grid_rows.is_some()
            || self.grid_template_rows.is_some()
            || self.grid_template_columns.is_some()
            || self.grid_template.is_some()
            || self.grid_gap.is_some()
            || self.grid_row_gap.is_some()
            || self.grid_column_gap.is_some()
    }

    pub fn has_flex_fields(&self) -> bool {
        self.flex_direction.is_some()
            || self.align_items.is_some()
            || self.justify_content.is_some()
            || self.flex_row.is_some()
            || self.flex_column.is_some()
            || self.flex_gap.is_some()
    }

    pub fn has_pack_fields(&self) -> bool {
        self.pack_order_strategy.is_some() || self.pack_placement_strategy.is_some()
    }

    pub fn has_match_adapt_fields(&self) -> bool {
        self.match_adapt_template.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MillimeterNormalizer;
    use serde_json::json;

    fn read(value: Value, keys: KeySet) -> (LayoutConfig, Report) {
        let map = value.as_object().cloned().unwrap();
        let mut reader = FieldReader::new(&map, &MillimeterNormalizer);
        let mut report = Report::default();
        let cfg = LayoutConfig::read(&mut reader, &mut report, keys);
        (cfg, report)
    }

    #[test]
    fn test_prefixed_key_names() {
        assert_eq!(KeySet::Prefixed(View::Pcb).key("gridCols"), "pcbGridCols");
        assert_eq!(KeySet::Prefixed(View::Schematic).key("pack"), "schPack");
        assert_eq!(KeySet::Full.key("gap"), "gap");
    }

    #[test]
    fn test_match_adapt_prefix_is_schematic_only() {
        assert!(KeySet::Prefixed(View::Schematic)
            .keys()
            .contains(&"schMatchAdapt".to_string()));
        assert!(!KeySet::Prefixed(View::Pcb)
            .keys()
            .contains(&"pcbMatchAdapt".to_string()));
    }

    #[test]
    fn test_read_prefixed_layer() {
        let (cfg, report) = read(
            json!({ "pcbGridCols": 3, "pcbGap": "2mm", "gap": 9, "pcbLayoutMode": "grid" }),
            KeySet::Prefixed(View::Pcb),
        );
        assert!(report.issues.is_empty());
        assert_eq!(cfg.grid_cols, Some(GridTracks::Count(3)));
        assert_eq!(cfg.gap, Some(Distance::from_mm(2.0)));
        assert_eq!(cfg.layout_mode, None);
    }

    #[test]
    fn test_unknown_enum_value_names_key() {
        let (_, report) = read(json!({ "justifyContent": "space-out" }), KeySet::Full);
        assert_eq!(report.issues.len(), 1);
        let message = report.issues[0].to_string();
        assert!(message.contains("justifyContent"));
        assert!(message.contains("space-evenly"));
    }

    #[test]
    fn test_track_count_must_be_positive_integer() {
        let (_, report) = read(json!({ "gridCols": 0, "gridRows": 2.5 }), KeySet::Full);
        assert_eq!(report.issues.len(), 2);
        let (cfg, report) = read(json!({ "gridCols": "1fr 2fr" }), KeySet::Full);
        assert!(report.issues.is_empty());
        assert_eq!(cfg.grid_cols, Some(GridTracks::Template("1fr 2fr".into())));
    }

    #[test]
    fn test_overlay_is_field_by_field() {
        let low = LayoutConfig {
            gap: Some(Distance::from_mm(2.0)),
            flex_direction: Some(FlexDirection::Column),
            ..Default::default()
        };
        let high = LayoutConfig {
            gap: Some(Distance::from_mm(5.0)),
            ..Default::default()
        };
        let merged = low.overlay(&high);
        assert_eq!(merged.gap, Some(Distance::from_mm(5.0)));
        assert_eq!(merged.flex_direction, Some(FlexDirection::Column));
    }

    #[test]
    fn test_flex_flag() {
        assert!(FlexFlag::Text("column".into()).is_truthy());
        assert!(!FlexFlag::Text(String::new()).is_truthy());
        assert!(FlexFlag::Bool(false).is_explicit_off());
        assert_eq!(
            FlexFlag::Text("column".into()).direction(),
            Some(FlexDirection::Column)
        );
    }
}
