//! The resolved layout strategy of one view.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::schema::{
    AlignItems, FlexDirection, GridTracks, JustifyContent, PackOrderStrategy,
    PackPlacementStrategy,
};
use crate::units::Distance;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridParams {
    pub cols: Option<GridTracks>,
    pub rows: Option<GridTracks>,
    pub template_rows: Option<String>,
    pub template_columns: Option<String>,
    pub template: Option<String>,
    pub row_gap: Option<Distance>,
    pub column_gap: Option<Distance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlexParams {
    pub direction: FlexDirection,
    pub align_items: Option<AlignItems>,
    pub justify_content: Option<JustifyContent>,
    pub gap: Option<Distance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackParams {
    pub order_strategy: Option<PackOrderStrategy>,
    pub placement_strategy: Option<PackPlacementStrategy>,
    pub gap: Option<Distance>,
}

/// Passthrough of `matchAdaptTemplate`; interpreting it is the placement
/// engine's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchAdaptParams {
    pub template: Option<Value>,
}

/// Exactly one of these per view. Downstream consumers read only this, never
/// the raw option fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum LayoutMode {
    Grid(GridParams),
    Flex(FlexParams),
    Pack(PackParams),
    MatchAdapt(MatchAdaptParams),
    /// Children are positioned by their own coordinates.
    Relative,
    None,
}

impl LayoutMode {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutMode::Grid(_) => "grid",
            LayoutMode::Flex(_) => "flex",
            LayoutMode::Pack(_) => "pack",
            LayoutMode::MatchAdapt(_) => "match-adapt",
            LayoutMode::Relative => "relative",
            LayoutMode::None => "none",
        }
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, LayoutMode::Grid(_))
    }

    pub fn is_flex(&self) -> bool {
        matches!(self, LayoutMode::Flex(_))
    }

    pub fn is_pack(&self) -> bool {
        matches!(self, LayoutMode::Pack(_))
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A group of keys that can switch a view into one placement mode.
/// Declaration order is the fixed evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeFamily {
    Pack,
    Grid,
    Flex,
    MatchAdapt,
}

impl ModeFamily {
    pub const PRIORITY: [ModeFamily; 4] = [
        ModeFamily::Pack,
        ModeFamily::Grid,
        ModeFamily::Flex,
        ModeFamily::MatchAdapt,
    ];
}

impl fmt::Display for ModeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeFamily::Pack => "pack",
            ModeFamily::Grid => "grid",
            ModeFamily::Flex => "flex",
            ModeFamily::MatchAdapt => "match-adapt",
        };
        f.write_str(name)
    }
}
