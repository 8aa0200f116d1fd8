//! Option Schema
//!
//! Declares every recognized group property, its accepted value shapes and
//! its absence semantics, and validates raw JSON props into typed,
//! already-normalized [`GroupProps`] in a single pass.

pub mod autorouter;
pub mod group;
pub mod keyword;
pub mod layout_config;
pub mod validate;

use serde::Serialize;
use std::fmt;

pub use autorouter::{
    AutorouterConfigInput, AutorouterPreset, AutorouterProp, GroupMode, InputFormat, PcbRouteCache,
    PcbTrace, ServerMode,
};
pub use group::{
    validate_group, BaseGroupProps, Border, BorderSetting, GroupProps, PlacementHints,
    SubcircuitProps,
};
pub use keyword::Keyword;
pub use layout_config::{
    AlignItems, FlexDirection, FlexFlag, GridTracks, JustifyContent, KeySet, LayoutConfig,
    LayoutModeKind, PackOrderStrategy, PackPlacementStrategy, Position,
};
pub use validate::{IssueKind, SchemaError, SchemaIssue};

/// One of the two independent rendering targets of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Pcb,
    Schematic,
}

impl View {
    pub const ALL: [View; 2] = [View::Pcb, View::Schematic];

    /// Key prefix of the view-specific top-level props.
    pub fn prefix(self) -> &'static str {
        match self {
            View::Pcb => "pcb",
            View::Schematic => "sch",
        }
    }

    /// Name of the nested override object.
    pub fn layout_key(self) -> &'static str {
        match self {
            View::Pcb => "pcbLayout",
            View::Schematic => "schLayout",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Pcb => f.write_str("PCB"),
            View::Schematic => f.write_str("schematic"),
        }
    }
}
