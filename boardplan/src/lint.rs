//! Non-fatal findings about a group declaration.
//!
//! Lints never change how a declaration resolves. They flag inputs that are
//! accepted but ambiguous or deprecated, and can be promoted to errors with
//! [`crate::ResolveOptions::strict_lints`].

use serde::Serialize;
use std::fmt;

use crate::schema::{LayoutModeKind, View};
use crate::units::Distance;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "lint", rename_all = "snake_case")]
pub enum Lint {
    /// The unprefixed `grid` / `flex` keys apply to the PCB view only.
    DeprecatedAlias {
        key: &'static str,
        replacement: &'static str,
    },
    /// Both `dashed` and `solid` were set on one border.
    AmbiguousBorderStyle { key: &'static str },
    /// `flexRow` and `flexColumn` were both true.
    AmbiguousFlexDirection { view: View },
    /// `pack` was set alongside an explicit `layoutMode`.
    IgnoredPackTrigger { view: View, mode: LayoutModeKind },
    /// A subcircuit-only key on a plain group.
    SubcircuitOnlyKey { key: String },
    TraceWidthBelowMinimum { default: Distance, min: Distance },
    ConflictingAreaHints,
    /// `algorithmFn` overrides the server fields that were also supplied.
    IgnoredServerFields { algorithm: String },
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lint::DeprecatedAlias { key, replacement } => write!(
                f,
                "`{}` is deprecated and applies to the PCB view only; use `{}`",
                key, replacement
            ),
            Lint::AmbiguousBorderStyle { key } => write!(
                f,
                "`{}` sets both `dashed` and `solid`; the stroke style is ambiguous",
                key
            ),
            Lint::AmbiguousFlexDirection { view } => write!(
                f,
                "{} view sets both flexRow and flexColumn; flexColumn is used",
                view
            ),
            Lint::IgnoredPackTrigger { view, mode } => write!(
                f,
                "{} view: `pack` is ignored because layoutMode is \"{}\"",
                view, mode
            ),
            Lint::SubcircuitOnlyKey { key } => write!(
                f,
                "`{}` only applies to subcircuit groups and is ignored",
                key
            ),
            Lint::TraceWidthBelowMinimum { default, min } => write!(
                f,
                "defaultTraceWidth {} is below minTraceWidth {}",
                default, min
            ),
            Lint::ConflictingAreaHints => {
                write!(f, "both emptyArea and filledArea are set; the board sizer decides")
            }
            Lint::IgnoredServerFields { algorithm } => write!(
                f,
                "algorithmFn `{}` is used; server fields are ignored",
                algorithm
            ),
        }
    }
}
