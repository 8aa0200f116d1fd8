//! Physical Distances
//!
//! Raw length values arrive as `number | string` and are normalized into a
//! canonical [`Distance`] (millimetres) through a [`LengthNormalizer`].
//! Bare numbers are millimetres; strings may carry a unit suffix.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

const MM_PER_INCH: f64 = 25.4;
const MM_PER_MIL: f64 = 0.0254;

/// A physical distance in millimetres
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distance(f64);

impl Distance {
    pub const ZERO: Distance = Distance(0.0);

    pub fn from_mm(mm: f64) -> Self {
        Self(mm)
    }

    pub fn mm(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mm", self.0)
    }
}

/// A 2D point in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: Distance,
    pub y: Distance,
}

/// A length as written by the author, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLength {
    Number(f64),
    Text(String),
}

impl RawLength {
    /// Accepts only JSON numbers and strings; anything else is not a length.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(RawLength::Number),
            Value::String(s) => Some(RawLength::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RawLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawLength::Number(n) => write!(f, "{}", n),
            RawLength::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid distance `{value}`: {reason}")]
pub struct InvalidDistanceError {
    pub value: String,
    pub reason: String,
}

impl InvalidDistanceError {
    fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Converts raw lengths and points into physical distances.
///
/// Implementations must be deterministic: the same raw input always yields
/// the same [`Distance`], since resolved distances feed route fingerprints.
pub trait LengthNormalizer: Send + Sync + std::fmt::Debug {
    fn length(&self, raw: &RawLength) -> Result<Distance, InvalidDistanceError>;

    fn point(&self, x: &RawLength, y: &RawLength) -> Result<Point, InvalidDistanceError> {
        Ok(Point {
            x: self.length(x)?,
            y: self.length(y)?,
        })
    }
}

/// Default normalizer: numbers are millimetres, strings accept
/// `mm`, `cm`, `um`, `in` and `mil` suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MillimeterNormalizer;

impl LengthNormalizer for MillimeterNormalizer {
    fn length(&self, raw: &RawLength) -> Result<Distance, InvalidDistanceError> {
        match raw {
            RawLength::Number(n) => finite(*n, &n.to_string()),
            RawLength::Text(text) => parse_length(text),
        }
    }
}

fn finite(mm: f64, original: &str) -> Result<Distance, InvalidDistanceError> {
    if mm.is_finite() {
        Ok(Distance(mm))
    } else {
        Err(InvalidDistanceError::new(original, "not a finite number"))
    }
}

fn split_number(text: &str) -> (&str, &str) {
    let end = text
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    // "1e" or "2em" style suffixes: back off a trailing exponent marker
    let (mut num, mut unit) = text.split_at(end);
    if num.ends_with(['e', 'E']) {
        num = &text[..end - 1];
        unit = &text[end - 1..];
    }
    (num, unit.trim())
}

fn parse_length(text: &str) -> Result<Distance, InvalidDistanceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InvalidDistanceError::new(text, "empty string"));
    }
    let (num, unit) = split_number(trimmed);
    let value: f64 = num
        .parse()
        .map_err(|_| InvalidDistanceError::new(text, "expected a number with an optional unit"))?;
    let scale = match unit {
        "" | "mm" => 1.0,
        "cm" => 10.0,
        "um" | "µm" => 0.001,
        "in" => MM_PER_INCH,
        "mil" => MM_PER_MIL,
        other => {
            return Err(InvalidDistanceError::new(
                text,
                format!("unknown unit `{}`", other),
            ))
        }
    };
    finite(value * scale, text)
}

/// Board sizing hint for `emptyArea` / `filledArea`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum AreaHint {
    /// Absolute area in square millimetres
    Absolute(f64),
    /// Percentage of the board area
    Percent(f64),
}

impl AreaHint {
    /// Parse `"22mm^2"`, `"1.5cm^2"`, `"0.2in^2"` or `"20%"`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        if let Some(pct) = trimmed.strip_suffix('%') {
            let value: f64 = pct
                .trim()
                .parse()
                .map_err(|_| format!("`{}` is not a percentage", text))?;
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("`{}` must be between 0% and 100%", text));
            }
            return Ok(AreaHint::Percent(value));
        }

        let (num, unit) = split_number(trimmed);
        let value: f64 = num
            .parse()
            .map_err(|_| format!("`{}` is not an area", text))?;
        let scale = match unit {
            "" | "mm^2" | "mm2" => 1.0,
            "cm^2" | "cm2" => 100.0,
            "in^2" | "in2" => MM_PER_INCH * MM_PER_INCH,
            other => return Err(format!("unknown area unit `{}` in `{}`", other, text)),
        };
        if value < 0.0 {
            return Err(format!("`{}` must not be negative", text));
        }
        Ok(AreaHint::Absolute(value * scale))
    }
}
