//! Field-level validation and normalization.
//!
//! A [`FieldReader`] walks one JSON object, checks each recognized key against
//! its accepted shapes and normalizes lengths in the same pass. Problems are
//! collected into a [`Report`] instead of aborting on the first one.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::schema::keyword::Keyword;
use crate::units::{AreaHint, Distance, InvalidDistanceError, LengthNormalizer, Point, RawLength};

/// What was wrong with a single key
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    UnknownVariant {
        value: String,
        expected: String,
    },
    Invalid(String),
}

/// A single rejected key
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaIssue {
    pub key: String,
    pub kind: IssueKind,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::WrongType { expected, found } => {
                write!(f, "`{}`: expected {}, found {}", self.key, expected, found)
            }
            IssueKind::UnknownVariant { value, expected } => write!(
                f,
                "`{}`: unknown value \"{}\", expected one of {}",
                self.key, value, expected
            ),
            IssueKind::Invalid(message) => write!(f, "`{}`: {}", self.key, message),
        }
    }
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("group `{group}` failed validation: {}", join_issues(.issues))]
    Validation {
        group: String,
        issues: Vec<SchemaIssue>,
    },
    #[error("group `{group}`: invalid distance for `{key}`: {source}")]
    InvalidDistance {
        group: String,
        key: String,
        #[source]
        source: InvalidDistanceError,
    },
}

impl SchemaError {
    pub fn group(&self) -> &str {
        match self {
            SchemaError::Validation { group, .. } | SchemaError::InvalidDistance { group, .. } => {
                group
            }
        }
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            SchemaError::Validation { issues, .. } => issues,
            SchemaError::InvalidDistance { .. } => &[],
        }
    }
}

/// Accumulated problems for one group
#[derive(Debug, Default)]
pub struct Report {
    pub issues: Vec<SchemaIssue>,
    pub distance_errors: Vec<(String, InvalidDistanceError)>,
}

impl Report {
    pub fn issue(&mut self, key: impl Into<String>, kind: IssueKind) {
        self.issues.push(SchemaIssue {
            key: key.into(),
            kind,
        });
    }

    /// Shape issues win over distance errors: a structurally wrong
    /// declaration is reported as a whole before any unit problem.
    pub fn finish(self, group: &str) -> Result<(), SchemaError> {
        if !self.issues.is_empty() {
            return Err(SchemaError::Validation {
                group: group.to_string(),
                issues: self.issues,
            });
        }
        if let Some((key, source)) = self.distance_errors.into_iter().next() {
            return Err(SchemaError::InvalidDistance {
                group: group.to_string(),
                key,
                source,
            });
        }
        Ok(())
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads typed values out of one JSON object.
pub struct FieldReader<'a> {
    obj: &'a Map<String, Value>,
    scope: String,
    normalizer: &'a dyn LengthNormalizer,
    seen: HashSet<&'a str>,
}

impl<'a> FieldReader<'a> {
    pub fn new(obj: &'a Map<String, Value>, normalizer: &'a dyn LengthNormalizer) -> Self {
        Self {
            obj,
            scope: String::new(),
            normalizer,
            seen: HashSet::new(),
        }
    }

    /// Reader for a nested object; reported keys are qualified as `scope.key`.
    pub fn nested(
        obj: &'a Map<String, Value>,
        scope: &str,
        normalizer: &'a dyn LengthNormalizer,
    ) -> Self {
        Self {
            obj,
            scope: format!("{}.", scope),
            normalizer,
            seen: HashSet::new(),
        }
    }

    pub fn normalizer(&self) -> &'a dyn LengthNormalizer {
        self.normalizer
    }

    pub fn qualify(&self, key: &str) -> String {
        format!("{}{}", self.scope, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.obj.contains_key(key)
    }

    /// Keys present in the object that no read touched.
    pub fn unrecognized(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .obj
            .keys()
            .filter(|k| !self.seen.contains(k.as_str()))
            .map(|k| self.qualify(k))
            .collect();
        keys.sort();
        keys
    }

    pub fn take(&mut self, key: &str) -> Option<&'a Value> {
        let (name, value) = self.obj.get_key_value(key)?;
        self.seen.insert(name.as_str());
        Some(value)
    }

    fn wrong_type(&self, report: &mut Report, key: &str, expected: &'static str, value: &Value) {
        report.issue(
            self.qualify(key),
            IssueKind::WrongType {
                expected,
                found: type_name(value),
            },
        );
    }

    pub fn boolean(&mut self, report: &mut Report, key: &str) -> Option<bool> {
        let value = self.take(key)?;
        match value {
            Value::Bool(b) => Some(*b),
            other => {
                self.wrong_type(report, key, "boolean", other);
                None
            }
        }
    }

    pub fn string(&mut self, report: &mut Report, key: &str) -> Option<String> {
        let value = self.take(key)?;
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.wrong_type(report, key, "string", other);
                None
            }
        }
    }

    pub fn keyword<K: Keyword>(&mut self, report: &mut Report, key: &str) -> Option<K> {
        let value = self.take(key)?;
        let Value::String(token) = value else {
            self.wrong_type(report, key, "string", value);
            return None;
        };
        match K::parse(token) {
            Some(k) => Some(k),
            None => {
                report.issue(
                    self.qualify(key),
                    IssueKind::UnknownVariant {
                        value: token.clone(),
                        expected: K::expected(),
                    },
                );
                None
            }
        }
    }

    fn normalize(&self, report: &mut Report, key: &str, raw: &RawLength) -> Option<Distance> {
        match self.normalizer.length(raw) {
            Ok(d) => Some(d),
            Err(e) => {
                report.distance_errors.push((self.qualify(key), e));
                None
            }
        }
    }

    pub fn length(&mut self, report: &mut Report, key: &str) -> Option<Distance> {
        let value = self.take(key)?;
        match RawLength::from_json(value) {
            Some(raw) => self.normalize(report, key, &raw),
            None => {
                self.wrong_type(report, key, "number or string", value);
                None
            }
        }
    }

    pub fn area(&mut self, report: &mut Report, key: &str) -> Option<AreaHint> {
        let text = self.string(report, key)?;
        match AreaHint::parse(&text) {
            Ok(hint) => Some(hint),
            Err(message) => {
                report.issue(self.qualify(key), IssueKind::Invalid(message));
                None
            }
        }
    }

    pub fn points(&mut self, report: &mut Report, key: &str) -> Option<Vec<Point>> {
        let value = self.take(key)?;
        let Value::Array(items) = value else {
            self.wrong_type(report, key, "array of points", value);
            return None;
        };
        let mut points = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_key = format!("{}[{}]", key, i);
            let coords = item
                .as_object()
                .and_then(|o| Some((o.get("x")?, o.get("y")?)))
                .and_then(|(x, y)| Some((RawLength::from_json(x)?, RawLength::from_json(y)?)));
            let Some((x, y)) = coords else {
                self.wrong_type(report, &item_key, "{x, y} point", item);
                return None;
            };
            match self.normalizer.point(&x, &y) {
                Ok(p) => points.push(p),
                Err(e) => {
                    report.distance_errors.push((self.qualify(&item_key), e));
                    return None;
                }
            }
        }
        Some(points)
    }

    pub fn object(&mut self, report: &mut Report, key: &str) -> Option<&'a Map<String, Value>> {
        let value = self.take(key)?;
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.wrong_type(report, key, "object", other);
                None
            }
        }
    }

    /// Opaque passthrough; any JSON value is accepted.
    pub fn opaque(&mut self, key: &str) -> Option<Value> {
        self.take(key).cloned()
    }
}
