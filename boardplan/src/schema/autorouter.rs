//! Autorouter property schema: the preset shorthand, the explicit config
//! object and the route cache record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::keyword::{keyword_enum, Keyword};
use crate::schema::validate::{type_name, FieldReader, IssueKind, Report};
use crate::units::Distance;

keyword_enum! {
    pub enum AutorouterPreset {
        SequentialTrace => "sequential-trace",
        Subcircuit => "subcircuit",
        Auto => "auto",
        AutoLocal => "auto-local",
        AutoCloud => "auto-cloud",
    }
}

keyword_enum! {
    pub enum InputFormat {
        Simplified => "simplified",
        CircuitJson => "circuit-json",
    }
}

keyword_enum! {
    pub enum ServerMode {
        Job => "job",
        SolveEndpoint => "solve-endpoint",
    }
}

keyword_enum! {
    pub enum GroupMode {
        SequentialTrace => "sequential-trace",
        Subcircuit => "subcircuit",
    }
}

/// A routed copper trace as produced by the routing backend.
///
/// Only `pcb_trace_id` and `route` are interpreted; everything else is
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbTrace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_trace_id: Option<String>,
    #[serde(default)]
    pub route: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PcbTrace {
    pub fn new(id: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("type".to_string(), Value::String("pcb_trace".to_string()));
        Self {
            pcb_trace_id: Some(id.into()),
            route: Vec::new(),
            extra,
        }
    }
}

/// Previously computed traces for one routing fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcbRouteCache {
    pub pcb_traces: Vec<PcbTrace>,
    pub cache_key: String,
}

/// The object form of the `autorouter` prop, as written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutorouterConfigInput {
    pub server_url: Option<String>,
    pub input_format: Option<InputFormat>,
    pub server_mode: Option<ServerMode>,
    pub server_cache_enabled: Option<bool>,
    pub cache: Option<PcbRouteCache>,
    pub trace_clearance: Option<Distance>,
    pub group_mode: Option<GroupMode>,
    pub local: Option<bool>,
    /// Name of a routing algorithm registered with the coordinator.
    pub algorithm_fn: Option<String>,
    pub preset: Option<AutorouterPreset>,
}

/// `autorouter`: a preset token or a config object
#[derive(Debug, Clone, PartialEq)]
pub enum AutorouterProp {
    Preset(AutorouterPreset),
    Explicit(AutorouterConfigInput),
}

pub const AUTOROUTER_KEYS: &[&str] = &[
    "serverUrl",
    "inputFormat",
    "serverMode",
    "serverCacheEnabled",
    "cache",
    "traceClearance",
    "groupMode",
    "local",
    "algorithmFn",
    "preset",
];

pub(crate) fn read_route_cache(
    reader: &mut FieldReader<'_>,
    report: &mut Report,
    key: &str,
) -> Option<PcbRouteCache> {
    let value = reader.take(key)?;
    match serde_json::from_value::<PcbRouteCache>(value.clone()) {
        Ok(cache) => Some(cache),
        Err(e) => {
            report.issue(
                reader.qualify(key),
                IssueKind::Invalid(format!("expected {{pcbTraces, cacheKey}}: {}", e)),
            );
            None
        }
    }
}

pub(crate) fn read_autorouter(
    reader: &mut FieldReader<'_>,
    report: &mut Report,
    key: &str,
) -> Option<AutorouterProp> {
    let value = reader.take(key)?;
    match value {
        Value::String(token) => match AutorouterPreset::parse(token) {
            Some(preset) => Some(AutorouterProp::Preset(preset)),
            None => {
                report.issue(
                    reader.qualify(key),
                    IssueKind::UnknownVariant {
                        value: token.clone(),
                        expected: AutorouterPreset::expected(),
                    },
                );
                None
            }
        },
        Value::Object(obj) => {
            let scope = reader.qualify(key);
            let mut sub = FieldReader::nested(obj, &scope, reader.normalizer());
            let config = AutorouterConfigInput {
                server_url: sub.string(report, "serverUrl"),
                input_format: sub.keyword(report, "inputFormat"),
                server_mode: sub.keyword(report, "serverMode"),
                server_cache_enabled: sub.boolean(report, "serverCacheEnabled"),
                cache: read_route_cache(&mut sub, report, "cache"),
                trace_clearance: sub.length(report, "traceClearance"),
                group_mode: sub.keyword(report, "groupMode"),
                local: sub.boolean(report, "local"),
                algorithm_fn: sub.string(report, "algorithmFn"),
                preset: sub.keyword(report, "preset"),
            };
            for unknown in sub.unrecognized() {
                tracing::debug!("Ignoring unrecognized autorouter key `{}`", unknown);
            }
            Some(AutorouterProp::Explicit(config))
        }
        other => {
            report.issue(
                reader.qualify(key),
                IssueKind::WrongType {
                    expected: "preset string or config object",
                    found: type_name(other),
                },
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MillimeterNormalizer;
    use serde_json::json;

    fn read(value: Value) -> (Option<AutorouterProp>, Report) {
        let map = json!({ "autorouter": value }).as_object().cloned().unwrap();
        let mut reader = FieldReader::new(&map, &MillimeterNormalizer);
        let mut report = Report::default();
        let prop = read_autorouter(&mut reader, &mut report, "autorouter");
        (prop, report)
    }

    #[test]
    fn test_preset_token() {
        let (prop, report) = read(json!("auto-cloud"));
        assert!(report.issues.is_empty());
        assert_eq!(prop, Some(AutorouterProp::Preset(AutorouterPreset::AutoCloud)));
    }

    #[test]
    fn test_unknown_preset_names_key() {
        let (prop, report) = read(json!("fastest"));
        assert!(prop.is_none());
        assert_eq!(report.issues[0].key, "autorouter");
        assert!(report.issues[0].to_string().contains("auto-local"));
    }

    #[test]
    fn test_config_object() {
        let (prop, report) = read(json!({
            "serverMode": "solve-endpoint",
            "traceClearance": "0.2mm",
            "cache": { "pcbTraces": [], "cacheKey": "abc" }
        }));
        assert!(report.issues.is_empty());
        let Some(AutorouterProp::Explicit(config)) = prop else {
            panic!("expected config object");
        };
        assert_eq!(config.server_mode, Some(ServerMode::SolveEndpoint));
        assert_eq!(config.trace_clearance, Some(Distance::from_mm(0.2)));
        assert_eq!(config.cache.unwrap().cache_key, "abc");
    }

    #[test]
    fn test_config_object_issues_are_scoped() {
        let (_, report) = read(json!({ "serverMode": "batch", "local": "yes" }));
        let keys: Vec<_> = report.issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["autorouter.serverMode", "autorouter.local"]);
    }

    #[test]
    fn test_trace_roundtrip_keeps_unknown_fields() {
        let trace: PcbTrace = serde_json::from_value(json!({
            "type": "pcb_trace",
            "pcb_trace_id": "t1",
            "route": [{ "x": 0, "y": 0 }],
            "trace_length": 4.2
        }))
        .unwrap();
        assert_eq!(trace.pcb_trace_id.as_deref(), Some("t1"));
        assert_eq!(trace.extra.get("trace_length"), Some(&json!(4.2)));
    }
}
