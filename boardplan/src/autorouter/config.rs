//! Autorouter config resolution and router settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::schema::{
    AutorouterConfigInput, AutorouterPreset, AutorouterProp, GroupMode, InputFormat,
    PcbRouteCache, ServerMode,
};
use crate::units::Distance;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// The canonical autorouter record. Presets never survive past
/// [`AutorouterConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutorouterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    pub input_format: InputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_mode: Option<ServerMode>,
    pub server_cache_enabled: bool,
    /// Seed cache from the `autorouter` object. Not part of the fingerprint.
    #[serde(skip)]
    pub cache: Option<PcbRouteCache>,
    pub trace_clearance: Distance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_mode: Option<GroupMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm_fn: Option<String>,
}

fn preset_fields(preset: AutorouterPreset) -> AutorouterConfigInput {
    let mut fields = AutorouterConfigInput::default();
    match preset {
        AutorouterPreset::SequentialTrace => {
            fields.server_mode = Some(ServerMode::SolveEndpoint);
            fields.local = Some(false);
            fields.group_mode = Some(GroupMode::SequentialTrace);
        }
        AutorouterPreset::Subcircuit => {
            fields.server_mode = Some(ServerMode::Job);
            fields.local = Some(false);
            fields.group_mode = Some(GroupMode::Subcircuit);
        }
        AutorouterPreset::Auto => {}
        AutorouterPreset::AutoLocal => fields.local = Some(true),
        AutorouterPreset::AutoCloud => fields.local = Some(false),
    }
    fields
}

/// Fields set in `over` win.
fn merge(base: AutorouterConfigInput, over: &AutorouterConfigInput) -> AutorouterConfigInput {
    AutorouterConfigInput {
        server_url: over.server_url.clone().or(base.server_url),
        input_format: over.input_format.or(base.input_format),
        server_mode: over.server_mode.or(base.server_mode),
        server_cache_enabled: over.server_cache_enabled.or(base.server_cache_enabled),
        cache: over.cache.clone().or(base.cache),
        trace_clearance: over.trace_clearance.or(base.trace_clearance),
        group_mode: over.group_mode.or(base.group_mode),
        local: over.local.or(base.local),
        algorithm_fn: over.algorithm_fn.clone().or(base.algorithm_fn),
        preset: None,
    }
}

impl AutorouterConfig {
    /// Collapse the prop into one record. An absent prop behaves like `auto`.
    ///
    /// `board_clearance` is the board's global minimum clearance, used when
    /// the prop does not set `traceClearance`.
    pub fn resolve(prop: Option<&AutorouterProp>, board_clearance: Distance) -> Self {
        let fields = match prop {
            None => preset_fields(AutorouterPreset::Auto),
            Some(AutorouterProp::Preset(preset)) => preset_fields(*preset),
            Some(AutorouterProp::Explicit(input)) => {
                let base = input.preset.map(preset_fields).unwrap_or_default();
                merge(base, input)
            }
        };
        Self {
            server_url: fields.server_url,
            input_format: fields.input_format.unwrap_or(InputFormat::CircuitJson),
            server_mode: fields.server_mode,
            server_cache_enabled: fields.server_cache_enabled.unwrap_or(true),
            cache: fields.cache,
            trace_clearance: fields.trace_clearance.unwrap_or(board_clearance),
            group_mode: fields.group_mode,
            local: fields.local,
            algorithm_fn: fields.algorithm_fn,
        }
    }

    /// True when server dispatch fields were set but `algorithmFn` overrides them.
    pub fn has_ignored_server_fields(&self) -> bool {
        self.algorithm_fn.is_some() && (self.server_url.is_some() || self.server_mode.is_some())
    }

    pub fn dispatch(&self, settings: &RouterSettings) -> DispatchTarget {
        if let Some(name) = &self.algorithm_fn {
            if self.has_ignored_server_fields() {
                tracing::debug!("algorithmFn `{}` overrides the configured server fields", name);
            }
            return DispatchTarget::Algorithm { name: name.clone() };
        }
        let local = self.local.unwrap_or(settings.prefer_local);
        if local {
            DispatchTarget::Local
        } else {
            DispatchTarget::Server {
                url: self.server_url.clone().or_else(|| settings.server_url.clone()),
                mode: self.server_mode.unwrap_or(settings.default_server_mode),
            }
        }
    }
}

/// Where a routing request goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum DispatchTarget {
    /// A routing algorithm registered with the coordinator under this name.
    Algorithm { name: String },
    Local,
    Server {
        url: Option<String>,
        mode: ServerMode,
    },
}

impl std::fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchTarget::Algorithm { name } => write!(f, "algorithm `{}`", name),
            DispatchTarget::Local => f.write_str("local router"),
            DispatchTarget::Server { url: Some(url), mode } => write!(f, "{} ({})", url, mode),
            DispatchTarget::Server { url: None, mode } => write!(f, "default server ({})", mode),
        }
    }
}

/// Environment-level routing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Server used when the prop does not name one.
    pub server_url: Option<String>,

    pub default_server_mode: ServerMode,

    /// Whether `local` unset means the local router.
    pub prefer_local: bool,

    pub timeout_secs: u64,

    /// Delay between job status polls.
    pub poll_interval_ms: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            server_url: None,
            default_server_mode: ServerMode::Job,
            prefer_local: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl RouterSettings {
    /// Defaults overridden by `BOARDPLAN_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("BOARDPLAN_AUTOROUTER_URL") {
            if !url.is_empty() {
                self.server_url = Some(url);
            }
        }
        if let Ok(value) = std::env::var("BOARDPLAN_PREFER_LOCAL") {
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.prefer_local = true,
                "0" | "false" | "no" => self.prefer_local = false,
                other => tracing::warn!("Ignoring BOARDPLAN_PREFER_LOCAL={}", other),
            }
        }
        if let Ok(value) = std::env::var("BOARDPLAN_ROUTE_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring BOARDPLAN_ROUTE_TIMEOUT_SECS={}", value),
            }
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
