//! Boardplan CLI - resolve group layout plans and route subcircuits from the command line.

use anyhow::Context;
use boardplan::schema::autorouter::AUTOROUTER_KEYS;
use boardplan::schema::group::{GROUP_KEYS, SUBCIRCUIT_KEYS};
use boardplan::schema::{KeySet, PcbRouteCache};
use boardplan::{
    load_json, BoardplanCore, BorderSetting, CircuitSnapshot, Distance, GroupReport,
    ResolveOptions, ResolvedGroup, ResolvedLayoutPlan, RouteCoordinator, RouteOptions,
    RouterSettings, RoutingPlan, SharedRouteCache, View,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "boardplan")]
#[command(about = "PCB and schematic layout plan resolution and autorouting tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the layout plans of every group in a tree
    Resolve {
        /// Path to the group tree JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Treat lints as errors
        #[arg(long)]
        strict: bool,
    },

    /// Print the routing plan and fingerprint of every subcircuit
    Plan {
        /// Path to the group tree JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Circuit JSON: one circuit for every subcircuit, or an object keyed by group path
        #[arg(long, value_name = "CIRCUIT")]
        circuit: PathBuf,

        /// Board minimum clearance in millimetres
        #[arg(long, value_name = "MM")]
        clearance: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Route every subcircuit through the configured autorouting server
    Route {
        /// Path to the group tree JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Circuit JSON: one circuit for every subcircuit, or an object keyed by group path
        #[arg(long, value_name = "CIRCUIT")]
        circuit: PathBuf,

        /// Route cache file, read before routing and rewritten afterwards
        #[arg(long, value_name = "FILE")]
        cache: Option<PathBuf>,

        /// Router settings JSON (defaults plus BOARDPLAN_* environment overrides)
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,

        /// Fall back to the previous cached traces when routing fails
        #[arg(long)]
        stale_on_failure: bool,
    },

    /// List recognized group property keys
    Keys,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Resolve {
            file,
            format,
            strict,
        } => handle_resolve(&file, format, strict),
        Commands::Plan {
            file,
            circuit,
            clearance,
            format,
        } => report_errors(handle_plan(&file, &circuit, clearance, format)),
        Commands::Route {
            file,
            circuit,
            cache,
            settings,
            stale_on_failure,
        } => report_errors(handle_route(
            &file,
            &circuit,
            cache.as_deref(),
            settings.as_deref(),
            stale_on_failure,
        )),
        Commands::Keys => {
            handle_keys();
            0
        }
    };

    process::exit(exit_code);
}

fn report_errors(result: anyhow::Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn handle_resolve(file: &Path, format: OutputFormat, strict: bool) -> i32 {
    let options = ResolveOptions {
        strict_lints: strict,
        ..Default::default()
    };

    match BoardplanCore::resolve_file(file, &options) {
        Ok(reports) => {
            match format {
                OutputFormat::Human => output_human(&reports),
                OutputFormat::Json => output_json(&reports),
            }
            if reports.iter().all(GroupReport::is_clean) {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn describe_border(border: &BorderSetting) -> String {
    match border {
        BorderSetting::Inherit => "inherit".to_string(),
        BorderSetting::Suppressed => "none".to_string(),
        BorderSetting::Styled(b) => {
            let mut parts = Vec::new();
            if let Some(width) = b.stroke_width {
                parts.push(width.to_string());
            }
            if b.dashed == Some(true) {
                parts.push("dashed".to_string());
            }
            if b.solid == Some(true) {
                parts.push("solid".to_string());
            }
            if parts.is_empty() {
                "styled".to_string()
            } else {
                parts.join(" ")
            }
        }
    }
}

fn describe_plan(plan: &ResolvedLayoutPlan) -> String {
    let p = plan.padding();
    let mut line = format!(
        "{} padding {}/{}/{}/{} border {}",
        plan.mode,
        p.left,
        p.right,
        p.top,
        p.bottom,
        describe_border(plan.border())
    );
    if let Some(gap) = plan.gap {
        line.push_str(&format!(" gap {}", gap));
    }
    if let Some(position) = plan.position {
        line.push_str(&format!(" position {}", position));
    }
    if let Some(title) = &plan.title {
        line.push_str(&format!(" title \"{}\"", title));
    }
    line
}

fn output_human(reports: &[GroupReport]) {
    for report in reports {
        println!("\nGroup: {}", report.path);
        println!("{}", "─".repeat(60));

        let group = match &report.result {
            Ok(group) => group,
            Err(e) => {
                println!("  ERROR: {}", e);
                continue;
            }
        };

        for view in View::ALL {
            match group.plan(view) {
                Ok(plan) => println!("  {}: {}", view, describe_plan(plan)),
                Err(e) => println!("  {}: ERROR: {}", view, e),
            }
        }
        for lint in group.lints() {
            println!("  warning: {}", lint);
        }
    }

    let failed = reports.iter().filter(|r| !r.is_clean()).count();
    println!("\n  Summary:");
    println!("    Groups: {}", reports.len());
    println!("    Failed: {}", failed);
}

fn plan_json(plan: Result<&ResolvedLayoutPlan, &boardplan::ResolveError>) -> Value {
    match plan {
        Ok(plan) => serde_json::to_value(plan).unwrap_or(Value::Null),
        Err(e) => serde_json::json!({ "error": e.to_string() }),
    }
}

fn output_json(reports: &[GroupReport]) {
    let output = serde_json::json!({
        "groups": reports.iter().map(|r| match &r.result {
            Ok(group) => serde_json::json!({
                "path": r.path,
                "depth": r.depth,
                "subcircuit": group.is_subcircuit(),
                "pcb": plan_json(group.plan(View::Pcb)),
                "schematic": plan_json(group.plan(View::Schematic)),
                "lints": group.lints(),
            }),
            Err(e) => serde_json::json!({
                "path": r.path,
                "depth": r.depth,
                "error": e.to_string(),
            }),
        }).collect::<Vec<_>>(),
        "summary": {
            "total_groups": reports.len(),
            "failed": reports.iter().filter(|r| !r.is_clean()).count(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
}

/// Circuits keyed by group path, or one circuit shared by every group.
enum Circuits {
    Shared(Value),
    PerGroup(serde_json::Map<String, Value>),
}

impl Circuits {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let value = load_json(path)
            .with_context(|| format!("failed to read circuit {}", path.display()))?;
        Ok(match value {
            Value::Object(map) if !map.contains_key("type") => Circuits::PerGroup(map),
            other => Circuits::Shared(other),
        })
    }

    fn snapshot(&self, group: &str) -> Option<CircuitSnapshot> {
        match self {
            Circuits::Shared(value) => Some(CircuitSnapshot::from_json(value.clone())),
            Circuits::PerGroup(map) => map.get(group).cloned().map(CircuitSnapshot::from_json),
        }
    }
}

fn collect_plans(
    reports: &[GroupReport],
    circuits: &Circuits,
    options: &ResolveOptions,
) -> anyhow::Result<Vec<RoutingPlan>> {
    let mut plans = Vec::new();
    for group in reports.iter().filter_map(|r| r.result.as_ref().ok()) {
        if !group.is_subcircuit() {
            continue;
        }
        let Some(circuit) = circuits.snapshot(&group.path) else {
            tracing::warn!("No circuit for subcircuit `{}`; skipping", group.path);
            continue;
        };
        if let Some(plan) = routing_plan(group, circuit, options)? {
            plans.push(plan);
        }
    }
    Ok(plans)
}

fn routing_plan(
    group: &ResolvedGroup,
    circuit: CircuitSnapshot,
    options: &ResolveOptions,
) -> anyhow::Result<Option<RoutingPlan>> {
    BoardplanCore::routing_plan(group, circuit, options)
        .with_context(|| format!("failed to build routing plan for `{}`", group.path))
}

fn handle_plan(
    file: &Path,
    circuit: &Path,
    clearance: Option<f64>,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let mut options = ResolveOptions::default();
    if let Some(mm) = clearance {
        options.board_clearance = Distance::from_mm(mm);
    }
    let reports = BoardplanCore::resolve_file(file, &options)?;
    let circuits = Circuits::load(circuit)?;
    let plans = collect_plans(&reports, &circuits, &options)?;
    let settings = RouterSettings::from_env();

    match format {
        OutputFormat::Human => {
            for plan in &plans {
                println!("\nSubcircuit: {}", plan.group);
                println!("{}", "─".repeat(60));
                println!("  Fingerprint: {}", plan.fingerprint);
                println!("  Dispatch:    {}", plan.config.dispatch(&settings));
                println!("  Clearance:   {}", plan.config.trace_clearance);
                let cached = plan
                    .seed_cache
                    .as_ref()
                    .map(|c| c.cache_key == plan.fingerprint && plan.config.server_cache_enabled)
                    .unwrap_or(false);
                println!("  Cache:       {}", if cached { "hit" } else { "miss" });
            }
            println!("\n  Subcircuits to route: {}", plans.len());
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "plans": plans.iter().map(|plan| serde_json::json!({
                    "plan": plan,
                    "dispatch": plan.config.dispatch(&settings),
                })).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(0)
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<RouterSettings> {
    let Some(path) = path else {
        return Ok(RouterSettings::from_env());
    };
    let value = load_json(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    let settings: RouterSettings = serde_json::from_value(value)
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(settings.with_env())
}

fn load_caches(path: Option<&Path>) -> anyhow::Result<BTreeMap<String, PcbRouteCache>> {
    match path {
        Some(path) if path.exists() => {
            let value = load_json(path)
                .with_context(|| format!("failed to read cache {}", path.display()))?;
            serde_json::from_value(value)
                .with_context(|| format!("invalid route cache in {}", path.display()))
        }
        _ => Ok(BTreeMap::new()),
    }
}

fn handle_route(
    file: &Path,
    circuit: &Path,
    cache_path: Option<&Path>,
    settings_path: Option<&Path>,
    stale_on_failure: bool,
) -> anyhow::Result<i32> {
    let options = ResolveOptions::default();
    let reports = BoardplanCore::resolve_file(file, &options)?;
    let circuits = Circuits::load(circuit)?;
    let plans = collect_plans(&reports, &circuits, &options)?;
    let settings = load_settings(settings_path)?;
    let mut stored = load_caches(cache_path)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let coordinator = RouteCoordinator::new(settings).with_default_server();
    let route_options = RouteOptions { stale_on_failure };

    let mut failures = 0;
    for plan in &plans {
        let seed = stored
            .get(&plan.group)
            .cloned()
            .or_else(|| plan.seed_cache.clone());
        let cache = SharedRouteCache::new(seed);

        match runtime.block_on(coordinator.route(plan, &cache, route_options)) {
            Ok(outcome) => {
                println!(
                    "  {}: {} traces ({:?})",
                    plan.group,
                    outcome.traces.len(),
                    outcome.source
                );
            }
            Err(e) => {
                eprintln!("  {}: {}", plan.group, e);
                failures += 1;
            }
        }
        if let Some(snapshot) = cache.snapshot() {
            stored.insert(plan.group.clone(), snapshot);
        }
    }

    if let Some(path) = cache_path {
        let content = serde_json::to_string_pretty(&stored)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write cache {}", path.display()))?;
    }

    println!("\n  Routed: {}", plans.len() - failures);
    println!("  Failed: {}", failures);
    Ok(if failures > 0 { 1 } else { 0 })
}

fn handle_keys() {
    println!("Recognized group keys:\n");

    let sections: [(&str, Vec<String>); 6] = [
        ("Group", GROUP_KEYS.iter().map(|k| k.to_string()).collect()),
        ("Layout", KeySet::Full.keys()),
        ("PCB", KeySet::Prefixed(View::Pcb).keys()),
        ("Schematic", KeySet::Prefixed(View::Schematic).keys()),
        ("Subcircuit", SUBCIRCUIT_KEYS.iter().map(|k| k.to_string()).collect()),
        (
            "Autorouter object",
            AUTOROUTER_KEYS.iter().map(|k| k.to_string()).collect(),
        ),
    ];

    for (name, keys) in &sections {
        println!("  {}", name);
        println!("    {}", keys.join(", "));
        println!();
    }
}
