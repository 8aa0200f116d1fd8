//! Group tree walking.
//!
//! A tree is a root group object whose `children` hold nested groups and
//! leaf components. Groups resolve top down: a parent's effective
//! `position` in each view is what its children inherit.

use serde_json::Value;
use std::collections::HashMap;

use crate::core::{BoardplanCore, BoardplanError, ResolveOptions, ResolvedGroup};
use crate::resolver::ChildSummary;
use crate::schema::validate::{FieldReader, Report};
use crate::schema::{PlacementHints, Position, View};
use crate::units::LengthNormalizer;

/// Outcome for one group of a tree, in pre-order.
#[derive(Debug)]
pub struct GroupReport {
    /// Tree path such as `root/power/ldo`.
    pub path: String,
    pub depth: usize,
    pub result: Result<ResolvedGroup, BoardplanError>,
}

impl GroupReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// True when the group validated and both views resolved.
    pub fn is_clean(&self) -> bool {
        match &self.result {
            Ok(group) => group.pcb.is_ok() && group.schematic.is_ok(),
            Err(_) => false,
        }
    }
}

/// Whether a child object is a nested group rather than a component.
pub fn is_group_node(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("group")
        || value.get("children").map(Value::is_array).unwrap_or(false)
}

fn children_of(value: &Value) -> &[Value] {
    value
        .get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Read what a parent needs from a child. Malformed values are skipped;
/// nested groups report them through their own validation.
pub fn child_summary(value: &Value, normalizer: &dyn LengthNormalizer) -> ChildSummary {
    let Some(obj) = value.as_object() else {
        return ChildSummary::default();
    };
    let mut reader = FieldReader::new(obj, normalizer);
    let mut ignored = Report::default();
    ChildSummary {
        name: reader.string(&mut ignored, "name"),
        position: reader.keyword::<Position>(&mut ignored, "position"),
        placement: PlacementHints::read(&mut reader, &mut ignored),
    }
}

fn child_name(child: &Value) -> Option<&str> {
    child
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

/// `parent/name`, or `parent/name[i]` when sibling groups share the name,
/// or `parent/group[i]` when the group is unnamed.
fn child_path(parent: &str, child: &Value, index: usize, shared_name: bool) -> String {
    match child_name(child) {
        Some(name) if shared_name => format!("{}/{}[{}]", parent, name, index),
        Some(name) => format!("{}/{}", parent, name),
        None => format!("{}/group[{}]", parent, index),
    }
}

pub(crate) fn root_path(root: &Value) -> String {
    match root.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "root".to_string(),
    }
}

pub(crate) fn walk(
    value: &Value,
    path: String,
    depth: usize,
    inherited: [Option<Position>; 2],
    options: &ResolveOptions,
    reports: &mut Vec<GroupReport>,
) {
    let normalizer = options.normalizer.as_ref();
    let children = children_of(value);
    let summaries: Vec<ChildSummary> = children
        .iter()
        .map(|child| child_summary(child, normalizer))
        .collect();

    let result = BoardplanCore::resolve_group(value, &path, &summaries, inherited, options);
    let passed_down = match &result {
        Ok(group) => View::ALL.map(|view| group.plan(view).ok().and_then(|plan| plan.position)),
        Err(e) => {
            tracing::warn!("{}", e);
            [None, None]
        }
    };
    reports.push(GroupReport {
        path: path.clone(),
        depth,
        result,
    });

    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for name in children.iter().filter(|c| is_group_node(c)).filter_map(child_name) {
        *name_counts.entry(name).or_default() += 1;
    }

    for (index, child) in children.iter().enumerate() {
        if is_group_node(child) {
            let shared_name = child_name(child)
                .map(|name| name_counts.get(name).copied().unwrap_or(0) > 1)
                .unwrap_or(false);
            if shared_name {
                tracing::warn!(
                    "Group `{}` has several child groups named `{}`; indexing their paths",
                    path,
                    child_name(child).unwrap_or_default()
                );
            }
            let child_path = child_path(&path, child, index, shared_name);
            walk(child, child_path, depth + 1, passed_down, options, reports);
        }
    }
}
