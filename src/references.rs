//! Dependency extraction for resources: references found in configuration,
//! and the normalized legacy strings persisted to state.

use std::collections::HashSet;

use tracing::error;

use crate::addrs::{Reference, Referenceable, Traversal};
use crate::configs::{ProvisionerWhen, ResourceConfig};
use crate::schema::Block;

fn parse_all<'a>(traversals: impl IntoIterator<Item = &'a Traversal>, out: &mut Vec<Reference>) {
    for traversal in traversals {
        match Reference::parse(traversal) {
            Ok(reference) => out.push(reference),
            Err(err) => error!(traversal = %traversal, error = %err, "ignoring invalid reference"),
        }
    }
}

/// Everything a resource declaration refers to: `depends_on`, the
/// count/for_each expression, the body and create-time provisioners.
pub fn config_references(config: &ResourceConfig, schema: Option<&Block>) -> Vec<Reference> {
    let mut refs = Vec::new();
    parse_all(&config.depends_on, &mut refs);
    if let Some(count) = &config.count {
        parse_all(count.traversals(), &mut refs);
    }
    if let Some(for_each) = &config.for_each {
        parse_all(for_each.traversals(), &mut refs);
    }
    parse_all(config.config.traversals(schema), &mut refs);

    // Destroy-time provisioners can only refer to the resource itself.
    for p in config.provisioners() {
        if p.when != ProvisionerWhen::Create {
            continue;
        }
        if let Some(connection) = &p.connection {
            parse_all(connection.traversals(None), &mut refs);
        }
        parse_all(p.config.traversals(None), &mut refs);
    }
    refs
}

/// Keeps the first reference to each subject, dropping `self` and anything
/// that refers to one of `own`.
pub fn dedupe_references(refs: Vec<Reference>, own: &[Referenceable]) -> Vec<Reference> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter(|r| r.subject != Referenceable::SelfRef && !own.contains(&r.subject))
        .filter(|r| seen.insert(r.subject.clone()))
        .collect()
}

/// Normalizes one legacy dependency string:
///
/// - `var.*` is dropped
/// - everything after a `/` is dropped
/// - references to the node itself (`self_names`) are dropped
/// - a trailing `.0` is removed unless the string starts with `self_prefix`
/// - `module.NAME.OUTPUT` collapses to `module.NAME`
pub fn normalize_state_dependency(dep: &str, self_names: &[String], self_prefix: &str) -> Option<String> {
    if dep.starts_with("var.") {
        return None;
    }
    let dep = dep.split_once('/').map_or(dep, |(head, _)| head);
    if dep.is_empty() || self_names.iter().any(|s| s == dep) {
        return None;
    }

    let mut dep = dep.to_string();
    if !dep.starts_with(self_prefix)
        && let Some(stripped) = dep.strip_suffix(".0")
    {
        dep = stripped.to_string();
    }
    if dep.starts_with("module.") {
        let parts: Vec<&str> = dep.splitn(3, '.').collect();
        if parts.len() == 3 {
            dep = format!("{}.{}", parts[0], parts[1]);
        }
    }
    Some(dep)
}

/// The sorted, deduplicated dependency strings to persist for a node.
pub fn state_references(refs: &[Reference], self_names: &[String], self_prefix: &str) -> Vec<String> {
    let mut deps: Vec<String> = refs
        .iter()
        .filter_map(|r| normalize_state_dependency(&r.subject.legacy_string(), self_names, self_prefix))
        .collect();
    deps.sort();
    deps.dedup();
    deps
}
