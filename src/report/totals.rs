//! Fleet-wide node resource totals
//!
//! Summed once per node collection at report build time. Memory is kept in
//! bytes while summing and converted to gigabytes only in the aggregate.

use serde::Serialize;
use serde_yaml::Value;

use crate::capture::quantity::parse_quantity;
use crate::capture::resource::Resource;

/// Resource name under which GPUs are reported. Most nodes legitimately
/// have no entry for it.
pub const GPU_RESOURCE: &str = "nvidia.com/gpu";

const GIGABYTE: f64 = 1_000_000_000.0;

/// Aggregate allocatable and capacity totals over a node collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeTotals {
    pub cpu_allocatable: f64,
    pub cpu_capacity: f64,
    pub memory_allocatable_gb: f64,
    pub memory_capacity_gb: f64,
    pub gpu_allocatable: f64,
    pub gpu_capacity: f64,
}

/// Sum totals across all nodes.
///
/// A node missing a quantity contributes zero with an informational note.
/// An unparsable CPU or memory quantity is an error (those are expected to
/// always be present and well-formed); an unparsable GPU quantity is only
/// informational.
pub fn node_totals(nodes: &[Resource]) -> NodeTotals {
    let mut totals = NodeTotals::default();
    let mut memory_allocatable = 0.0;
    let mut memory_capacity = 0.0;

    for node in nodes {
        totals.cpu_allocatable += node_quantity(node, "allocatable", "cpu", true);
        totals.cpu_capacity += node_quantity(node, "capacity", "cpu", true);
        memory_allocatable += node_quantity(node, "allocatable", "memory", true);
        memory_capacity += node_quantity(node, "capacity", "memory", true);
        totals.gpu_allocatable += node_quantity(node, "allocatable", GPU_RESOURCE, false);
        totals.gpu_capacity += node_quantity(node, "capacity", GPU_RESOURCE, false);
    }

    totals.memory_allocatable_gb = memory_allocatable / GIGABYTE;
    totals.memory_capacity_gb = memory_capacity / GIGABYTE;
    totals
}

/// Read one quantity from `status.<section>.<key>`, defaulting to zero.
fn node_quantity(node: &Resource, section: &str, key: &str, required: bool) -> f64 {
    let name = node.name();
    let Some(value) = node.get(&["status", section, key]) else {
        tracing::info!("node {name} has no {section} quantity for {key}");
        return 0.0;
    };
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    };
    match parse_quantity(&text) {
        Ok(parsed) => parsed,
        Err(err) => {
            if required {
                tracing::error!("node {name} {section} {key}: {err}");
            } else {
                tracing::info!("node {name} {section} {key}: {err}");
            }
            0.0
        }
    }
}
