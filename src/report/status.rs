//! Status classification helpers
//!
//! Pure functions over raw resources, recomputed on each call. One resource
//! wrapper plus free functions per kind, rather than a subtype per kind.

use serde_yaml::Value;

use crate::capture::resource::Resource;

/// Annotation marking a machine set's minimum autoscaler group size.
pub const MIN_SIZE_ANNOTATION: &str =
    "machine.openshift.io/cluster-api-autoscaler-node-group-min-size";
/// Annotation marking a machine set's maximum autoscaler group size.
pub const MAX_SIZE_ANNOTATION: &str =
    "machine.openshift.io/cluster-api-autoscaler-node-group-max-size";

/// Find a `status.conditions` entry by type.
fn find_condition<'a>(resource: &'a Resource, condition_type: &str) -> Option<&'a Value> {
    resource
        .get(&["status", "conditions"])?
        .as_sequence()?
        .iter()
        .find(|condition| {
            condition.get("type").and_then(Value::as_str) == Some(condition_type)
        })
}

/// The `status` field of a condition, when the condition exists.
pub fn condition_status<'a>(resource: &'a Resource, condition_type: &str) -> Option<&'a str> {
    find_condition(resource, condition_type)?
        .get("status")
        .and_then(Value::as_str)
}

/// Whether a condition of the given type is present at all, regardless of
/// its status value.
pub fn has_condition(resource: &Resource, condition_type: &str) -> bool {
    find_condition(resource, condition_type).is_some()
}

/// A node is not ready when it carries a `Ready` condition with status
/// `False`.
pub fn is_node_not_ready(node: &Resource) -> bool {
    condition_status(node, "Ready") == Some("False")
}

/// A machine is running only when `status.phase` is exactly `Running`;
/// an absent phase counts as not running.
pub fn is_machine_running(machine: &Resource) -> bool {
    machine.get_str(&["status", "phase"]) == Some("Running")
}

/// A CSR with no `status` subtree at all is still pending.
pub fn is_csr_pending(csr: &Resource) -> bool {
    csr.get(&["status"]).is_none()
}

pub fn is_csr_denied(csr: &Resource) -> bool {
    has_condition(csr, "Denied")
}

pub fn is_csr_failed(csr: &Resource) -> bool {
    has_condition(csr, "Failed")
}

/// A machine set participates in autoscaling when both group-size
/// annotations are present.
pub fn is_autoscaled_machine_set(machine_set: &Resource) -> bool {
    machine_set.annotation(MIN_SIZE_ANNOTATION).is_some()
        && machine_set.annotation(MAX_SIZE_ANNOTATION).is_some()
}
