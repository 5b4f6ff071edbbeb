//! Report context builder
//!
//! Transforms the repository's raw collections into the computed, serializable
//! structure the rendering layer consumes. This structure is the sole contract
//! with rendering: it carries data only, no behavior. Missing optional data
//! always resolves to an empty, zero, or placeholder value; the only error
//! that escapes [`build`] is an invalid capture root.

pub mod status;
pub mod totals;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_yaml::Value;

use crate::capture::resource::{Pod, Resource};
use crate::capture::{Capture, CaptureError, MACHINE_API_NAMESPACE};
use crate::csr;

use self::status::{
    is_autoscaled_machine_set, is_csr_denied, is_csr_failed, is_csr_pending, is_machine_running,
    is_node_not_ready,
};
use self::totals::{NodeTotals, node_totals};

/// Name of the deployment the cluster autoscaler operator creates for the
/// default ClusterAutoscaler resource.
pub const CLUSTER_AUTOSCALER_DEPLOYMENT: &str = "cluster-autoscaler-default";

/// Placeholder version when no completed update exists in the history.
const UNKNOWN_VERSION: &str = "Unknown";

/// One resource prepared for display.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceView {
    pub name: String,
    pub yaml: String,
}

impl ResourceView {
    fn from_resource(resource: &Resource) -> Self {
        Self {
            name: resource.name(),
            yaml: resource.as_yaml(),
        }
    }
}

/// A certificate signing request with its derived flags. The yaml is the
/// post-decode, post-redaction view.
#[derive(Debug, Clone, Serialize)]
pub struct CsrView {
    pub name: String,
    pub pending: bool,
    pub denied: bool,
    pub failed: bool,
    pub yaml: String,
}

/// A pod with its container logs.
#[derive(Debug, Clone, Serialize)]
pub struct PodView {
    pub name: String,
    pub yaml: String,
    pub container_logs: BTreeMap<String, String>,
}

impl PodView {
    fn from_pod(pod: &Pod) -> Self {
        Self {
            name: pod.name(),
            yaml: pod.resource().as_yaml(),
            container_logs: pod.container_logs().clone(),
        }
    }
}

/// The fully-populated report context.
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    pub basename: String,
    pub cluster_version: String,
    pub cluster_autoscalers: Vec<ResourceView>,
    pub machine_autoscalers: Vec<ResourceView>,
    pub cluster_autoscaler_deployment: String,
    pub machines: Vec<ResourceView>,
    pub not_running_machines: Vec<ResourceView>,
    pub machine_sets: Vec<ResourceView>,
    pub autoscaled_machine_sets: Vec<String>,
    pub nodes: Vec<ResourceView>,
    pub not_ready_nodes: Vec<ResourceView>,
    pub node_totals: NodeTotals,
    pub csrs: Vec<CsrView>,
    pub pending_csrs: Vec<String>,
    pub denied_csrs: Vec<String>,
    pub failed_csrs: Vec<String>,
    pub machine_api_pods: Vec<PodView>,
}

/// Build the full report context for a capture root.
///
/// One sequential pass over a fresh repository instance; totals are computed
/// once here, while classification flags are plain functions of the data.
pub fn build(path: &Path) -> Result<ReportContext, CaptureError> {
    let mut capture = Capture::new(path)?;

    let machines = capture.machines();
    let not_running_machines = machines
        .iter()
        .filter(|machine| !is_machine_running(machine))
        .map(ResourceView::from_resource)
        .collect();

    let machine_sets = capture.machine_sets();
    let autoscaled_machine_sets = machine_sets
        .iter()
        .filter(|machine_set| is_autoscaled_machine_set(machine_set))
        .map(Resource::name)
        .collect();

    let nodes = capture.nodes();
    let node_totals = node_totals(&nodes);
    let not_ready_nodes = nodes
        .iter()
        .filter(|node| is_node_not_ready(node))
        .map(ResourceView::from_resource)
        .collect();

    let mut csr_resources = capture.certificate_signing_requests();
    for resource in &mut csr_resources {
        csr::decode_and_redact(resource);
    }
    let csrs: Vec<CsrView> = csr_resources
        .iter()
        .map(|resource| CsrView {
            name: resource.name(),
            pending: is_csr_pending(resource),
            denied: is_csr_denied(resource),
            failed: is_csr_failed(resource),
            yaml: resource.as_yaml(),
        })
        .collect();
    let pending_csrs = csrs.iter().filter(|c| c.pending).map(|c| c.name.clone()).collect();
    let denied_csrs = csrs.iter().filter(|c| c.denied).map(|c| c.name.clone()).collect();
    let failed_csrs = csrs.iter().filter(|c| c.failed).map(|c| c.name.clone()).collect();

    let context = ReportContext {
        basename: basename(path),
        cluster_version: cluster_version(&mut capture),
        cluster_autoscalers: views(&capture.cluster_autoscalers()),
        machine_autoscalers: views(&capture.machine_autoscalers()),
        cluster_autoscaler_deployment: cluster_autoscaler_deployment(&mut capture),
        machines: views(&machines),
        not_running_machines,
        machine_sets: views(&machine_sets),
        autoscaled_machine_sets,
        nodes: views(&nodes),
        not_ready_nodes,
        node_totals,
        csrs,
        pending_csrs,
        denied_csrs,
        failed_csrs,
        machine_api_pods: capture
            .pods(MACHINE_API_NAMESPACE)
            .iter()
            .map(PodView::from_pod)
            .collect(),
    };
    Ok(context)
}

fn views(resources: &[Resource]) -> Vec<ResourceView> {
    resources.iter().map(ResourceView::from_resource).collect()
}

/// Last path component of the capture root, for the report heading.
fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The version of the most recent completed update in the cluster version
/// history, or `Unknown` when nothing qualifies.
fn cluster_version(capture: &mut Capture) -> String {
    let Some(version) = capture.cluster_version() else {
        return UNKNOWN_VERSION.to_string();
    };
    let Some(history) = version.get(&["status", "history"]).and_then(Value::as_sequence) else {
        tracing::info!("cluster version has no status history");
        return UNKNOWN_VERSION.to_string();
    };

    let mut completed: Vec<(DateTime<FixedOffset>, &str)> = history
        .iter()
        .filter_map(|entry| {
            if entry.get("state").and_then(Value::as_str) != Some("Completed") {
                return None;
            }
            let version = entry.get("version").and_then(Value::as_str)?;
            let completion = entry.get("completionTime").and_then(Value::as_str)?;
            match DateTime::parse_from_rfc3339(completion) {
                Ok(time) => Some((time, version)),
                Err(err) => {
                    tracing::error!("bad completionTime {completion:?} in cluster version history: {err}");
                    None
                }
            }
        })
        .collect();
    completed.sort_by(|a, b| b.0.cmp(&a.0));
    completed
        .first()
        .map(|(_, version)| (*version).to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// The cluster autoscaler deployment's canonical yaml, or a placeholder
/// naming the file the capture was expected to contain. The placeholder is
/// a UI affordance, not an error.
fn cluster_autoscaler_deployment(capture: &mut Capture) -> String {
    let deployments = capture.deployments(MACHINE_API_NAMESPACE);
    match deployments
        .iter()
        .find(|deployment| deployment.name() == CLUSTER_AUTOSCALER_DEPLOYMENT)
    {
        Some(deployment) => deployment.as_yaml(),
        None => format!(
            "Deployment not found, check {}/namespaces/{}/apps/deployments/{}.yaml",
            capture.root().display(),
            MACHINE_API_NAMESPACE,
            CLUSTER_AUTOSCALER_DEPLOYMENT,
        ),
    }
}
