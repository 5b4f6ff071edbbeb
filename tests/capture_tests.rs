//! Capture repository tests
//!
//! Exercises path resolution, collection loading, caching, and pod log
//! association against capture trees built on disk.

use std::fs;
use std::path::Path;

use gatherlens::{Capture, CaptureError};

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn node_manifest(name: &str) -> String {
    format!("apiVersion: v1\nkind: Node\nmetadata:\n  name: {name}\n")
}

#[test]
fn test_invalid_root_is_fatal() {
    let err = Capture::new("/definitely/not/a/capture").unwrap_err();
    assert!(matches!(err, CaptureError::InvalidRoot(_)));
}

#[test]
fn test_missing_directories_yield_empty_collections() {
    let dir = tempfile::tempdir().unwrap();
    let mut capture = Capture::new(dir.path()).unwrap();

    assert!(capture.nodes().is_empty());
    assert!(capture.machines().is_empty());
    assert!(capture.machine_sets().is_empty());
    assert!(capture.cluster_autoscalers().is_empty());
    assert!(capture.machine_autoscalers().is_empty());
    assert!(capture.certificate_signing_requests().is_empty());
    assert!(capture.deployments("openshift-machine-api").is_empty());
    assert!(capture.pods("openshift-machine-api").is_empty());
    assert!(capture.cluster_version().is_none());
}

#[test]
fn test_collection_loading_sorts_and_skips_malformed() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "cluster-scoped-resources/nodes/zeta.yaml",
        &node_manifest("zeta"),
    );
    write_file(
        dir.path(),
        "cluster-scoped-resources/nodes/alpha.yaml",
        &node_manifest("alpha"),
    );
    // malformed manifest is excluded without aborting the collection
    write_file(
        dir.path(),
        "cluster-scoped-resources/nodes/broken.yaml",
        "metadata: [unterminated\n",
    );
    // unrecognized extension is ignored
    write_file(dir.path(), "cluster-scoped-resources/nodes/notes.txt", "hi");

    let mut capture = Capture::new(dir.path()).unwrap();
    let nodes = capture.nodes();
    let names: Vec<String> = nodes.iter().map(|n| n.name()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[test]
fn test_namespaced_group_path_resolution() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "namespaces/openshift-machine-api/machine.openshift.io/machines/m-0.yaml",
        "metadata:\n  name: m-0\nstatus:\n  phase: Running\n",
    );
    write_file(
        dir.path(),
        "namespaces/openshift-machine-api/apps/deployments/cluster-autoscaler-default.yaml",
        "metadata:\n  name: cluster-autoscaler-default\n",
    );

    let mut capture = Capture::new(dir.path()).unwrap();
    assert_eq!(capture.machines().len(), 1);
    let deployments = capture.deployments("openshift-machine-api");
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].name(), "cluster-autoscaler-default");
}

#[test]
fn test_singleton_malformed_is_treated_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "cluster-scoped-resources/config.openshift.io/clusterversions/version.yaml",
        "status: [not: valid\n",
    );
    let mut capture = Capture::new(dir.path()).unwrap();
    assert!(capture.cluster_version().is_none());
}

#[test]
fn test_collections_are_cached_per_instance() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "cluster-scoped-resources/nodes/alpha.yaml",
        &node_manifest("alpha"),
    );

    let mut capture = Capture::new(dir.path()).unwrap();
    let first = capture.nodes();
    assert_eq!(first.len(), 1);

    // removing the backing files must not change the second answer: the
    // repository never re-reads the filesystem for a loaded key
    fs::remove_dir_all(dir.path().join("cluster-scoped-resources")).unwrap();
    let second = capture.nodes();
    assert_eq!(second, first);

    // a fresh instance observes the new state of the tree
    let mut fresh = Capture::new(dir.path()).unwrap();
    assert!(fresh.nodes().is_empty());
}

#[test]
fn test_singletons_are_cached_per_instance() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "cluster-scoped-resources/config.openshift.io/clusterversions/version.yaml",
        "metadata:\n  name: version\n",
    );
    let mut capture = Capture::new(dir.path()).unwrap();
    assert!(capture.cluster_version().is_some());

    fs::remove_dir_all(dir.path().join("cluster-scoped-resources")).unwrap();
    assert!(capture.cluster_version().is_some());
}

#[test]
fn test_pod_log_association() {
    let dir = tempfile::tempdir().unwrap();
    let ns = "openshift-machine-api";
    write_file(
        dir.path(),
        &format!("namespaces/{ns}/pods/ca-1/ca-1.yaml"),
        "metadata:\n  name: ca-1\n",
    );
    write_file(
        dir.path(),
        &format!("namespaces/{ns}/pods/ca-1/autoscaler/autoscaler/logs/current.log"),
        "I0101 scale up\n",
    );
    // container directory without a log file contributes no entry
    fs::create_dir_all(
        dir.path()
            .join(format!("namespaces/{ns}/pods/ca-1/sidecar/sidecar")),
    )
    .unwrap();
    // pod with an unparsable manifest is skipped entirely
    write_file(
        dir.path(),
        &format!("namespaces/{ns}/pods/bad-pod/bad-pod.yaml"),
        "metadata: [broken\n",
    );
    // pod with no container logs at all is still valid
    write_file(
        dir.path(),
        &format!("namespaces/{ns}/pods/quiet/quiet.yaml"),
        "metadata:\n  name: quiet\n",
    );

    let mut capture = Capture::new(dir.path()).unwrap();
    let pods = capture.pods(ns);
    let names: Vec<String> = pods.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["ca-1", "quiet"]);

    let ca = &pods[0];
    assert_eq!(ca.container_logs().len(), 1);
    assert_eq!(
        ca.container_logs().get("autoscaler").map(String::as_str),
        Some("I0101 scale up\n")
    );
    assert!(pods[1].container_logs().is_empty());
}
