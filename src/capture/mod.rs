//! Capture repository
//!
//! Maps the on-disk layout of a diagnostic capture to typed resource
//! collections. Every accessor memoizes its result per repository instance:
//! once a collection or singleton is loaded for a request key, later calls
//! return the cached value without touching the filesystem again, so the
//! report builder always observes a stable snapshot.
//!
//! Layout contract:
//! `<root>/cluster-scoped-resources/<group?>/<kind>/<name>.yaml` for
//! cluster-scoped resources, `<root>/namespaces/<ns>/<group?>/<kind>/<name>.yaml`
//! for namespaced ones, and `<root>/namespaces/<ns>/pods/<pod>/...` for pod
//! manifests and container logs.

pub mod quantity;
pub mod resource;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use self::resource::{Pod, Resource};

/// Scope segment for cluster-scoped resources.
pub const CLUSTER_SCOPED_DIR: &str = "cluster-scoped-resources";
/// Scope segment for namespaced resources.
pub const NAMESPACES_DIR: &str = "namespaces";
/// Manifest file extension.
pub const MANIFEST_EXT: &str = "yaml";

/// Namespace holding the machine API components and their pods.
pub const MACHINE_API_NAMESPACE: &str = "openshift-machine-api";

const AUTOSCALING_GROUP: &str = "autoscaling.openshift.io";
const MACHINE_GROUP: &str = "machine.openshift.io";
const CERTIFICATES_GROUP: &str = "certificates.k8s.io";
const CONFIG_GROUP: &str = "config.openshift.io";
const APPS_GROUP: &str = "apps";

/// Errors that abort a report build entirely.
///
/// Everything below the root is degradable: missing directories become empty
/// collections and malformed manifests are logged and skipped.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture root {} does not exist or is not a directory", .0.display())]
    InvalidRoot(PathBuf),
}

/// A logical resource request, used both for path resolution and as the
/// memoization key. `name` is `None` for collection requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResourceRequest {
    kind: String,
    group: Option<String>,
    namespace: Option<String>,
    name: Option<String>,
}

impl ResourceRequest {
    fn collection(kind: &str, group: Option<&str>, namespace: Option<&str>) -> Self {
        Self {
            kind: kind.to_string(),
            group: group.map(str::to_string),
            namespace: namespace.map(str::to_string),
            name: None,
        }
    }

    fn named(kind: &str, group: Option<&str>, namespace: Option<&str>, name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::collection(kind, group, namespace)
        }
    }
}

/// Read-only repository over one capture root.
///
/// Build one instance per report build; the instance is a single-writer
/// cache and must not be shared across concurrent builds.
#[derive(Debug)]
pub struct Capture {
    root: PathBuf,
    collections: HashMap<ResourceRequest, Vec<Resource>>,
    singletons: HashMap<ResourceRequest, Option<Resource>>,
    pods: HashMap<String, Vec<Pod>>,
}

impl Capture {
    /// Open a capture root. The root must already be resolved and extracted;
    /// a path that is not a directory is the one fatal condition here.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CaptureError::InvalidRoot(root));
        }
        Ok(Self {
            root,
            collections: HashMap::new(),
            singletons: HashMap::new(),
            pods: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cluster autoscaler configuration resources.
    pub fn cluster_autoscalers(&mut self) -> Vec<Resource> {
        self.collection(ResourceRequest::collection(
            "clusterautoscalers",
            Some(AUTOSCALING_GROUP),
            None,
        ))
    }

    /// Machine autoscaler resources in the machine API namespace.
    pub fn machine_autoscalers(&mut self) -> Vec<Resource> {
        self.collection(ResourceRequest::collection(
            "machineautoscalers",
            Some(AUTOSCALING_GROUP),
            Some(MACHINE_API_NAMESPACE),
        ))
    }

    /// All machines, sorted by name.
    pub fn machines(&mut self) -> Vec<Resource> {
        self.collection(ResourceRequest::collection(
            "machines",
            Some(MACHINE_GROUP),
            Some(MACHINE_API_NAMESPACE),
        ))
    }

    /// All machine sets, sorted by name.
    pub fn machine_sets(&mut self) -> Vec<Resource> {
        self.collection(ResourceRequest::collection(
            "machinesets",
            Some(MACHINE_GROUP),
            Some(MACHINE_API_NAMESPACE),
        ))
    }

    /// All nodes, sorted by name. Nodes live in the core group, so no group
    /// path segment is emitted.
    pub fn nodes(&mut self) -> Vec<Resource> {
        self.collection(ResourceRequest::collection("nodes", None, None))
    }

    /// All certificate signing requests, sorted by name.
    pub fn certificate_signing_requests(&mut self) -> Vec<Resource> {
        self.collection(ResourceRequest::collection(
            "certificatesigningrequests",
            Some(CERTIFICATES_GROUP),
            None,
        ))
    }

    /// Deployments within a namespace.
    pub fn deployments(&mut self, namespace: &str) -> Vec<Resource> {
        self.collection(ResourceRequest::collection(
            "deployments",
            Some(APPS_GROUP),
            Some(namespace),
        ))
    }

    /// The cluster version singleton, or `None` when absent or malformed.
    pub fn cluster_version(&mut self) -> Option<Resource> {
        self.singleton(ResourceRequest::named(
            "clusterversions",
            Some(CONFIG_GROUP),
            None,
            "version",
        ))
    }

    /// Pods in a namespace, each joined with its container logs.
    pub fn pods(&mut self, namespace: &str) -> Vec<Pod> {
        if let Some(cached) = self.pods.get(namespace) {
            return cached.clone();
        }
        let loaded = self.load_pods(namespace);
        self.pods.insert(namespace.to_string(), loaded.clone());
        loaded
    }

    fn collection(&mut self, request: ResourceRequest) -> Vec<Resource> {
        if let Some(cached) = self.collections.get(&request) {
            return cached.clone();
        }
        let loaded = self.load_collection(&request);
        self.collections.insert(request, loaded.clone());
        loaded
    }

    fn singleton(&mut self, request: ResourceRequest) -> Option<Resource> {
        if let Some(cached) = self.singletons.get(&request) {
            return cached.clone();
        }
        let loaded = load_resource(&self.manifest_path(&request));
        self.singletons.insert(request, loaded.clone());
        loaded
    }

    /// Build the filesystem path for a request:
    /// `root / scope / [namespace /] [group /] kind / [name.yaml]`.
    fn manifest_path(&self, request: &ResourceRequest) -> PathBuf {
        let mut path = self.root.clone();
        match &request.namespace {
            None => path.push(CLUSTER_SCOPED_DIR),
            Some(namespace) => {
                path.push(NAMESPACES_DIR);
                path.push(namespace);
            }
        }
        if let Some(group) = &request.group {
            path.push(group);
        }
        path.push(&request.kind);
        if let Some(name) = &request.name {
            path.push(format!("{name}.{MANIFEST_EXT}"));
        }
        path
    }

    /// Enumerate manifests directly inside the request's directory.
    ///
    /// A missing directory yields an empty collection; a manifest that fails
    /// to decode is logged and excluded without aborting the rest.
    fn load_collection(&self, request: &ResourceRequest) -> Vec<Resource> {
        let dir = self.manifest_path(request);
        let mut resources = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::debug!("no {} directory at {}", request.kind, dir.display());
                return resources;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXT) || !path.is_file() {
                continue;
            }
            if let Some(resource) = load_resource(&path) {
                resources.push(resource);
            }
        }
        resources.sort_by_key(Resource::name);
        resources
    }

    /// Discover pods under `namespaces/<ns>/pods`.
    ///
    /// Each pod directory holds `<pod>.yaml` plus one sub-directory per
    /// container; container logs live at `<container>/<container>/logs/current.log`.
    /// A pod whose manifest cannot be parsed is skipped entirely.
    fn load_pods(&self, namespace: &str) -> Vec<Pod> {
        let pods_dir = self
            .root
            .join(NAMESPACES_DIR)
            .join(namespace)
            .join("pods");
        let mut pods = Vec::new();
        let entries = match fs::read_dir(&pods_dir) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::debug!("no pods directory at {}", pods_dir.display());
                return pods;
            }
        };
        for entry in entries.flatten() {
            let pod_dir = entry.path();
            if !pod_dir.is_dir() {
                continue;
            }
            let pod_name = entry.file_name().to_string_lossy().into_owned();
            let manifest = pod_dir.join(format!("{pod_name}.{MANIFEST_EXT}"));
            let Some(resource) = load_resource(&manifest) else {
                tracing::error!("skipping pod {pod_name}: no readable manifest");
                continue;
            };
            let mut container_logs = BTreeMap::new();
            if let Ok(children) = fs::read_dir(&pod_dir) {
                for child in children.flatten() {
                    if !child.path().is_dir() {
                        continue;
                    }
                    let container = child.file_name().to_string_lossy().into_owned();
                    let log_path = pod_dir
                        .join(&container)
                        .join(&container)
                        .join("logs")
                        .join("current.log");
                    if !log_path.is_file() {
                        continue;
                    }
                    tracing::debug!("found container logs at {}", log_path.display());
                    match fs::read_to_string(&log_path) {
                        Ok(text) => {
                            container_logs.insert(container, text);
                        }
                        Err(err) => {
                            tracing::error!("unable to read {}: {}", log_path.display(), err)
                        }
                    }
                }
            }
            pods.push(Pod::new(resource, container_logs));
        }
        pods.sort_by_key(Pod::name);
        pods
    }
}

/// Decode one manifest file, or `None` when it is missing or malformed.
/// Callers treat those two cases identically.
fn load_resource(path: &Path) -> Option<Resource> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::error!("unable to read {}: {}", path.display(), err);
            }
            return None;
        }
    };
    tracing::debug!("loading {}", path.display());
    match Resource::parse(&text) {
        Ok(resource) => Some(resource),
        Err(err) => {
            tracing::error!("unable to parse {}: {}", path.display(), err);
            None
        }
    }
}
