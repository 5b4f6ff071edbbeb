//! Resource and Pod wrappers over decoded manifest documents
//!
//! Manifests are kept as duck-typed YAML value trees rather than per-kind
//! structs; the derived views only ever read a handful of well-known paths.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// A single decoded manifest document.
///
/// Wraps the raw YAML value tree and exposes the identity and serialization
/// behavior the report layer needs. Lookups never fail; a missing path
/// resolves to `None` and a missing name to the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    doc: Value,
}

impl Resource {
    /// Wrap an already-decoded document.
    pub fn new(doc: Value) -> Self {
        Self { doc }
    }

    /// Decode a manifest from its YAML text.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        Ok(Self {
            doc: serde_yaml::from_str(text)?,
        })
    }

    /// The raw document tree.
    pub fn doc(&self) -> &Value {
        &self.doc
    }

    /// Mutable access to the document tree.
    ///
    /// Used by the CSR decoder to swap the raw request for its decoded form.
    pub fn doc_mut(&mut self) -> &mut Value {
        &mut self.doc
    }

    /// `metadata.name`, or the empty string when absent.
    pub fn name(&self) -> String {
        self.get_str(&["metadata", "name"]).unwrap_or_default().to_string()
    }

    /// Walk a path of mapping keys, returning `None` on the first miss.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.doc;
        for key in path {
            current = current.get(*key)?;
        }
        Some(current)
    }

    /// Like [`Resource::get`] but coerced to a string slice.
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Look up a `metadata.annotations` entry.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.get_str(&["metadata", "annotations", key])
    }

    /// Canonical YAML serialization of the document.
    ///
    /// Works on a private deep copy with `metadata.managedFields` stripped,
    /// so the output never aliases the stored document. Serializing the
    /// output again yields byte-identical text.
    pub fn as_yaml(&self) -> String {
        let mut doc = self.doc.clone();
        if let Some(metadata) = doc.get_mut("metadata").and_then(Value::as_mapping_mut) {
            metadata.remove("managedFields");
        }
        serde_yaml::to_string(&doc).unwrap_or_else(|err| {
            tracing::error!("unable to serialize resource {}: {}", self.name(), err);
            String::new()
        })
    }
}

/// A pod manifest joined with the log text of its containers.
///
/// The map goes from container name to the full contents of that container's
/// current log file. A pod with no discoverable logs is still valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Pod {
    resource: Resource,
    container_logs: BTreeMap<String, String>,
}

impl Pod {
    pub fn new(resource: Resource, container_logs: BTreeMap<String, String>) -> Self {
        Self {
            resource,
            container_logs,
        }
    }

    pub fn name(&self) -> String {
        self.resource.name()
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn container_logs(&self) -> &BTreeMap<String, String> {
        &self.container_logs
    }
}
