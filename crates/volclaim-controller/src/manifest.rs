//! Desired-state types for a PersistentVolumeClaim
//!
//! A `ClaimManifest` is what the user declares: metadata, an immutable spec,
//! and whether creation should block until the claim is bound. Manifests
//! deserialize from YAML or JSON using Kubernetes-style camelCase keys.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use volclaim_common::Error;

use crate::quantity::{same_resources, Quantity};

/// Namespace used when the manifest does not name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resource key for requested storage capacity
pub const STORAGE_RESOURCE: &str = "storage";

/// Access modes accepted by the API server
pub const ACCESS_MODES: &[&str] = &[
    "ReadWriteOnce",
    "ReadOnlyMany",
    "ReadWriteMany",
    "ReadWriteOncePod",
];

/// Label selector operators accepted by the API server
pub const SELECTOR_OPERATORS: &[&str] = &["In", "NotIn", "Exists", "DoesNotExist"];

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_true() -> bool {
    true
}

/// User-declared claim: metadata, spec, and the wait flag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimManifest {
    /// Object metadata
    pub metadata: ClaimMetadata,
    /// Claim spec (immutable once created)
    pub spec: ClaimSpec,
    /// Block creation until the claim reports `Bound`
    #[serde(default = "default_true")]
    pub wait_until_bound: bool,
}

/// Claim metadata
///
/// `uid`, `resource_version` and `generation` are populated from the cluster
/// and ignored on create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMetadata {
    /// Object name; either this or `generate_name` must be set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prefix for a server-generated name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// Namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Server-assigned UID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Server-assigned resource version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Server-assigned generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
}

impl Default for ClaimMetadata {
    fn default() -> Self {
        Self {
            name: None,
            generate_name: None,
            namespace: default_namespace(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            uid: None,
            resource_version: None,
            generation: None,
        }
    }
}

impl ClaimMetadata {
    /// Metadata with a fixed name in the given namespace
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Compute resources requested by the claim
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResources {
    /// Minimum resources required, e.g. `storage: 10Gi`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
    /// Maximum resources allowed
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

impl ClaimResources {
    /// Same keys and equal amounts, however each quantity is spelled
    pub fn equivalent(&self, other: &ClaimResources) -> bool {
        same_resources(&self.requests, &other.requests) && same_resources(&self.limits, &other.limits)
    }
}

/// A single label selector requirement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorRequirement {
    /// Label key
    pub key: String,
    /// One of `In`, `NotIn`, `Exists`, `DoesNotExist`
    pub operator: String,
    /// Values for `In`/`NotIn`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Label query over volumes to consider for binding
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSelector {
    /// Exact label matches
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// Set-based requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<SelectorRequirement>,
}

/// Claim spec
///
/// `volume_name` and `storage_class_name` may be filled in by the cluster;
/// leaving them unset in a manifest accepts whatever the cluster chooses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSpec {
    /// Desired access modes
    #[serde(default)]
    pub access_modes: BTreeSet<String>,
    /// Requested resources
    #[serde(default)]
    pub resources: ClaimResources,
    /// Volume selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<ClaimSelector>,
    /// Name of the volume to bind to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    /// Storage class to provision from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

impl ClaimSpec {
    /// Fields of `self` (desired) that differ from `current` (observed)
    ///
    /// Unset cluster-computed fields in the desired spec never count as a
    /// change.
    pub fn changed_fields(&self, current: &ClaimSpec) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.access_modes != current.access_modes {
            changed.push("spec.accessModes");
        }
        if !self.resources.equivalent(&current.resources) {
            changed.push("spec.resources");
        }
        if self.selector != current.selector {
            changed.push("spec.selector");
        }
        if self.volume_name.is_some() && self.volume_name != current.volume_name {
            changed.push("spec.volumeName");
        }
        if self.storage_class_name.is_some() && self.storage_class_name != current.storage_class_name
        {
            changed.push("spec.storageClassName");
        }
        changed
    }
}

impl ClaimManifest {
    /// Parse a manifest from YAML (JSON is valid YAML)
    pub fn from_yaml(input: &str) -> Result<Self, Error> {
        serde_yaml::from_str(input)
            .map_err(|e| Error::serialization(format!("invalid claim manifest: {}", e)))
    }

    /// Check the manifest for errors the API server would reject
    pub fn validate(&self) -> Result<(), Error> {
        let meta = &self.metadata;
        match (meta.name.as_deref(), meta.generate_name.as_deref()) {
            (None | Some(""), None | Some("")) => {
                return Err(Error::validation_for_field(
                    "metadata.name",
                    "either name or generateName is required",
                ))
            }
            (Some(name), _) if name.contains('/') => {
                return Err(Error::validation_for_field(
                    "metadata.name",
                    format!("name '{}' must not contain '/'", name),
                ))
            }
            _ => {}
        }
        if meta.namespace.contains('/') {
            return Err(Error::validation_for_field(
                "metadata.namespace",
                format!("namespace '{}' must not contain '/'", meta.namespace),
            ));
        }

        let spec = &self.spec;
        if spec.access_modes.is_empty() {
            return Err(Error::validation_for_field(
                "spec.accessModes",
                "at least one access mode is required",
            ));
        }
        if let Some(mode) = spec
            .access_modes
            .iter()
            .find(|m| !ACCESS_MODES.contains(&m.as_str()))
        {
            return Err(Error::validation_for_field(
                "spec.accessModes",
                format!("unknown access mode '{}'", mode),
            ));
        }
        if !spec.resources.requests.contains_key(STORAGE_RESOURCE) {
            return Err(Error::validation_for_field(
                "spec.resources.requests",
                "a storage request is required",
            ));
        }
        for (field, values) in [
            ("spec.resources.requests", &spec.resources.requests),
            ("spec.resources.limits", &spec.resources.limits),
        ] {
            for (key, value) in values {
                if value.parse::<Quantity>().is_err() {
                    return Err(Error::validation_for_field(
                        field,
                        format!("invalid quantity '{}' for '{}'", value, key),
                    ));
                }
            }
        }
        if let Some(selector) = &spec.selector {
            for expr in &selector.match_expressions {
                if !SELECTOR_OPERATORS.contains(&expr.operator.as_str()) {
                    return Err(Error::validation_for_field(
                        "spec.selector.matchExpressions",
                        format!("unknown operator '{}' for key '{}'", expr.operator, expr.key),
                    ));
                }
            }
        }
        Ok(())
    }
}
