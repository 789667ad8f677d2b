//! Typed JSON Patch operations over claim metadata
//!
//! Only `/metadata/labels` and `/metadata/annotations` can be targeted; every
//! path is derived from a `MetadataField` and a key, so a malformed pointer
//! cannot be constructed. Keys are escaped per RFC 6901 by `jsonptr`.

use std::collections::BTreeMap;
use std::fmt;

use json_patch::{AddOperation, PatchOperation, RemoveOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use volclaim_common::kube_utils::is_internal_key;

use crate::manifest::ClaimMetadata;

/// Mutable metadata maps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataField {
    /// `/metadata/labels`
    Labels,
    /// `/metadata/annotations`
    Annotations,
}

impl MetadataField {
    fn as_str(self) -> &'static str {
        match self {
            MetadataField::Labels => "labels",
            MetadataField::Annotations => "annotations",
        }
    }
}

/// One metadata patch operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataOp {
    /// Create the whole map (the server has none)
    AddMap {
        /// Target map
        field: MetadataField,
        /// Entries to set
        entries: BTreeMap<String, String>,
    },
    /// Add a new key
    Add {
        /// Target map
        field: MetadataField,
        /// Key to add
        key: String,
        /// Value to set
        value: String,
    },
    /// Change the value of an existing key
    Replace {
        /// Target map
        field: MetadataField,
        /// Key to change
        key: String,
        /// New value
        value: String,
    },
    /// Remove an existing key
    Remove {
        /// Target map
        field: MetadataField,
        /// Key to remove
        key: String,
    },
}

impl MetadataOp {
    /// JSON pointer targeted by this operation
    pub fn path(&self) -> PointerBuf {
        match self {
            MetadataOp::AddMap { field, .. } => PointerBuf::from_tokens(["metadata", field.as_str()]),
            MetadataOp::Add { field, key, .. }
            | MetadataOp::Replace { field, key, .. }
            | MetadataOp::Remove { field, key } => {
                PointerBuf::from_tokens(["metadata", field.as_str(), key.as_str()])
            }
        }
    }

    fn to_operation(&self) -> PatchOperation {
        let path = self.path();
        match self {
            MetadataOp::AddMap { entries, .. } => PatchOperation::Add(AddOperation {
                path,
                value: Value::Object(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                ),
            }),
            MetadataOp::Add { value, .. } => PatchOperation::Add(AddOperation {
                path,
                value: Value::String(value.clone()),
            }),
            MetadataOp::Replace { value, .. } => PatchOperation::Replace(ReplaceOperation {
                path,
                value: Value::String(value.clone()),
            }),
            MetadataOp::Remove { .. } => PatchOperation::Remove(RemoveOperation { path }),
        }
    }
}

/// Ordered list of metadata operations, applied as one JSON Patch document
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataPatch {
    ops: Vec<MetadataOp>,
}

impl MetadataPatch {
    /// Operations in application order
    pub fn ops(&self) -> &[MetadataOp] {
        &self.ops
    }

    /// True when there is nothing to change
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Append an operation
    pub fn push(&mut self, op: MetadataOp) {
        self.ops.push(op);
    }

    /// Convert to a JSON Patch document
    pub fn to_json_patch(&self) -> json_patch::Patch {
        json_patch::Patch(self.ops.iter().map(MetadataOp::to_operation).collect())
    }
}

impl fmt::Display for MetadataPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .ops
            .iter()
            .map(|op| {
                let verb = match op {
                    MetadataOp::AddMap { .. } | MetadataOp::Add { .. } => "add",
                    MetadataOp::Replace { .. } => "replace",
                    MetadataOp::Remove { .. } => "remove",
                };
                format!("{} {}", verb, op.path())
            })
            .collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}

/// Build the patch that turns `current` (live object metadata) into `desired`
///
/// Cluster-internal keys present on the live object are never removed.
pub fn diff_metadata(current: &ObjectMeta, desired: &ClaimMetadata) -> MetadataPatch {
    let mut patch = MetadataPatch::default();
    diff_map(
        &mut patch,
        MetadataField::Labels,
        current.labels.as_ref(),
        &desired.labels,
    );
    diff_map(
        &mut patch,
        MetadataField::Annotations,
        current.annotations.as_ref(),
        &desired.annotations,
    );
    patch
}

fn diff_map(
    patch: &mut MetadataPatch,
    field: MetadataField,
    current: Option<&BTreeMap<String, String>>,
    desired: &BTreeMap<String, String>,
) {
    let current = match current {
        Some(map) => map,
        None => {
            if !desired.is_empty() {
                patch.push(MetadataOp::AddMap {
                    field,
                    entries: desired.clone(),
                });
            }
            return;
        }
    };

    for (key, value) in desired {
        match current.get(key) {
            None => patch.push(MetadataOp::Add {
                field,
                key: key.clone(),
                value: value.clone(),
            }),
            Some(existing) if existing != value => patch.push(MetadataOp::Replace {
                field,
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }

    for key in current.keys() {
        if !desired.contains_key(key) && !is_internal_key(key) {
            patch.push(MetadataOp::Remove {
                field,
                key: key.clone(),
            });
        }
    }
}
