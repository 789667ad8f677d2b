//! Conversion between claim manifests and the wire-level PersistentVolumeClaim
//!
//! `expand` builds the create request; `flatten` turns an observed claim back
//! into desired-shaped metadata and spec so callers can compare for drift.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, LabelSelectorRequirement, ObjectMeta,
};

use volclaim_common::kube_utils::is_internal_key;
use volclaim_common::ClaimId;

use crate::manifest::{
    ClaimManifest, ClaimMetadata, ClaimResources, ClaimSelector, ClaimSpec, SelectorRequirement,
};
use crate::state::{ClaimPhase, ObservedStatus};

/// Desired-shaped view of an observed claim
#[derive(Clone, Debug, PartialEq)]
pub struct Observed {
    /// Metadata, with cluster-internal labels and annotations removed
    pub metadata: ClaimMetadata,
    /// Spec
    pub spec: ClaimSpec,
    /// Status
    pub status: ObservedStatus,
}

/// Build the create request for a manifest
pub fn expand(manifest: &ClaimManifest) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: expand_metadata(&manifest.metadata),
        spec: Some(expand_spec(&manifest.spec)),
        status: None,
    }
}

fn expand_metadata(meta: &ClaimMetadata) -> ObjectMeta {
    ObjectMeta {
        name: meta.name.clone().filter(|n| !n.is_empty()),
        generate_name: meta.generate_name.clone().filter(|n| !n.is_empty()),
        namespace: Some(meta.namespace.clone()),
        labels: non_empty(&meta.labels),
        annotations: non_empty(&meta.annotations),
        ..Default::default()
    }
}

fn expand_spec(spec: &ClaimSpec) -> PersistentVolumeClaimSpec {
    PersistentVolumeClaimSpec {
        access_modes: Some(spec.access_modes.iter().cloned().collect()),
        resources: Some(VolumeResourceRequirements {
            requests: quantities(&spec.resources.requests),
            limits: quantities(&spec.resources.limits),
        }),
        selector: spec.selector.as_ref().map(expand_selector),
        volume_name: spec.volume_name.clone(),
        storage_class_name: spec.storage_class_name.clone(),
        ..Default::default()
    }
}

fn expand_selector(selector: &ClaimSelector) -> LabelSelector {
    LabelSelector {
        match_labels: non_empty(&selector.match_labels),
        match_expressions: if selector.match_expressions.is_empty() {
            None
        } else {
            Some(
                selector
                    .match_expressions
                    .iter()
                    .map(|r| LabelSelectorRequirement {
                        key: r.key.clone(),
                        operator: r.operator.clone(),
                        values: if r.values.is_empty() {
                            None
                        } else {
                            Some(r.values.clone())
                        },
                    })
                    .collect(),
            )
        },
    }
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map.clone())
    }
}

fn quantities(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, Quantity>> {
    if map.is_empty() {
        None
    } else {
        Some(
            map.iter()
                .map(|(k, v)| (k.clone(), Quantity(v.clone())))
                .collect(),
        )
    }
}

/// Identity of an observed claim
pub fn claim_id(claim: &PersistentVolumeClaim) -> ClaimId {
    ClaimId::new(
        claim.metadata.namespace.clone().unwrap_or_default(),
        claim.metadata.name.clone().unwrap_or_default(),
    )
}

/// Name of the volume an observed claim is bound to
pub fn bound_volume(claim: &PersistentVolumeClaim) -> Option<&str> {
    claim
        .spec
        .as_ref()
        .and_then(|s| s.volume_name.as_deref())
        .filter(|v| !v.is_empty())
}

/// Phase of an observed claim
pub fn phase(claim: &PersistentVolumeClaim) -> ClaimPhase {
    ClaimPhase::from_status(claim.status.as_ref().and_then(|s| s.phase.as_deref()))
}

/// Translate an observed claim into desired shape
pub fn flatten(claim: &PersistentVolumeClaim) -> Observed {
    Observed {
        metadata: flatten_metadata(&claim.metadata),
        spec: claim.spec.as_ref().map(flatten_spec).unwrap_or_default(),
        status: ObservedStatus {
            phase: phase(claim),
            volume_name: bound_volume(claim).map(str::to_string),
            capacity: claim
                .status
                .as_ref()
                .and_then(|s| s.capacity.as_ref())
                .map(strings)
                .unwrap_or_default(),
        },
    }
}

fn flatten_metadata(meta: &ObjectMeta) -> ClaimMetadata {
    ClaimMetadata {
        name: meta.name.clone(),
        generate_name: meta.generate_name.clone(),
        namespace: meta.namespace.clone().unwrap_or_default(),
        labels: without_internal_keys(meta.labels.as_ref()),
        annotations: without_internal_keys(meta.annotations.as_ref()),
        uid: meta.uid.clone(),
        resource_version: meta.resource_version.clone(),
        generation: meta.generation,
    }
}

fn without_internal_keys(map: Option<&BTreeMap<String, String>>) -> BTreeMap<String, String> {
    map.map(|m| {
        m.iter()
            .filter(|(k, _)| !is_internal_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    })
    .unwrap_or_default()
}

fn flatten_spec(spec: &PersistentVolumeClaimSpec) -> ClaimSpec {
    let resources = spec.resources.as_ref();
    ClaimSpec {
        access_modes: spec
            .access_modes
            .as_ref()
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default(),
        resources: ClaimResources {
            requests: resources
                .and_then(|r| r.requests.as_ref())
                .map(strings)
                .unwrap_or_default(),
            limits: resources
                .and_then(|r| r.limits.as_ref())
                .map(strings)
                .unwrap_or_default(),
        },
        selector: spec.selector.as_ref().map(flatten_selector),
        volume_name: spec.volume_name.clone().filter(|v| !v.is_empty()),
        storage_class_name: spec.storage_class_name.clone(),
    }
}

fn flatten_selector(selector: &LabelSelector) -> ClaimSelector {
    ClaimSelector {
        match_labels: selector.match_labels.clone().unwrap_or_default(),
        match_expressions: selector
            .match_expressions
            .as_ref()
            .map(|exprs| {
                exprs
                    .iter()
                    .map(|r| SelectorRequirement {
                        key: r.key.clone(),
                        operator: r.operator.clone(),
                        values: r.values.clone().unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn strings(map: &BTreeMap<String, Quantity>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect()
}
