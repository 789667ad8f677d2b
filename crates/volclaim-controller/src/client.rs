//! Cluster API seam for claim operations
//!
//! `ClaimApi` is the only place the controller talks to the API server.
//! Every kube-rs error is classified here into `NotFound` or `Transport`
//! so the rest of the crate never inspects raw HTTP responses.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, PersistentVolumeClaim};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use volclaim_common::kube_utils::field_selector;
use volclaim_common::{ClaimId, Error, CLAIM_KIND, FIELD_MANAGER};

use crate::diagnostics::ObjectTarget;
use crate::patch::MetadataPatch;

/// Kind name used when classifying event list failures
const EVENT_KIND: &str = "Event";

/// Trait abstracting the claim and event operations the controller needs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClaimApi: Send + Sync {
    /// Submit a new claim, returning the object as stored by the server
    async fn create(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, Error>;

    /// Fetch a claim by namespace and name
    async fn get(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, Error>;

    /// Apply a JSON Patch to a claim's metadata
    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &MetadataPatch,
    ) -> Result<PersistentVolumeClaim, Error>;

    /// Delete a claim
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error>;

    /// List `Warning` events whose involved object is `target`
    async fn list_warning_events(&self, target: &ObjectTarget) -> Result<Vec<Event>, Error>;
}

/// `ClaimApi` backed by a kube-rs client
#[derive(Clone)]
pub struct KubeClaimApi {
    client: Client,
}

impl KubeClaimApi {
    /// Wrap a client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn claims(&self, namespace: &str) -> Api<PersistentVolumeClaim> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn claim_error(err: kube::Error, namespace: &str, name: &str) -> Error {
    Error::from_kube(err, CLAIM_KIND, ClaimId::new(namespace, name).encode())
}

#[async_trait]
impl ClaimApi for KubeClaimApi {
    async fn create(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, Error> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        let requested = claim
            .metadata
            .name
            .as_deref()
            .or(claim.metadata.generate_name.as_deref())
            .unwrap_or_default();
        debug!(namespace, name = requested, "creating claim");
        self.claims(namespace)
            .create(&params, claim)
            .await
            .map_err(|e| claim_error(e, namespace, requested))
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim, Error> {
        self.claims(namespace)
            .get(name)
            .await
            .map_err(|e| claim_error(e, namespace, name))
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &MetadataPatch,
    ) -> Result<PersistentVolumeClaim, Error> {
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        debug!(namespace, name, ops = %patch, "patching claim metadata");
        self.claims(namespace)
            .patch(name, &params, &Patch::<()>::Json(patch.to_json_patch()))
            .await
            .map_err(|e| claim_error(e, namespace, name))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        self.claims(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| claim_error(e, namespace, name))
    }

    async fn list_warning_events(&self, target: &ObjectTarget) -> Result<Vec<Event>, Error> {
        let selector = field_selector([
            ("involvedObject.kind", target.kind.as_str()),
            ("involvedObject.name", target.name.as_str()),
            ("involvedObject.namespace", target.namespace.as_str()),
            ("type", "Warning"),
        ]);
        let api: Api<Event> = if target.namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), &target.namespace)
        };
        debug!(selector = %selector, "listing warning events");
        let list = api
            .list(&ListParams::default().fields(&selector))
            .await
            .map_err(|e| Error::from_kube(e, EVENT_KIND, target.to_string()))?;
        Ok(list.items)
    }
}
