//! Test helpers for kind-backed integration tests

use std::collections::BTreeMap;
use std::process::Command;
use std::sync::OnceLock;

use k8s_openapi::api::core::v1::{
    HostPathVolumeSource, PersistentVolume, PersistentVolumeClaim, PersistentVolumeSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "volclaim-integration-test";

/// Namespace every test claim lives in
pub const TEST_NAMESPACE: &str = "default";

/// Storage class name used for statically provisioned test volumes
pub const STATIC_CLASS: &str = "volclaim-static";

static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Check if a kind cluster with the given name exists
pub fn kind_cluster_exists(name: &str) -> bool {
    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .expect("failed to run kind");

    let clusters = String::from_utf8_lossy(&output.stdout);
    clusters.lines().any(|line| line.trim() == name)
}

/// Create a kind cluster for testing, reusing an existing one
pub fn create_kind_cluster(name: &str) -> Result<(), String> {
    if kind_cluster_exists(name) {
        println!("Kind cluster '{name}' already exists, reusing it");
        return Ok(());
    }

    println!("Creating kind cluster '{name}'...");
    let output = Command::new("kind")
        .args(["create", "cluster", "--name", name, "--wait", "60s"])
        .output()
        .map_err(|e| format!("failed to run kind: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "failed to create kind cluster: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(())
}

/// Create a client bound to the test cluster's context
pub async fn create_test_client() -> Result<Client, String> {
    let config = Config::from_kubeconfig(&KubeConfigOptions {
        context: Some(format!("kind-{TEST_CLUSTER_NAME}")),
        ..Default::default()
    })
    .await
    .map_err(|e| format!("failed to load kubeconfig: {e}"))?;

    Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))
}

/// Ensure the test cluster exists and return a fresh client for it
pub async fn ensure_test_cluster() -> Result<Client, String> {
    CLUSTER_INIT
        .get_or_init(|| create_kind_cluster(TEST_CLUSTER_NAME))
        .clone()?;
    create_test_client().await
}

/// Create a hostPath volume that a claim with `selector_label` can bind to
pub async fn create_static_volume(client: &Client, name: &str, selector_label: &str) {
    let api: Api<PersistentVolume> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;

    let volume = PersistentVolume {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                "volclaim-test".to_string(),
                selector_label.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            capacity: Some(BTreeMap::from([(
                "storage".to_string(),
                Quantity("1Gi".to_string()),
            )])),
            host_path: Some(HostPathVolumeSource {
                path: format!("/tmp/{name}"),
                type_: Some("DirectoryOrCreate".to_string()),
            }),
            storage_class_name: Some(STATIC_CLASS.to_string()),
            persistent_volume_reclaim_policy: Some("Delete".to_string()),
            ..Default::default()
        }),
        status: None,
    };
    api.create(&PostParams::default(), &volume)
        .await
        .expect("failed to create test volume");
}

/// Remove a claim and a volume left over from earlier runs
pub async fn cleanup(client: &Client, claim: &str, volume: Option<&str>) {
    let claims: Api<PersistentVolumeClaim> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let _ = claims.delete(claim, &DeleteParams::default()).await;
    if let Some(volume) = volume {
        let volumes: Api<PersistentVolume> = Api::all(client.clone());
        let _ = volumes.delete(volume, &DeleteParams::default()).await;
    }
}
