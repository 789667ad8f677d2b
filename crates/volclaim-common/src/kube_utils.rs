//! Shared Kubernetes utilities using kube-rs

use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::Error;

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from optional kubeconfig path with custom timeouts
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig: {}", e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Build a field selector string from `key=value` pairs, skipping empty values
///
/// Empty values are dropped rather than sent as `key=`, which the API server
/// would interpret as "field is empty".
pub fn field_selector<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether a label or annotation key belongs to the Kubernetes system domain
///
/// Matches keys whose prefix is `kubernetes.io` or any subdomain of it, e.g.
/// `pv.kubernetes.io/bind-completed` or `volume.beta.kubernetes.io/storage-provisioner`.
/// Unprefixed keys are never internal.
pub fn is_internal_key(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, _)) => prefix == "kubernetes.io" || prefix.ends_with(".kubernetes.io"),
        None => false,
    }
}
