//! Integration tests for the claim lifecycle
//!
//! These tests tell the story of a user managing a claim through the
//! controller: the claim is created, binds (or fails to), gets relabelled,
//! and is finally removed.

use std::sync::Arc;
use std::time::Duration;

use volclaim_controller::{
    ClaimController, ClaimManifest, ClaimPhase, ClaimState, ControllerConfig, KubeClaimApi,
    Lifecycle, PollCadence, Presence, TokioClock,
};

use super::helpers::{cleanup, create_static_volume, ensure_test_cluster, STATIC_CLASS};

// =============================================================================
// Test Fixtures
// =============================================================================

fn static_manifest(name: &str, selector_label: &str) -> ClaimManifest {
    ClaimManifest::from_yaml(&format!(
        r#"
metadata:
  name: {name}
  namespace: default
  labels:
    app: volclaim-test
spec:
  accessModes: [ReadWriteOnce]
  resources:
    requests:
      storage: 1Gi
  storageClassName: {STATIC_CLASS}
  selector:
    matchLabels:
      volclaim-test: {selector_label}
"#
    ))
    .expect("fixture manifest parses")
}

fn controller(client: kube::Client, timeout: Duration) -> ClaimController {
    ClaimController::new(
        Arc::new(KubeClaimApi::new(client)),
        Arc::new(TokioClock),
        ControllerConfig::default()
            .with_create_timeout(timeout)
            .with_cadence(PollCadence::fixed(Duration::from_secs(1))),
    )
}

// =============================================================================
// Stories
// =============================================================================

/// Story: a claim binds to a matching static volume, gets relabelled, and is deleted
///
/// Expected behavior:
/// - create waits until the claim reports Bound and mirrors the bound volume
/// - update patches labels without touching the spec
/// - delete clears the record and exists reports false afterwards
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_claim_binds_relabels_and_is_deleted() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let (claim, volume) = ("volclaim-binds", "volclaim-binds-pv");
    cleanup(&client, claim, Some(volume)).await;
    create_static_volume(&client, volume, claim).await;

    let ctrl = controller(client.clone(), Duration::from_secs(60));
    let mut state = ClaimState::default();

    // Act: create and wait for binding
    ctrl.create(&mut state, &static_manifest(claim, claim))
        .await
        .expect("claim should bind");

    let status = state.status.clone().expect("status mirrored");
    assert_eq!(status.phase, ClaimPhase::Bound);
    assert_eq!(status.volume_name.as_deref(), Some(volume));
    assert_eq!(state.lifecycle, Lifecycle::Ready);

    // Act: relabel
    let mut desired = static_manifest(claim, claim);
    desired.metadata.labels.insert("tier".to_string(), "db".to_string());
    ctrl.update(&mut state, &desired)
        .await
        .expect("metadata update should succeed");
    let labels = &state.metadata.as_ref().expect("metadata mirrored").labels;
    assert_eq!(labels.get("tier").map(String::as_str), Some("db"));

    // Act: delete twice
    ctrl.delete(&mut state).await.expect("delete should succeed");
    assert!(state.id.is_none());

    let mut stale = ClaimController::import(&format!("default/{claim}")).expect("valid id");
    ctrl.delete(&mut stale)
        .await
        .expect("second delete is idempotent");

    cleanup(&client, claim, Some(volume)).await;
}

/// Story: a claim that can never bind times out and is left in place
///
/// Expected behavior:
/// - create fails with a timeout naming the last phase, Pending
/// - the identity is kept so the claim can still be read and deleted
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_unbindable_claim_times_out_and_is_retained() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let claim = "volclaim-unbindable";
    cleanup(&client, claim, None).await;

    let ctrl = controller(client.clone(), Duration::from_secs(5));
    let mut state = ClaimState::default();

    let err = ctrl
        .create(&mut state, &static_manifest(claim, "no-such-volume"))
        .await
        .expect_err("no volume matches the selector");
    assert!(err.is_convergence(), "unexpected error: {err}");
    assert_eq!(err.phase(), Some("Pending"));

    assert_eq!(state.id.as_deref(), Some("default/volclaim-unbindable"));
    assert!(ctrl.exists(&state).await.expect("exists should answer"));
    assert_eq!(
        ctrl.read(&mut state).await.expect("read should succeed"),
        Presence::Present
    );

    ctrl.delete(&mut state).await.expect("delete should succeed");
    cleanup(&client, claim, None).await;
}

/// Story: a claim deleted behind the controller's back reads as absent
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_out_of_band_delete_reads_as_absent() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let claim = "volclaim-out-of-band";
    cleanup(&client, claim, None).await;

    let ctrl = controller(client.clone(), Duration::from_secs(5));
    let mut manifest = static_manifest(claim, "unused");
    manifest.wait_until_bound = false;
    let mut state = ClaimState::default();
    ctrl.create(&mut state, &manifest)
        .await
        .expect("create without wait should succeed");

    cleanup(&client, claim, None).await;
    // Deletion may leave a short-lived terminating object behind.
    for _ in 0..30 {
        if !ctrl.exists(&state).await.expect("exists should answer") {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    assert_eq!(
        ctrl.read(&mut state).await.expect("absence is not an error"),
        Presence::Absent
    );
    assert!(state.id.is_none());
}
