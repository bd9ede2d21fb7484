//! Contract Test: Failure Isolation
//!
//! This test verifies that a failure is contained to the record it happened on.
//!
//! Constraints verified:
//! - A provider error on one record leaves the other records processed
//! - Every entry gets exactly one report, in input order
//! - Malformed entries are reported as failed without touching the provider
//! - An unresolvable zone is fatal for the whole run
//!
//! If this test fails, one bad record can take down a whole batch.

mod common;

use common::*;
use dnsync_core::{Error, ReconcileOutcome, Reconciler};
use std::sync::Arc;
use tokio_test::assert_err;

#[tokio::test]
async fn failing_middle_record_does_not_stop_the_others() {
    let zone = InMemoryZone::new();
    zone.fail_create_for("two.example.com");
    let (reconciler, reporter) = reconciler(&zone);

    let summary = reconciler
        .reconcile_all(&desired(
            r#"[
                {"name":"one","type":"A","content":"10.0.0.1"},
                {"name":"two","type":"A","content":"not-an-ip"},
                {"name":"three","type":"A","content":"10.0.0.3"}
            ]"#,
        ))
        .await;

    let outcomes: Vec<_> = summary.reports.iter().map(|r| &r.outcome).collect();
    assert_eq!(outcomes[0], &ReconcileOutcome::Created);
    assert!(outcomes[1].is_failure());
    assert_eq!(outcomes[2], &ReconcileOutcome::Created);

    let ReconcileOutcome::Failed { reason } = outcomes[1] else {
        unreachable!();
    };
    assert!(reason.contains("Validation Error"), "provider detail kept: {}", reason);

    let reported: Vec<_> = reporter.reports().iter().map(|r| r.position).collect();
    assert_eq!(reported, vec![0, 1, 2], "one report per record, in order");

    assert_eq!(zone.records_named("one.example.com").len(), 1);
    assert_eq!(zone.records_named("three.example.com").len(), 1);
    assert!(summary.has_failures());
}

#[tokio::test]
async fn malformed_entry_is_reported_and_skipped() {
    let zone = InMemoryZone::new();
    let (reconciler, reporter) = reconciler(&zone);

    let summary = reconciler
        .reconcile_all(&desired(
            r#"[
                {"name":"one","type":"A","content":"10.0.0.1"},
                {"name":"broken","type":"A"},
                {"name":"three","type":"TXT","content":"ok"}
            ]"#,
        ))
        .await;

    assert_eq!(summary.created(), 2);
    assert_eq!(summary.failed(), 1);

    let broken = &summary.reports[1];
    assert_eq!(broken.name, "broken");
    assert_eq!(broken.record_type, None);
    assert!(broken.outcome.is_failure());

    assert!(
        zone.calls()
            .iter()
            .all(|c| !matches!(c, Call::Lookup(name) if name.starts_with("broken"))),
        "malformed entries never reach the provider"
    );
    assert_eq!(reporter.reports().len(), 3);
}

#[tokio::test]
async fn lookup_failure_is_contained() {
    let zone = InMemoryZone::new();
    zone.fail_lookups_transiently("flaky.example.com", 10);
    let (reconciler, _reporter) = reconciler(&zone);

    let summary = reconciler
        .reconcile_all(&desired(
            r#"[
                {"name":"flaky","type":"A","content":"10.0.0.1"},
                {"name":"fine","type":"A","content":"10.0.0.2"}
            ]"#,
        ))
        .await;

    assert!(summary.reports[0].outcome.is_failure());
    assert_eq!(summary.reports[1].outcome, ReconcileOutcome::Created);
    assert!(zone.records_named("flaky.example.com").is_empty());
}

#[tokio::test]
async fn unresolvable_zone_is_fatal() {
    let zone = InMemoryZone::new();

    let result = Reconciler::connect(
        &zone,
        Arc::new(zone.clone()),
        "missing.test",
        &test_settings(),
        Arc::new(RecordingReporter::new()),
    )
    .await;

    let err = assert_err!(result);
    assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
    assert!(zone.calls().is_empty(), "no record calls without a zone");
}

#[tokio::test]
async fn zone_resolution_error_keeps_its_class() {
    let zone = InMemoryZone::new();
    zone.reject_token();

    let result = Reconciler::connect(
        &zone,
        Arc::new(zone.clone()),
        ZONE_NAME,
        &test_settings(),
        Arc::new(RecordingReporter::new()),
    )
    .await;

    let err = assert_err!(result);
    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
    assert!(!err.is_not_found());
}

#[test]
fn report_serializes_with_flat_outcome() {
    let report = dnsync_core::RecordReport::new(
        1,
        "two.example.com",
        Some(dnsync_core::RecordType::A),
        ReconcileOutcome::failed("boom"),
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["name"], "two.example.com");
    assert_eq!(json["type"], "A");
    assert_eq!(json["outcome"], "failed");
    assert_eq!(json["reason"], "boom");
}
