//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides an in-memory zone that behaves like a provider's
//! record store, records every call made against it, and can be told to
//! fail specific operations.

#![allow(dead_code)]

use async_trait::async_trait;
use dnsync_core::error::{Error, Result};
use dnsync_core::traits::{
    NewRecord, ObservedRecord, RecordReport, RecordStore, Reporter, Zone, ZoneId, ZoneResolver,
};
use dnsync_core::{DesiredEntry, ReconcileSettings, Reconciler};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ZONE_NAME: &str = "example.com";
pub const ZONE_ID: &str = "zid1";

/// A call made against the in-memory zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Lookup(String),
    Delete(String),
    Create(NewRecord),
}

#[derive(Default)]
struct ZoneState {
    records: Mutex<Vec<ObservedRecord>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    resolve_calls: AtomicUsize,
    reject_token: AtomicBool,
    fail_create_for: Mutex<HashSet<String>>,
    fail_delete_for: Mutex<HashSet<String>>,
    vanish_on_delete: Mutex<HashSet<String>>,
    transient_lookup_failures: Mutex<HashMap<String, usize>>,
    lookup_delays: Mutex<HashMap<String, Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory stand-in for a provider zone
///
/// Clones share state, so a test can keep one handle for assertions while the
/// reconciler owns another.
#[derive(Clone, Default)]
pub struct InMemoryZone {
    state: Arc<ZoneState>,
}

impl InMemoryZone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing record, returning its id
    pub fn seed(&self, name: &str, record_type: &str, content: &str) -> String {
        let id = self.next_id();
        self.state.records.lock().unwrap().push(ObservedRecord {
            id: id.clone(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            content: content.to_string(),
            ttl: Some(300),
            proxied: None,
        });
        id
    }

    /// Zone lookups fail as if the API token were rejected
    pub fn reject_token(&self) {
        self.state.reject_token.store(true, Ordering::SeqCst);
    }

    /// Creates for this fqdn fail like a provider validation error
    pub fn fail_create_for(&self, fqdn: &str) {
        self.state
            .fail_create_for
            .lock()
            .unwrap()
            .insert(fqdn.to_string());
    }

    /// Deletes of this record id fail with a permission error
    pub fn fail_delete_for(&self, record_id: &str) {
        self.state
            .fail_delete_for
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    /// The record disappears right before the delete lands (delete → NotFound)
    pub fn vanish_on_delete(&self, record_id: &str) {
        self.state
            .vanish_on_delete
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    /// The next `count` lookups of this fqdn fail with a transport error
    pub fn fail_lookups_transiently(&self, fqdn: &str, count: usize) {
        self.state
            .transient_lookup_failures
            .lock()
            .unwrap()
            .insert(fqdn.to_string(), count);
    }

    /// Lookups of this fqdn take `delay` to answer
    pub fn delay_lookup(&self, fqdn: &str, delay: Duration) {
        self.state
            .lookup_delays
            .lock()
            .unwrap()
            .insert(fqdn.to_string(), delay);
    }

    pub fn records(&self) -> Vec<ObservedRecord> {
        self.state.records.lock().unwrap().clone()
    }

    pub fn records_named(&self, fqdn: &str) -> Vec<ObservedRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.name == fqdn)
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.state.calls.lock().unwrap().clear();
    }

    pub fn creates(&self) -> Vec<NewRecord> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.creates().len() + self.deletes().len()
    }

    pub fn resolve_call_count(&self) -> usize {
        self.state.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> String {
        format!("rec-{}", self.state.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn log(&self, call: Call) {
        self.state.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ZoneResolver for InMemoryZone {
    async fn resolve_zone(&self, zone_name: &str) -> Result<ZoneId> {
        self.state.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.reject_token.load(Ordering::SeqCst) {
            Err(Error::auth("Invalid API token or insufficient permissions"))
        } else if zone_name == ZONE_NAME {
            Ok(ZoneId::new(ZONE_ID))
        } else {
            Err(Error::not_found(format!("Zone not found: {}", zone_name)))
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryZone {
    async fn list_by_name(&self, zone: &ZoneId, name: &str) -> Result<Vec<ObservedRecord>> {
        assert_eq!(zone.as_str(), ZONE_ID, "record calls must use the resolved zone");
        self.log(Call::Lookup(name.to_string()));

        let in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.state.lookup_delays.lock().unwrap().get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        {
            let mut failures = self.state.transient_lookup_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(name)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(Error::transport("connection reset by peer"));
            }
        }

        Ok(self.records_named(name))
    }

    async fn delete_by_id(&self, zone: &ZoneId, record_id: &str) -> Result<()> {
        assert_eq!(zone.as_str(), ZONE_ID, "record calls must use the resolved zone");
        self.log(Call::Delete(record_id.to_string()));

        if self.state.fail_delete_for.lock().unwrap().contains(record_id) {
            return Err(Error::auth("token lacks DNS edit permission"));
        }

        let mut records = self.state.records.lock().unwrap();
        if self.state.vanish_on_delete.lock().unwrap().contains(record_id) {
            records.retain(|r| r.id != record_id);
        }

        let before = records.len();
        records.retain(|r| r.id != record_id);
        if records.len() == before {
            return Err(Error::not_found(format!("Record does not exist: {}", record_id)));
        }
        Ok(())
    }

    async fn create_record(&self, zone: &ZoneId, record: &NewRecord) -> Result<ObservedRecord> {
        assert_eq!(zone.as_str(), ZONE_ID, "record calls must use the resolved zone");
        self.log(Call::Create(record.clone()));

        if self.state.fail_create_for.lock().unwrap().contains(&record.name) {
            return Err(Error::transport(format!(
                "400 Bad Request - DNS Validation Error (1004): invalid content for {}",
                record.name
            )));
        }

        let observed = ObservedRecord {
            id: self.next_id(),
            name: record.name.clone(),
            record_type: record.record_type.as_str().to_string(),
            content: record.content.clone(),
            ttl: Some(record.ttl),
            proxied: record.proxied,
        };
        self.state.records.lock().unwrap().push(observed.clone());
        Ok(observed)
    }

    fn provider_name(&self) -> &'static str {
        "in-memory"
    }
}

/// A reporter that keeps every report it receives
#[derive(Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<RecordReport>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<RecordReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, report: &RecordReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Settings for tests: sequential, retries enabled but without delay
pub fn test_settings() -> ReconcileSettings {
    ReconcileSettings {
        retry_delay_secs: 0,
        ..ReconcileSettings::default()
    }
}

/// Build a reconciler over `zone` for the standard test zone
pub fn reconciler_with(
    zone: &InMemoryZone,
    settings: &ReconcileSettings,
) -> (Reconciler, RecordingReporter) {
    let reporter = RecordingReporter::new();
    let reconciler = Reconciler::new(
        Arc::new(zone.clone()),
        Zone {
            id: ZoneId::new(ZONE_ID),
            name: ZONE_NAME.to_string(),
        },
        settings,
        Arc::new(reporter.clone()),
    )
    .expect("reconciler construction succeeds")
    .with_retry_delay(Duration::ZERO);

    (reconciler, reporter)
}

/// Build a sequential reconciler with the default test settings
pub fn reconciler(zone: &InMemoryZone) -> (Reconciler, RecordingReporter) {
    reconciler_with(zone, &test_settings())
}

/// Parse a JSON desired-record list, panicking on a malformed document
pub fn desired(json: &str) -> Vec<DesiredEntry> {
    dnsync_core::parse_desired_records(json).expect("desired records parse")
}
