//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Qualifying each desired record's name against the zone
//! - Looking up what currently exists under that name
//! - Deciding between no-op, create, and delete-then-create
//! - Applying the change and reporting one outcome per record
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   resolve once   ┌──────────────┐
//! │ ZoneResolver │ ───────────────▶ │  Reconciler  │◀── Vec<DesiredEntry>
//! └──────────────┘                  └──────────────┘
//!                                      │        │
//!                     lookup / delete  │        │  RecordReport
//!                     / create         ▼        ▼
//!                            ┌──────────────┐ ┌──────────────┐
//!                            │ RecordStore  │ │   Reporter   │
//!                            └──────────────┘ └──────────────┘
//! ```
//!
//! ## Per-record flow
//!
//! 1. Qualify the name (`www` → `www.example.com`)
//! 2. List records with that name and find conflicts (see [`MatchPolicy`])
//! 3. A record with the same type and content → `Unchanged`
//! 4. Nothing conflicting → create → `Created`
//! 5. Conflicting records → delete each, then create → `Replaced`
//! 6. Any error → `Failed` for this record only
//!
//! Records are independent. With `concurrency > 1` they run as separate
//! tasks, but the steps of one record are always strictly ordered.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{DesiredEntry, DesiredRecord, MatchPolicy, RecordType, ReconcileSettings};
use crate::error::Result;
use crate::traits::{
    NewRecord, ObservedRecord, ReconcileOutcome, RecordReport, RecordStore, Reporter, Zone,
    ZoneResolver,
};

/// Reason reported for records that were never started because the run's
/// deadline had passed
pub const DEADLINE_EXCEEDED_REASON: &str = "deadline exceeded before reconciliation started";

/// Turn a record name into its fully-qualified form within `zone_name`
///
/// A name that already ends with the zone name (exact, case-sensitive suffix)
/// is used as-is; otherwise the zone is appended. `"@"` denotes the apex and
/// a trailing dot marks an already absolute name.
pub fn qualify_name(name: &str, zone_name: &str) -> String {
    if name == "@" {
        return zone_name.to_string();
    }

    let name = name.strip_suffix('.').unwrap_or(name);
    if name.ends_with(zone_name) {
        name.to_string()
    } else {
        format!("{}.{}", name, zone_name)
    }
}

/// What has to happen to converge one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan<'a> {
    /// The existing record already matches
    Unchanged,
    /// Nothing relevant exists; create the record
    Create,
    /// Delete these existing records in order, then create the desired one
    Replace(Vec<&'a ObservedRecord>),
}

/// Decide the action for one desired record given what the provider returned
pub fn plan<'a>(
    observed: &'a [ObservedRecord],
    desired: &DesiredRecord,
    policy: MatchPolicy,
) -> Plan<'a> {
    match policy {
        MatchPolicy::First => match observed.first() {
            None => Plan::Create,
            Some(existing) if existing.matches(desired) => Plan::Unchanged,
            Some(existing) => Plan::Replace(vec![existing]),
        },
        MatchPolicy::TypeAware => plan_type_aware(observed, desired),
    }
}

fn plan_type_aware<'a>(observed: &'a [ObservedRecord], desired: &DesiredRecord) -> Plan<'a> {
    if observed.iter().any(|record| record.matches(desired)) {
        return Plan::Unchanged;
    }

    // A CNAME cannot share its name with any other record
    let conflicts: Vec<&ObservedRecord> = if desired.record_type == RecordType::Cname {
        observed.iter().collect()
    } else {
        observed
            .iter()
            .find(|record| record.has_type(desired.record_type))
            .or_else(|| observed.iter().find(|record| record.has_type(RecordType::Cname)))
            .into_iter()
            .collect()
    };

    if conflicts.is_empty() {
        Plan::Create
    } else {
        Plan::Replace(conflicts)
    }
}

/// Result of reconciling a whole desired-record list
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// One report per entry, in input order
    pub reports: Vec<RecordReport>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunSummary {
    fn count(&self, predicate: impl Fn(&ReconcileOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }

    /// Number of records that already matched
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Unchanged))
    }

    /// Number of records created
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Created))
    }

    /// Number of records replaced
    pub fn replaced(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Replaced))
    }

    /// Number of records that failed
    pub fn failed(&self) -> usize {
        self.count(ReconcileOutcome::is_failure)
    }

    /// Whether any record failed
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Core reconciliation engine
///
/// Holds the resolved zone and the shared provider client. Cloning is cheap;
/// clones share the client, the zone and the reporter.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::connect()`] (resolves the zone) or
///    [`Reconciler::new()`] (zone already known)
/// 2. Run with [`Reconciler::reconcile_all()`]
#[derive(Clone)]
pub struct Reconciler {
    /// Provider record store
    store: Arc<dyn RecordStore>,

    /// Zone resolved for this run
    zone: Arc<Zone>,

    /// Sink for per-record reports
    reporter: Arc<dyn Reporter>,

    /// Maximum records in flight
    concurrency: usize,

    /// Retry attempts for lookups and deletes
    max_retries: usize,

    /// Delay between retries
    retry_delay: Duration,

    /// Overall deadline for a run
    deadline: Option<Duration>,

    /// How the existing record is chosen from a name lookup
    match_policy: MatchPolicy,
}

impl Reconciler {
    /// Create a reconciler for an already resolved zone
    pub fn new(
        store: Arc<dyn RecordStore>,
        zone: Zone,
        settings: &ReconcileSettings,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            store,
            zone: Arc::new(zone),
            reporter,
            concurrency: settings.concurrency,
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay(),
            deadline: settings.deadline(),
            match_policy: settings.match_policy,
        })
    }

    /// Resolve `zone_name` once and create a reconciler for it
    ///
    /// # Errors
    ///
    /// A zone that cannot be resolved is fatal: there is no meaningful partial
    /// reconciliation without it.
    pub async fn connect(
        resolver: &dyn ZoneResolver,
        store: Arc<dyn RecordStore>,
        zone_name: &str,
        settings: &ReconcileSettings,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self> {
        let zone = match resolver.resolve(zone_name).await {
            Ok(zone) => zone,
            Err(e) => {
                error!("Failed to resolve zone {}: {}", zone_name, e);
                return Err(e);
            }
        };
        info!("Resolved zone {} -> {}", zone.name, zone.id);

        Self::new(store, zone, settings, reporter)
    }

    /// Override the retry delay (sub-second delays are not expressible in settings)
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Override the overall deadline
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// The zone this reconciler works on
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Reconcile every entry and return the reports in input order
    ///
    /// Never fails as a whole: each entry ends up with its own outcome.
    /// Once the deadline passes no new record is started; records already in
    /// flight finish, and the rest are reported as failed.
    pub async fn reconcile_all(&self, entries: &[DesiredEntry]) -> RunSummary {
        let started = Instant::now();
        let deadline = self.deadline.map(|d| started + d);

        info!(
            "Reconciling {} record(s) in zone {} via {} (concurrency: {})",
            entries.len(),
            self.zone.name,
            self.store.provider_name(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut slots: Vec<Option<RecordReport>> = vec![None; entries.len()];
        let mut tasks = JoinSet::new();
        let mut expired = false;

        for (position, entry) in entries.iter().enumerate() {
            // Taking a permit even for invalid entries keeps sequential runs
            // reporting in input order.
            let permit = if expired {
                None
            } else {
                semaphore.clone().acquire_owned().await.ok()
            };

            if !expired && deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    "Deadline exceeded, not starting the remaining {} record(s)",
                    entries.len() - position
                );
                expired = true;
            }

            let record = match entry {
                DesiredEntry::Valid(record) => record,
                DesiredEntry::Invalid(invalid) => {
                    let name = invalid
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("<entry #{}>", position));
                    slots[position] = Some(self.emit(RecordReport::new(
                        position,
                        name,
                        None,
                        ReconcileOutcome::failed(&invalid.reason),
                    )));
                    continue;
                }
            };

            match permit {
                Some(permit) if !expired => {
                    let this = self.clone();
                    let record = record.clone();
                    tasks.spawn(async move {
                        let report = this.reconcile_entry(position, &record).await;
                        drop(permit);
                        report
                    });
                }
                _ => {
                    let fqdn = qualify_name(&record.name, &self.zone.name);
                    slots[position] = Some(self.emit(RecordReport::new(
                        position,
                        fqdn,
                        Some(record.record_type),
                        ReconcileOutcome::failed(DEADLINE_EXCEEDED_REASON),
                    )));
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    let position = report.position;
                    slots[position] = Some(report);
                }
                Err(e) => error!("Reconciliation task aborted: {}", e),
            }
        }

        let reports: Vec<RecordReport> = slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                slot.unwrap_or_else(|| {
                    let (name, record_type) = match &entries[position] {
                        DesiredEntry::Valid(record) => (
                            qualify_name(&record.name, &self.zone.name),
                            Some(record.record_type),
                        ),
                        DesiredEntry::Invalid(invalid) => {
                            (invalid.name.clone().unwrap_or_default(), None)
                        }
                    };
                    self.emit(RecordReport::new(
                        position,
                        name,
                        record_type,
                        ReconcileOutcome::failed("reconciliation task aborted"),
                    ))
                })
            })
            .collect();

        let summary = RunSummary {
            reports,
            elapsed: started.elapsed(),
        };

        info!(
            "Reconciliation finished in {:?}: {} unchanged, {} created, {} replaced, {} failed",
            summary.elapsed,
            summary.unchanged(),
            summary.created(),
            summary.replaced(),
            summary.failed()
        );

        summary
    }

    /// Reconcile one record and turn any error into a `Failed` outcome
    ///
    /// This is the failure-isolation boundary: it never returns an error.
    pub async fn reconcile_record(&self, record: &DesiredRecord) -> ReconcileOutcome {
        let fqdn = qualify_name(&record.name, &self.zone.name);

        match self.converge(record, &fqdn).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error syncing {} ({}): {}", fqdn, record.record_type, e);
                ReconcileOutcome::failed(e)
            }
        }
    }

    async fn reconcile_entry(&self, position: usize, record: &DesiredRecord) -> RecordReport {
        let outcome = self.reconcile_record(record).await;
        self.emit(RecordReport::new(
            position,
            qualify_name(&record.name, &self.zone.name),
            Some(record.record_type),
            outcome,
        ))
    }

    async fn converge(&self, record: &DesiredRecord, fqdn: &str) -> Result<ReconcileOutcome> {
        let zone_id = &self.zone.id;

        let observed = self
            .with_retry("Lookup", fqdn, || self.store.list_by_name(zone_id, fqdn))
            .await?;

        match plan(&observed, record, self.match_policy) {
            Plan::Unchanged => {
                debug!(
                    "{} record for {} already exists and is correct",
                    record.record_type, fqdn
                );
                Ok(ReconcileOutcome::Unchanged)
            }
            Plan::Create => {
                self.create(record, fqdn).await?;
                Ok(ReconcileOutcome::Created)
            }
            Plan::Replace(conflicts) => {
                for existing in conflicts {
                    warn!(
                        "Conflicting record found for {} ({} -> {}). Deleting.",
                        fqdn, existing.record_type, existing.content
                    );
                    self.delete(existing).await?;
                }
                self.create(record, fqdn).await?;
                Ok(ReconcileOutcome::Replaced)
            }
        }
    }

    /// Delete an existing record; a record that is already gone counts as deleted
    async fn delete(&self, existing: &ObservedRecord) -> Result<()> {
        let zone_id = &self.zone.id;
        let result = self
            .with_retry("Delete", &existing.name, || {
                self.store.delete_by_id(zone_id, &existing.id)
            })
            .await;

        match result {
            Ok(()) => {
                info!("Deleted record ID: {}", existing.id);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Record {} was already deleted", existing.id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Create the desired record; never retried, a repeat could duplicate it
    async fn create(&self, record: &DesiredRecord, fqdn: &str) -> Result<()> {
        let payload = NewRecord::from_desired(record, fqdn);
        if record.proxied && payload.proxied.is_none() {
            debug!(
                "Ignoring proxied flag for {} record {}",
                record.record_type, fqdn
            );
        }

        let created = self.store.create_record(&self.zone.id, &payload).await?;
        info!(
            "Created {} record for {} -> {} (id: {})",
            record.record_type, fqdn, record.content, created.id
        );
        Ok(())
    }

    /// Run an idempotent provider call, retrying retryable errors
    async fn with_retry<T, F, Fut>(&self, operation: &str, name: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "{} attempt {} failed for {}: {}. Retrying in {:?}",
                        operation, attempt, name, e, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn emit(&self, report: RecordReport) -> RecordReport {
        self.reporter.report(&report);
        report
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.store.provider_name())
            .field("zone", &self.zone)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("deadline", &self.deadline)
            .field("match_policy", &self.match_policy)
            .finish()
    }
}
