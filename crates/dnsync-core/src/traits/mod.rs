//! Core traits for the dnsync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`ZoneResolver`]: Map a zone name to the provider's zone identifier
//! - [`RecordStore`]: Read, create and delete records within a zone
//! - [`Reporter`]: Receive per-record reconciliation reports

pub mod zone_resolver;
pub mod record_store;
pub mod reporter;

pub use zone_resolver::{Zone, ZoneId, ZoneResolver};
pub use record_store::{NewRecord, ObservedRecord, RecordStore};
pub use reporter::{ReconcileOutcome, RecordReport, Reporter};
