//! Configuration types for the dnsync system
//!
//! This module defines the provider configuration, the reconciliation
//! settings, and the desired-record model loaded from the JSON record file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone name (e.g., "example.com")
        zone_name: String,
        /// Zone ID (optional, skips the zone lookup when set)
        #[serde(default)]
        zone_id: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                zone_name,
                zone_id,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token cannot be empty"));
                }
                if zone_name.is_empty() {
                    return Err(Error::config("Zone name cannot be empty"));
                }
                if zone_id.as_ref().is_some_and(|id| id.is_empty()) {
                    return Err(Error::config("Zone ID cannot be empty when set"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }

    /// The zone this configuration manages
    pub fn zone_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { zone_name, .. } => zone_name,
        }
    }
}

// The token must never show up in logs, so Debug is written by hand.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_name, zone_id, ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_name", zone_name)
                .field("zone_id", zone_id)
                .finish(),
        }
    }
}

/// How an existing record is picked out of a name lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Compare against the record of the desired type; records that cannot
    /// coexist with it (CNAME on either side) are replaced, unrelated types
    /// are left alone
    #[default]
    TypeAware,
    /// Legacy mode: compare against whatever record the provider returns
    /// first for the name, regardless of its type
    First,
}

impl std::str::FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "type-aware" | "type_aware" => Ok(Self::TypeAware),
            other => Err(Error::config(format!(
                "Unknown match policy '{}'. Valid: first, type-aware",
                other
            ))),
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// Maximum number of records reconciled at the same time
    ///
    /// 1 means strictly sequential processing in input order.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retry attempts for lookups and deletes that fail with a retryable error
    ///
    /// Creates are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Delay between retry attempts (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Overall deadline for the run (in seconds)
    ///
    /// Once exceeded no further record is started; in-flight records finish.
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// Policy for choosing the existing record among name lookup results
    #[serde(default)]
    pub match_policy: MatchPolicy,
}

impl ReconcileSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::config("Concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Delay between retry attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Overall deadline, if any
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            deadline_secs: None,
            match_policy: MatchPolicy::default(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_max_retries() -> usize {
    2
}

fn default_retry_delay_secs() -> u64 {
    1
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Canonical name
    Cname,
    /// Text
    Txt,
    /// Mail exchanger
    Mx,
    /// Name server
    Ns,
    /// Service locator
    Srv,
    /// Certification authority authorization
    Caa,
}

impl RecordType {
    /// The DNS mnemonic used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
        }
    }

    /// Whether the provider accepts the `proxied` attribute for this type
    pub fn is_proxiable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS record as it should exist at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Record name, relative to the zone or fully qualified ("@" for the apex)
    pub name: String,

    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Record content (address, target, text, ...)
    pub content: String,

    /// Route traffic through the provider's proxy (A/AAAA/CNAME only)
    #[serde(default)]
    pub proxied: bool,

    /// Time-to-live in seconds (1 means "automatic" at Cloudflare)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// MX preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl DesiredRecord {
    /// Create a desired record with default TTL and proxy settings
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            content: content.into(),
            proxied: false,
            ttl: default_ttl(),
            priority: None,
        }
    }

    /// Set the proxied flag
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the MX priority
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Validate a single desired record
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("Record name cannot be empty"));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(Error::config(format!(
                "Record name contains whitespace: '{}'",
                self.name
            )));
        }
        if self.content.is_empty() {
            return Err(Error::config(format!(
                "Record content cannot be empty for {}",
                self.name
            )));
        }
        if self.ttl == 0 {
            return Err(Error::config(format!(
                "TTL must be greater than 0 for {}",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_ttl() -> u32 {
    300
}

/// An entry of the desired-record file that could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord {
    /// Zero-based position in the file
    pub position: usize,
    /// The entry's name, if it had a readable one
    pub name: Option<String>,
    /// Why the entry was rejected
    pub reason: String,
}

/// One entry of the desired-record list, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredEntry {
    /// Parsed and validated record
    Valid(DesiredRecord),
    /// Malformed entry, reported as failed without touching the provider
    Invalid(InvalidRecord),
}

/// Parse the desired-record list from a JSON document
///
/// The document itself must be an array; anything else is a configuration
/// error for the whole run. Individual entries that are malformed become
/// [`DesiredEntry::Invalid`] so the remaining entries can still be reconciled.
pub fn parse_desired_records(json: &str) -> Result<Vec<DesiredEntry>> {
    let document: Value = serde_json::from_str(json)
        .map_err(|e| Error::config(format!("Desired records are not valid JSON: {}", e)))?;

    let Value::Array(items) = document else {
        return Err(Error::config("Desired records must be a JSON array"));
    };

    let entries = items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string);

            let parsed = serde_json::from_value::<DesiredRecord>(item)
                .map_err(|e| Error::config(e.to_string()))
                .and_then(|record| record.validate().map(|()| record));

            match parsed {
                Ok(record) => DesiredEntry::Valid(record),
                Err(e) => DesiredEntry::Invalid(InvalidRecord {
                    position,
                    name,
                    reason: e.to_string(),
                }),
            }
        })
        .collect();

    Ok(entries)
}

/// Load the desired-record list from a JSON file
pub fn load_desired_records(path: impl AsRef<Path>) -> Result<Vec<DesiredEntry>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read desired records from {}: {}",
            path.display(),
            e
        ))
    })?;

    let entries = parse_desired_records(&json)?;
    tracing::debug!(
        "Loaded {} desired record entries from {}",
        entries.len(),
        path.display()
    );
    Ok(entries)
}
