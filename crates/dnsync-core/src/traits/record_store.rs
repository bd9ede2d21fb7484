// # Record Store Trait
//
// Defines the read/create/delete interface against a provider's record store.
//
// ## Implementations
//
// - Cloudflare: `dnsync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::RecordStore;
//
// let existing = store.lookup_by_name(&zone.id, "www.example.com").await?;
// if let Some(record) = existing {
//     store.delete_by_id(&zone.id, &record.id).await?;
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{DesiredRecord, RecordType};
use crate::traits::zone_resolver::ZoneId;

/// A record as it currently exists at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRecord {
    /// Provider record identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record type as reported by the provider
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record content
    pub content: String,
    /// Time-to-live, if reported
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Proxy flag, if reported
    #[serde(default)]
    pub proxied: Option<bool>,
}

impl ObservedRecord {
    /// Whether this record has the given type
    pub fn has_type(&self, record_type: RecordType) -> bool {
        self.record_type == record_type.as_str()
    }

    /// Whether type and content both equal the desired record's
    pub fn matches(&self, desired: &DesiredRecord) -> bool {
        self.has_type(desired.record_type) && self.content == desired.content
    }
}

/// Payload for creating a record
///
/// `proxied` is only present for proxiable types (A, AAAA, CNAME) and
/// `priority` only for MX; both are omitted from the JSON otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Proxy flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// MX priority
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl NewRecord {
    /// Build the create payload for a desired record at its fully-qualified name
    pub fn from_desired(desired: &DesiredRecord, fqdn: impl Into<String>) -> Self {
        let record_type = desired.record_type;
        Self {
            record_type,
            name: fqdn.into(),
            content: desired.content.clone(),
            ttl: desired.ttl,
            proxied: record_type.is_proxiable().then_some(desired.proxied),
            priority: match record_type {
                RecordType::Mx => desired.priority,
                _ => None,
            },
        }
    }
}

/// Trait for record store implementations
///
/// Every operation is scoped to a resolved [`ZoneId`].
///
/// # Retries
///
/// Implementations must not retry. Retry policy is owned by the
/// [`Reconciler`](crate::Reconciler), which only retries idempotent calls.
///
/// # Errors
///
/// Non-2xx responses and `success: false` envelopes are transport-class
/// errors carrying the provider's messages. A delete of a record that no
/// longer exists fails with [`Error::NotFound`](crate::Error::NotFound).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records with exactly this fully-qualified name, in provider order
    async fn list_by_name(
        &self,
        zone: &ZoneId,
        name: &str,
    ) -> Result<Vec<ObservedRecord>, crate::Error>;

    /// The first record the provider returns for this name, if any
    ///
    /// Provider ordering carries no meaning; when a name hosts several types
    /// this returns whichever the provider lists first.
    async fn lookup_by_name(
        &self,
        zone: &ZoneId,
        name: &str,
    ) -> Result<Option<ObservedRecord>, crate::Error> {
        Ok(self.list_by_name(zone, name).await?.into_iter().next())
    }

    /// Delete a record by its provider identifier
    async fn delete_by_id(&self, zone: &ZoneId, record_id: &str) -> Result<(), crate::Error>;

    /// Create a record
    async fn create_record(
        &self,
        zone: &ZoneId,
        record: &NewRecord,
    ) -> Result<ObservedRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
