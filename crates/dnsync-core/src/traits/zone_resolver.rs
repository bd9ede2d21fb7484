// # Zone Resolver Trait
//
// Maps a zone name to the identifier the provider assigned to it.
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::ZoneResolver;
//
// let zone = resolver.resolve("example.com").await?;
// println!("{} -> {}", zone.name, zone.id);
// ```

use async_trait::async_trait;
use std::fmt;

/// Opaque provider-assigned zone identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Wrap a provider zone identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved zone: its name plus the provider's identifier for it
///
/// Resolved once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Provider identifier
    pub id: ZoneId,
    /// Zone name (e.g., "example.com")
    pub name: String,
}

/// Trait for zone lookup implementations
///
/// # Errors
///
/// - [`Error::NotFound`](crate::Error::NotFound) when no zone carries the name.
///   Callers treat this as fatal for the whole run.
/// - Transport-class errors on network, HTTP or authentication failure.
#[async_trait]
pub trait ZoneResolver: Send + Sync {
    /// Resolve a zone name to its identifier
    ///
    /// Must be free of side effects and idempotent.
    async fn resolve_zone(&self, zone_name: &str) -> Result<ZoneId, crate::Error>;

    /// Resolve a zone name into a [`Zone`] handle
    async fn resolve(&self, zone_name: &str) -> Result<Zone, crate::Error> {
        let id = self.resolve_zone(zone_name).await?;
        Ok(Zone {
            id,
            name: zone_name.to_string(),
        })
    }
}
