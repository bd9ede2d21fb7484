//! Cloudflare API v4 wire types

use dnsync_core::ObservedRecord;
use serde::Deserialize;

/// Common response envelope: `{result, success, errors}`
#[derive(Debug, Deserialize)]
pub struct CloudflareResponse<T> {
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
}

impl<T> CloudflareResponse<T> {
    /// All error messages joined for diagnostics
    pub fn error_summary(&self) -> String {
        summarize_errors(&self.errors)
    }
}

/// One entry of the envelope's `errors` array
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareError {
    #[serde(default)]
    pub code: i64,
    pub message: String,
}

/// Envelope used only to pull error details out of a failed response
#[derive(Debug, Deserialize)]
pub struct CloudflareErrorEnvelope {
    #[serde(default)]
    pub errors: Vec<CloudflareError>,
}

pub fn summarize_errors(errors: &[CloudflareError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Zone as returned by `GET /zones`
#[derive(Debug, Deserialize)]
pub struct CloudflareZone {
    pub id: String,
    pub name: String,
}

/// DNS record as returned by `GET`/`POST /zones/:zone_id/dns_records`
#[derive(Debug, Deserialize)]
pub struct CloudflareDnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub proxied: Option<bool>,
}

impl From<CloudflareDnsRecord> for ObservedRecord {
    fn from(record: CloudflareDnsRecord) -> Self {
        ObservedRecord {
            id: record.id,
            name: record.name,
            record_type: record.record_type,
            content: record.content,
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

/// Result of `DELETE /zones/:zone_id/dns_records/:id`
#[derive(Debug, Deserialize)]
pub struct DeletedRecord {
    pub id: String,
}
