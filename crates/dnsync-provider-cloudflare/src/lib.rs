// # Cloudflare Record Store
//
// This crate provides the Cloudflare implementation of the dnsync
// `ZoneResolver` and `RecordStore` traits.
//
// ## Behaviour
//
// - One HTTP request per trait call
// - Full error propagation to the reconciler (it owns retries)
// - HTTP timeout configured (30 seconds)
// - Specific error mapping for HTTP status codes (401/403, 404, 429, other 4xx, 5xx)
// - `success: false` envelopes are errors even on a 2xx status
// - Dry-run mode for safe testing
// - Zone auto-discovery or explicit zone ID
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

pub mod types;

use async_trait::async_trait;
use dnsync_core::traits::{NewRecord, ObservedRecord, RecordStore, ZoneId, ZoneResolver};
use dnsync_core::{Error, ProviderConfig, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::types::{
    CloudflareDnsRecord, CloudflareErrorEnvelope, CloudflareResponse, CloudflareZone,
    DeletedRecord, summarize_errors,
};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for record lookups; a single name never comes close
const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare zone resolver and record store
///
/// Stateless apart from the shared HTTP connection pool; safe to share
/// between concurrent reconciliation tasks behind an `Arc`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST/DELETE
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, skips the zone lookup when set)
    zone_id: Option<String>,

    /// API base URL
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up by name when absent)
    /// - `dry_run`: If true, perform GET requests but skip writes
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a new Cloudflare provider (production/live mode)
    pub fn new_live(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        Self::new(api_token, zone_id, false)
    }

    /// Create a new Cloudflare provider (dry-run mode)
    ///
    /// Lookups hit the API; creates and deletes are only logged.
    pub fn new_dry_run(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        Self::new(api_token, zone_id, true)
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig, dry_run: bool) -> Result<Self> {
        config.validate()?;
        match config {
            ProviderConfig::Cloudflare {
                api_token, zone_id, ..
            } => {
                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }
                Self::new(api_token.clone(), zone_id.clone(), dry_run)
            }
        }
    }

    /// Point the provider at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: HTTP request failed: {}", context, e)))?;

        let status = response.status();
        tracing::debug!("{} -> {}", context, status);

        let body = response.text().await.map_err(|e| {
            Error::transport(format!("{}: failed to read response: {}", context, e))
        })?;

        decode_response(status, &body, context)
    }
}

/// Turn a Cloudflare HTTP response into a result
///
/// Non-2xx statuses are mapped to specific errors; other 4xx responses are
/// `InvalidInput` and never retried. A 2xx with `success: false` or without
/// `result` is a transport error.
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    context: &str,
) -> Result<T> {
    if !status.is_success() {
        let detail = serde_json::from_str::<CloudflareErrorEnvelope>(body)
            .ok()
            .map(|envelope| summarize_errors(&envelope.errors))
            .filter(|summary| !summary.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        return Err(status_error(status, context, &detail));
    }

    let envelope: CloudflareResponse<T> = serde_json::from_str(body).map_err(|e| {
        Error::transport(format!("{}: failed to parse response: {}", context, e))
    })?;

    if !envelope.success {
        return Err(Error::transport(format!(
            "{}: Cloudflare reported failure: {}",
            context,
            envelope.error_summary()
        )));
    }

    envelope.result.ok_or_else(|| {
        Error::transport(format!("{}: invalid response format: missing result", context))
    })
}

/// Map a non-2xx HTTP status to an error
fn status_error(status: StatusCode, context: &str, detail: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: Invalid API token or insufficient permissions. Status: {} - {}",
            context, status, detail
        )),
        404 => Error::not_found(format!("{}: {} - {}", context, status, detail)),
        429 => Error::rate_limited(format!(
            "{}: Rate limit exceeded. Please retry later. Status: {}",
            context, status
        )),
        500..=599 => Error::transport(format!(
            "{}: Cloudflare server error (transient): {} - {}",
            context, status, detail
        )),
        400..=499 => Error::invalid_input(format!(
            "{}: Request rejected: {} - {}",
            context, status, detail
        )),
        _ => Error::transport(format!("{}: {} - {}", context, status, detail)),
    }
}

#[async_trait]
impl ZoneResolver for CloudflareProvider {
    /// Resolve the zone ID for a zone name
    ///
    /// If a zone ID was configured, returns it without calling the API.
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_zone(&self, zone_name: &str) -> Result<ZoneId> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(ZoneId::new(zone_id.clone()));
        }

        tracing::debug!("Looking up zone ID for zone: {}", zone_name);

        let request = self
            .client
            .get(self.url("/zones"))
            .query(&[("name", zone_name)]);
        let zones: Vec<CloudflareZone> = self.send(request, "Zone lookup").await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

        tracing::debug!("Found zone ID: {} ({})", zone.id, zone.name);
        Ok(ZoneId::new(zone.id))
    }
}

#[async_trait]
impl RecordStore for CloudflareProvider {
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=www.example.com
    /// ```
    async fn list_by_name(&self, zone: &ZoneId, name: &str) -> Result<Vec<ObservedRecord>> {
        tracing::debug!("Looking up records: {}", name);

        let per_page = RECORDS_PER_PAGE.to_string();
        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone)))
            .query(&[("name", name), ("per_page", per_page.as_str())]);
        let records: Vec<CloudflareDnsRecord> = self.send(request, "Record lookup").await?;

        tracing::debug!("Found {} record(s) named {}", records.len(), name);
        Ok(records.into_iter().map(ObservedRecord::from).collect())
    }

    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_by_id(&self, zone: &ZoneId, record_id: &str) -> Result<()> {
        let url = self.url(&format!("/zones/{}/dns_records/{}", zone, record_id));

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        let deleted: DeletedRecord = self
            .send(self.client.delete(&url), "Record delete")
            .await?;
        tracing::debug!("Deleted record ID: {}", deleted.id);
        Ok(())
    }

    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "app.example.com", "content": "1.2.3.4", "ttl": 300, "proxied": false}
    /// ```
    async fn create_record(&self, zone: &ZoneId, record: &NewRecord) -> Result<ObservedRecord> {
        let url = self.url(&format!("/zones/{}/dns_records", zone));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(record)?
            );
            return Ok(ObservedRecord {
                id: "dry-run".to_string(),
                name: record.name.clone(),
                record_type: record.record_type.as_str().to_string(),
                content: record.content.clone(),
                ttl: Some(record.ttl),
                proxied: record.proxied,
            });
        }

        let created: CloudflareDnsRecord = self
            .send(self.client.post(&url).json(record), "Record create")
            .await?;
        Ok(created.into())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
