// # dnsyncd - DNS zone reconciler
//
// This binary is a THIN integration layer:
// - Reading configuration from environment variables
// - Initializing logging and the runtime
// - Wiring the Cloudflare provider into the reconciler
// - Mapping the run summary to an exit code
//
// All reconciliation logic lives in dnsync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Cloudflare
// - `CF_API_TOKEN`: API token (required)
// - `CF_ZONE_NAME`: Zone to reconcile, e.g. `example.com` (required)
// - `CF_ZONE_ID`: Zone ID (optional, skips the zone lookup)
//
// ### Files
// - `CONFIG_PATH`: Desired records JSON (default `config.json`)
// - `LOG_PATH`: Log file, in addition to stdout (default `logs/dns_manager.log`,
//   empty disables file logging)
//
// ### Reconciler
// - `DNSYNC_MODE`: `live` or `dry-run`
// - `DNSYNC_CONCURRENCY`: Records reconciled in parallel (default 1)
// - `DNSYNC_MAX_RETRIES`: Retry attempts for lookups and deletes (default 2)
// - `DNSYNC_RETRY_DELAY_SECS`: Delay between retries (default 1)
// - `DNSYNC_DEADLINE_SECS`: Overall deadline for the run (optional)
// - `DNSYNC_MATCH_POLICY`: `type-aware` (default) or legacy `first`
// - `DNSYNC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export CF_API_TOKEN=your_token
// export CF_ZONE_NAME=example.com
// export CONFIG_PATH=/etc/dnsync/records.json
//
// dnsyncd
// ```

use anyhow::{Context, Result};
use dnsync_core::{
    DesiredEntry, MatchPolicy, ProviderConfig, ReconcileSettings, Reconciler, RecordStore,
    RunSummary, TracingReporter, load_desired_records,
};
use dnsync_provider_cloudflare::CloudflareProvider;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_LOG_PATH: &str = "logs/dns_manager.log";

/// Exit codes for different termination scenarios
///
/// - 0: Every record converged
/// - 1: Configuration or startup error
/// - 2: Zone resolution or runtime error
/// - 3: One or more records failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsyncExitCode {
    /// All records unchanged, created or replaced
    Converged = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Zone could not be resolved, or an unexpected runtime failure
    RuntimeError = 2,
    /// At least one record ended in `Failed`
    RecordFailures = 3,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DnsyncExitCode {
    fn from_summary(summary: &RunSummary) -> Self {
        if summary.has_failures() {
            Self::RecordFailures
        } else {
            Self::Converged
        }
    }
}

/// Application configuration
struct DaemonConfig {
    api_token: String,
    zone_name: String,
    zone_id: Option<String>,
    config_path: PathBuf,
    log_path: Option<PathBuf>,
    dry_run: bool,
    concurrency: Option<usize>,
    max_retries: Option<usize>,
    retry_delay_secs: Option<u64>,
    deadline_secs: Option<u64>,
    match_policy: MatchPolicy,
    log_level: String,
}

/// Read an optional numeric variable; a value that does not parse is an error
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} is not a valid number: '{}'", name, value)),
        _ => Ok(None),
    }
}

impl DaemonConfig {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mode = env::var("DNSYNC_MODE").unwrap_or_else(|_| "live".to_string());
        let dry_run = match mode.to_lowercase().as_str() {
            "live" => false,
            "dry-run" | "dry_run" | "dryrun" => true,
            other => anyhow::bail!(
                "DNSYNC_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let match_policy = match env::var("DNSYNC_MATCH_POLICY") {
            Ok(value) if !value.trim().is_empty() => MatchPolicy::from_str(value.trim())?,
            _ => MatchPolicy::default(),
        };

        // LOG_PATH set to an empty string disables the file sink
        let log_path = match env::var("LOG_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(PathBuf::from(DEFAULT_LOG_PATH)),
        };

        Ok(Self {
            api_token: env::var("CF_API_TOKEN").context("CF_API_TOKEN is required")?,
            zone_name: env::var("CF_ZONE_NAME").context("CF_ZONE_NAME is required")?,
            zone_id: env::var("CF_ZONE_ID").ok().filter(|id| !id.trim().is_empty()),
            config_path: env::var("CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_path,
            dry_run,
            concurrency: parse_var("DNSYNC_CONCURRENCY")?,
            max_retries: parse_var("DNSYNC_MAX_RETRIES")?,
            retry_delay_secs: parse_var("DNSYNC_RETRY_DELAY_SECS")?,
            deadline_secs: parse_var("DNSYNC_DEADLINE_SECS")?,
            match_policy,
            log_level: env::var("DNSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs validation including:
    /// - Required field presence
    /// - Placeholder token detection
    /// - Zone name format
    /// - Numeric range validation
    fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            anyhow::bail!(
                "CF_API_TOKEN is required. \
                Set it via: export CF_API_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "CF_API_TOKEN appears to be a placeholder. \
                Use an actual API token from the Cloudflare dashboard."
            );
        }

        validate_domain_name(&self.zone_name).context("CF_ZONE_NAME is invalid")?;

        if let Some(concurrency) = self.concurrency
            && !(1..=64).contains(&concurrency)
        {
            anyhow::bail!(
                "DNSYNC_CONCURRENCY must be between 1 and 64. Got: {}",
                concurrency
            );
        }

        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            anyhow::bail!(
                "DNSYNC_MAX_RETRIES must be between 0 and 10. Got: {}",
                max_retries
            );
        }

        if let Some(retry_delay) = self.retry_delay_secs
            && retry_delay > 300
        {
            anyhow::bail!(
                "DNSYNC_RETRY_DELAY_SECS must be between 0 and 300 seconds. Got: {}",
                retry_delay
            );
        }

        if self.deadline_secs == Some(0) {
            anyhow::bail!("DNSYNC_DEADLINE_SECS must be at least 1 second");
        }

        parse_level(&self.log_level)?;

        Ok(())
    }

    fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: self.api_token.clone(),
            zone_name: self.zone_name.clone(),
            zone_id: self.zone_id.clone(),
        }
    }

    fn settings(&self) -> ReconcileSettings {
        let defaults = ReconcileSettings::default();
        ReconcileSettings {
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_secs: self.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
            deadline_secs: self.deadline_secs,
            match_policy: self.match_policy,
        }
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; catches common errors, not every invalid name.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.trim_end_matches('.');
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DNSYNC_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Open the log file in append mode, creating its directory if needed
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Install the global subscriber: stdout, plus the log file when configured
fn init_tracing(config: &DaemonConfig) -> Result<()> {
    let level = parse_level(&config.log_level)?;

    let builder = FmtSubscriber::builder().with_max_level(level);
    let subscriber = match &config.log_path {
        Some(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file))))
                .finish()
        }
        None => builder.with_writer(BoxMakeWriter::new(std::io::stdout)).finish(),
    };

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnsyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("{:#}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    info!("Starting dnsyncd for zone {}", config.zone_name);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

/// Run one reconciliation pass
async fn run(config: DaemonConfig) -> DnsyncExitCode {
    let entries: Vec<DesiredEntry> = match load_desired_records(&config.config_path) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to load desired records: {}", e);
            return DnsyncExitCode::ConfigError;
        }
    };
    info!(
        "Loaded {} record(s) from {}",
        entries.len(),
        config.config_path.display()
    );

    let provider_config = config.provider_config();
    info!(
        "Provider: {} (zone {})",
        provider_config.type_name(),
        provider_config.zone_name()
    );

    let provider = match CloudflareProvider::from_config(&provider_config, config.dry_run) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("Failed to create Cloudflare provider: {}", e);
            return DnsyncExitCode::ConfigError;
        }
    };

    let store: Arc<dyn RecordStore> = provider.clone();
    let reconciler = match Reconciler::connect(
        provider.as_ref(),
        store,
        provider_config.zone_name(),
        &config.settings(),
        Arc::new(TracingReporter::new()),
    )
    .await
    {
        Ok(reconciler) => reconciler,
        Err(e) => {
            error!("Cannot reconcile zone {}: {}", provider_config.zone_name(), e);
            return DnsyncExitCode::RuntimeError;
        }
    };
    debug!(
        "Zone {} has ID {}",
        reconciler.zone().name,
        reconciler.zone().id
    );

    let summary = reconciler.reconcile_all(&entries).await;

    info!(
        "Run finished in {:?}: {} unchanged, {} created, {} replaced, {} failed",
        summary.elapsed,
        summary.unchanged(),
        summary.created(),
        summary.replaced(),
        summary.failed()
    );
    if summary.has_failures() {
        warn!("{} record(s) did not converge", summary.failed());
    }

    DnsyncExitCode::from_summary(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DaemonConfig {
        DaemonConfig {
            api_token: "0123456789abcdef0123456789abcdef01234567".to_string(),
            zone_name: "example.com".to_string(),
            zone_id: None,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            log_path: None,
            dry_run: false,
            concurrency: None,
            max_retries: None,
            retry_delay_secs: None,
            deadline_secs: None,
            match_policy: MatchPolicy::TypeAware,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let mut cfg = config();
        cfg.api_token = "your_token".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_zone_name_rejected() {
        let mut cfg = config();
        cfg.zone_name = "exa mple.com".to_string();
        assert!(cfg.validate().is_err());

        cfg.zone_name = "-example.com".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_numeric_ranges() {
        let mut cfg = config();
        cfg.concurrency = Some(0);
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.max_retries = Some(11);
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.deadline_secs = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut cfg = config();
        cfg.log_level = "verbose".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_settings_fall_back_to_defaults() {
        let mut cfg = config();
        cfg.concurrency = Some(4);
        let settings = cfg.settings();

        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.max_retries, ReconcileSettings::default().max_retries);
        assert_eq!(settings.deadline_secs, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_log_file_directory_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("dns_manager.log");

        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
