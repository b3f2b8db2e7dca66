//! CLI command implementations
//!
//! Every command loads the configuration once, builds the store, policy
//! registry and auditor from it, and passes them down explicitly.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::archive::PackingStrategy;
use crate::coordinates::parse_page_ids;
use crate::http_server::{
    AccessSettings, AccessState, AdmissionMode, ArchiveRequest, HttpServer, HttpServerConfig,
};
use crate::observability::{FileAuditor, Logger};
use crate::policy::{PolicyLimits, PolicyRegistry};
use crate::retrieval::StreamingQuota;
use crate::store::{DirectoryStore, RetryPolicy, RetryingStore, StoreRetryConfig};
use crate::validation::{Granularity, RequestValidator};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

const DEFAULT_AUDIT_LOG: &str = "audit.log";

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the volume directory tree (required)
    pub data_dir: String,

    /// Audit log path (optional, default `<data_dir>/audit.log`)
    #[serde(default)]
    pub audit_log: Option<String>,

    #[serde(default)]
    pub http: HttpServerConfig,

    /// Quota limits; 0 disables a rule
    #[serde(default)]
    pub policy: PolicyLimits,

    #[serde(default)]
    pub store_retry: StoreRetryConfig,

    /// "streaming" (default) or "upfront"
    #[serde(default)]
    pub admission: AdmissionMode,

    /// "off", "isolate" (default) or "halt"
    #[serde(default)]
    pub streaming_quota: StreamingQuota,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.store_retry.max_attempts == 0 {
            return Err(CliError::config_error("store_retry.max_attempts must be > 0"));
        }

        if self.store_retry.initial_delay_ms > self.store_retry.max_delay_ms {
            return Err(CliError::config_error(format!(
                "store_retry.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.store_retry.initial_delay_ms, self.store_retry.max_delay_ms
            )));
        }

        if self.http.host.trim().is_empty() {
            return Err(CliError::config_error("http.host must not be empty"));
        }

        if self.http.stream_chunk_size == 0 {
            return Err(CliError::config_error("http.stream_chunk_size must be > 0"));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Audit log location
    pub fn audit_path(&self) -> PathBuf {
        match &self.audit_log {
            Some(path) => PathBuf::from(path),
            None => self.data_path().join(DEFAULT_AUDIT_LOG),
        }
    }

    pub fn access_settings(&self) -> AccessSettings {
        AccessSettings {
            admission: self.admission,
            streaming_quota: self.streaming_quota,
            stream_chunk_size: self.http.stream_chunk_size,
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::Validate {
            config,
            page_ids,
            whole_volumes,
        } => validate(&config, &page_ids, whole_volumes),
        Command::Export {
            config,
            page_ids,
            output,
            concat,
            whole_volumes,
        } => export(&config, &page_ids, &output, concat, whole_volumes),
    }
}

/// Start the HTTP server and serve until it stops
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    if !config.data_path().is_dir() {
        return Err(CliError::boot_failed(format!(
            "data_dir {} is not a directory",
            config.data_dir
        )));
    }

    let state = build_state(&config)?;
    let server = HttpServer::with_state(config.http.clone(), Arc::new(state));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

/// Validate a request against the configured quotas and report the volumes.
///
/// Prints an error object and fails on the first rejected id.
pub fn validate(config_path: &Path, page_ids: &str, whole_volumes: bool) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let coordinates = parse_page_ids(page_ids)?;
    let state = build_state(&config)?;

    let mut validator =
        RequestValidator::new(state.store.clone(), &state.registry, granularity(whole_volumes));

    match validator.validate(&coordinates) {
        Ok(volumes) => {
            let validation = validator.state();
            let mut infos: Vec<_> = volumes.into_values().collect();
            infos.sort_by(|a, b| a.volume_id.cmp(&b.volume_id));
            write_response(json!({
                "volumes": infos,
                "volume_count": validation.volume_count,
                "total_page_count": validation.total_page_count,
            }))
        }
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e.into())
        }
    }
}

/// Write the requested content to a zip file
pub fn export(
    config_path: &Path,
    page_ids: &str,
    output: &Path,
    concat: bool,
    whole_volumes: bool,
) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let coordinates = parse_page_ids(page_ids)?;
    let state = build_state(&config)?;

    let request = ArchiveRequest {
        coordinates,
        granularity: granularity(whole_volumes),
        strategy: PackingStrategy::from_concat(concat),
    };
    state.admit(&request)?;

    let file = File::create(output).map_err(|e| {
        CliError::io_error(format!("Failed to create {}: {}", output.display(), e))
    })?;
    let report = state.export(request, BufWriter::new(file))?;

    let failures: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
    write_response(json!({
        "output": output.display().to_string(),
        "volumes": report.volumes_written,
        "entries": report.entries_written,
        "bytes": report.bytes_written,
        "failures": failures,
    }))
}

fn granularity(whole_volumes: bool) -> Granularity {
    if whole_volumes {
        Granularity::WholeVolume
    } else {
        Granularity::PartialPage
    }
}

/// Construct the store, registry and auditor described by `config`
fn build_state(config: &Config) -> CliResult<AccessState> {
    let store = RetryingStore::new(
        DirectoryStore::new(config.data_path()),
        RetryPolicy::from(config.store_retry),
    );
    let registry = PolicyRegistry::from_limits(&config.policy);

    let audit_path = config.audit_path();
    let auditor = FileAuditor::open(&audit_path).map_err(|e| {
        CliError::boot_failed(format!(
            "Failed to open audit log {}: {}",
            audit_path.display(),
            e
        ))
    })?;

    let limits = format!(
        "{}/{}/{}",
        config.policy.max_volumes_allowed,
        config.policy.max_total_pages_allowed,
        config.policy.max_pages_per_volume_allowed
    );
    Logger::trace(
        "SERVICE_CONFIGURED",
        &[
            ("data_dir", config.data_dir.as_str()),
            ("limits", limits.as_str()),
        ],
    );

    Ok(AccessState::new(
        Arc::new(store),
        Arc::new(registry),
        Arc::new(auditor),
        config.access_settings(),
    ))
}
