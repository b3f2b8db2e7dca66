//! Access HTTP Routes
//!
//! Bulk page and volume downloads, streamed as zip archives.
//!
//! Once streaming has started the status is already `200`; volume failures
//! show up only in the archive's `ERROR.err` entry. With upfront admission
//! the whole request is validated first and failures map to status codes.

use std::io::Write;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::sink::{ChannelWriter, DEFAULT_CHUNK_SIZE};
use crate::archive::{ArchiveAssembler, ArchiveResult, AssemblyReport, PackingStrategy};
use crate::coordinates::{parse_page_ids, parse_volume_ids, ItemCoordinates};
use crate::errors::{AccessError, AccessResult};
use crate::observability::{Auditor, Logger};
use crate::policy::PolicyRegistry;
use crate::retrieval::{StoreVolumeRetriever, StreamingQuota};
use crate::store::VolumeStore;
use crate::validation::{Granularity, RequestValidator};

const XHTML_CONTENT_TYPE: &str = "application/xhtml+xml";
const ZIP_CONTENT_TYPE: &str = "application/zip";

// ==================
// Shared State
// ==================

/// When quotas are enforced for a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionMode {
    /// Quotas are applied while streaming, per `StreamingQuota`
    #[default]
    Streaming,
    /// The whole request is validated before any output
    Upfront,
}

/// Per-deployment access settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessSettings {
    pub admission: AdmissionMode,
    pub streaming_quota: StreamingQuota,
    /// Response chunk size for streamed archives
    pub stream_chunk_size: usize,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            admission: AdmissionMode::default(),
            streaming_quota: StreamingQuota::default(),
            stream_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Access state shared across handlers
pub struct AccessState {
    pub store: Arc<dyn VolumeStore>,
    pub registry: Arc<PolicyRegistry>,
    pub auditor: Arc<dyn Auditor>,
    pub settings: AccessSettings,
}

/// One parsed archive request
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub coordinates: Vec<ItemCoordinates>,
    pub granularity: Granularity,
    pub strategy: PackingStrategy,
}

impl AccessState {
    pub fn new(
        store: Arc<dyn VolumeStore>,
        registry: Arc<PolicyRegistry>,
        auditor: Arc<dyn Auditor>,
        settings: AccessSettings,
    ) -> Self {
        Self {
            store,
            registry,
            auditor,
            settings,
        }
    }

    /// Validate the whole request when admission is upfront; otherwise a no-op
    pub fn admit(&self, request: &ArchiveRequest) -> AccessResult<()> {
        if self.settings.admission != AdmissionMode::Upfront {
            return Ok(());
        }
        let mut validator =
            RequestValidator::new(self.store.clone(), &self.registry, request.granularity);
        validator.validate(&request.coordinates).map(|_| ())
    }

    /// Stream the requested volumes into `sink` as a zip archive
    pub fn export<W: Write>(&self, request: ArchiveRequest, sink: W) -> ArchiveResult<AssemblyReport> {
        // upfront admission has already applied the quotas
        let quota = match self.settings.admission {
            AdmissionMode::Upfront => StreamingQuota::Off,
            AdmissionMode::Streaming => self.settings.streaming_quota,
        };
        let mut retriever =
            StoreVolumeRetriever::new(self.store.clone(), request.coordinates, request.granularity)
                .with_quota(quota, &self.registry);
        ArchiveAssembler::new(request.strategy, self.auditor.clone()).assemble(sink, &mut retriever)
    }
}

// ==================
// Request Types
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct PagesQuery {
    #[serde(rename = "pageIDs")]
    pub page_ids: Option<String>,
    pub concat: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VolumesQuery {
    #[serde(rename = "volumeIDs")]
    pub volume_ids: Option<String>,
    pub concat: Option<String>,
    pub version: Option<String>,
}

/// `true`/`false` flag; anything other than `true` is false
fn flag_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

// ==================
// Routes
// ==================

/// Create access routes
pub fn access_routes(state: Arc<AccessState>) -> Router {
    Router::new()
        .route("/pages", get(pages_handler))
        .route("/volumes", get(volumes_handler))
        .with_state(state)
}

async fn pages_handler(
    State(state): State<Arc<AccessState>>,
    Query(query): Query<PagesQuery>,
) -> Response {
    let coordinates = match parse_page_ids(query.page_ids.as_deref().unwrap_or("")) {
        Ok(coordinates) => coordinates,
        Err(e) => return malformed("Page", &e.to_string()),
    };
    let request = ArchiveRequest {
        coordinates,
        granularity: Granularity::PartialPage,
        strategy: PackingStrategy::from_concat(flag_enabled(query.concat.as_deref())),
    };
    serve_archive(state, request, "pages.zip", query.version).await
}

async fn volumes_handler(
    State(state): State<Arc<AccessState>>,
    Query(query): Query<VolumesQuery>,
) -> Response {
    let coordinates = match parse_volume_ids(query.volume_ids.as_deref().unwrap_or("")) {
        Ok(coordinates) => coordinates,
        Err(e) => return malformed("Volume", &e.to_string()),
    };
    let request = ArchiveRequest {
        coordinates,
        granularity: Granularity::WholeVolume,
        strategy: PackingStrategy::from_concat(flag_enabled(query.concat.as_deref())),
    };
    serve_archive(state, request, "volumes.zip", query.version).await
}

async fn serve_archive(
    state: Arc<AccessState>,
    request: ArchiveRequest,
    filename: &str,
    version: Option<String>,
) -> Response {
    let ids = request.coordinates.len().to_string();
    Logger::info(
        "ARCHIVE_REQUEST",
        &[
            ("filename", filename),
            ("ids", ids.as_str()),
            ("version", version.as_deref().unwrap_or("")),
        ],
    );

    let admission = {
        let state = state.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || state.admit(&request)).await
    };
    match admission {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return access_failure(&e),
        Err(e) => return internal_error(&e.to_string()),
    }

    let (mut writer, body) = ChannelWriter::with_chunk_size(state.settings.stream_chunk_size);
    tokio::task::spawn_blocking(move || {
        let result = state.export(request, &mut writer);
        if let Err(e) = result {
            let reason = e.to_string();
            Logger::error("ARCHIVE_ABORTED", &[("reason", reason.as_str())]);
            writer.fail(std::io::Error::new(std::io::ErrorKind::Other, reason));
        }
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, ZIP_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        body,
    )
        .into_response()
}

// ==================
// Error Responses
// ==================

fn html_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, XHTML_CONTENT_TYPE)],
        Body::from(format!("<p>{}</p>", escape_html(message))),
    )
        .into_response()
}

fn malformed(kind: &str, reason: &str) -> Response {
    Logger::warn(
        "MALFORMED_ID_LIST",
        &[("kind", kind), ("reason", reason)],
    );
    html_response(
        StatusCode::BAD_REQUEST,
        &format!("Malformed {kind} ID List"),
    )
}

fn access_failure(error: &AccessError) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = error.to_string();
    Logger::warn(
        "ADMISSION_REJECTED",
        &[("code", error.code()), ("message", message.as_str())],
    );
    html_response(status, &message)
}

fn internal_error(reason: &str) -> Response {
    Logger::error("REQUEST_FAILED", &[("reason", reason)]);
    html_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
