//! # Call-Keeper HTTP Service
//!
//! HTTP server for receiving voice-AI provider call-event webhooks and
//! reconciling them into Lead/Call state.
//!
//! This service provides:
//! - The provider webhook endpoint with signature verification
//! - A lead/call REST surface for agent tooling
//! - Health check endpoints
//! - A Prometheus metrics endpoint

// Public modules
pub mod errors;
pub mod metrics;
pub mod responses;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use call_keeper_core::webhook::{CallEventProcessor, WebhookRequest};
use call_keeper_core::{
    Call, CallId, CallQuery, CallStore, IngestOutcome, Lead, LeadId, LeadQuery, LeadStatus,
    LeadStore, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};

pub use errors::{ApiError, ConfigError, IngestHandlerError, ServiceError};
pub use metrics::ServiceMetrics;
pub use responses::{
    CallListParams, CallListResponse, CallSummaryView, DefaultHealthChecker, HealthChecker,
    HealthResponse, HealthStatus, IngestAck, LeadListParams, LeadListResponse, ReadinessResponse,
    UpdateCallRequest, UpdateLeadRequest,
};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Ingestion pipeline handling webhook deliveries
    pub processor: Arc<dyn CallEventProcessor>,

    /// Lead store for the REST surface
    pub leads: Arc<dyn LeadStore>,

    /// Call store for the REST surface
    pub calls: Arc<dyn CallStore>,

    /// Health checker for system monitoring
    pub health_checker: Arc<dyn HealthChecker>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        processor: Arc<dyn CallEventProcessor>,
        leads: Arc<dyn LeadStore>,
        calls: Arc<dyn CallStore>,
        health_checker: Arc<dyn HealthChecker>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            processor,
            leads,
            calls,
            health_checker,
            metrics,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook intake settings
    pub webhook: WebhookConfig,

    /// Document store backend selection
    pub storage: StorageConfig,

    /// Summarization collaborator selection
    pub summarizer: SummarizerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the configuration before startup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }

        if !self.webhook.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.endpoint_path '{}' must start with '/'",
                    self.webhook.endpoint_path
                ),
            });
        }

        if self.webhook.tolerance_seconds <= 0 {
            return Err(ConfigError::Invalid {
                message: "webhook.tolerance_seconds must be positive".to_string(),
            });
        }

        if let SummarizerConfig::Http { endpoint, .. } = &self.summarizer {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    message: format!("summarizer.endpoint '{}' must be an HTTP(S) URL", endpoint),
                });
            }
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB; transcripts, not media
        }
    }
}

/// Webhook intake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Shared secret used to verify provider signatures.
    ///
    /// `None` runs the endpoint in open mode: every delivery is accepted
    /// without verification. That is an explicit trust decision for
    /// development setups, not a production configuration.
    pub secret: Option<SecretConfig>,

    /// Anti-replay tolerance window in seconds (either direction)
    pub tolerance_seconds: i64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook/elevenlabs".to_string(),
            secret: None,
            tolerance_seconds: call_keeper_core::webhook::DEFAULT_TOLERANCE_SECONDS,
        }
    }
}

/// Source for the webhook shared secret.
///
/// [`SecretConfig::Literal`] is for development and testing only; prefer
/// [`SecretConfig::Env`] so the secret never lands in a configuration file.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SecretConfig {
    /// Literal secret embedded in the configuration.
    ///
    /// **Development / testing only.** Never commit to source control.
    Literal {
        /// Raw secret value. Excluded from `Debug` output.
        value: String,
    },

    /// Secret read from an environment variable at startup.
    Env {
        /// Name of the environment variable.
        variable: String,
    },
}

impl std::fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal { .. } => f
                .debug_struct("SecretConfig::Literal")
                .field("value", &"<REDACTED>")
                .finish(),
            Self::Env { variable } => f
                .debug_struct("SecretConfig::Env")
                .field("variable", variable)
                .finish(),
        }
    }
}

/// Document store backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StorageConfig {
    /// In-memory store; state is lost on restart. Development only.
    Memory,

    /// JSON documents on local disk under `root`.
    Filesystem { root: PathBuf },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

/// Summarization collaborator selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SummarizerConfig {
    /// No summarizer; calls carry a transcript-prefix summary.
    Disabled,

    /// HTTP summarization service.
    Http {
        /// Endpoint receiving `{"transcript": ...}` POSTs.
        endpoint: String,
        /// Request timeout in seconds.
        #[serde(default = "default_summarizer_timeout")]
        timeout_seconds: u64,
    },
}

fn default_summarizer_timeout() -> u64 {
    10
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self::Disabled
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route(&state.config.webhook.endpoint_path, post(handle_webhook));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let api_routes = Router::new()
        .route("/api/leads", get(list_leads))
        .route("/api/leads/{lead_id}", get(get_lead).patch(update_lead))
        .route("/api/calls", get(list_calls))
        .route("/api/calls/{call_id}", get(get_call).patch(update_call));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(api_routes)
        .merge(observability_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let config = state.config.clone();
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            ServiceError::Configuration(ConfigError::Invalid {
                message: format!("Invalid bind address: {}", e),
            })
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = std::time::Duration::from_secs(config.server.shutdown_timeout_seconds);

    let shutdown_signal = async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown with {}s timeout", shutdown_timeout.as_secs());
            },
        }
    };

    // In-flight requests complete before the process exits; new connections
    // are refused as soon as the signal arrives.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle provider call-event webhook deliveries.
///
/// Ingestion is synchronous per request: verify, normalize, reconcile, then
/// answer. The provider redelivers on non-2xx, which is safe because the
/// idempotency check re-runs on every attempt.
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestAck>, IngestHandlerError> {
    state.metrics.events_received.inc();

    if body.len() > state.config.server.max_body_size {
        state.metrics.payload_rejections.inc();
        return Err(IngestHandlerError::InvalidPayload {
            message: format!(
                "payload of {} bytes exceeds limit of {} bytes",
                body.len(),
                state.config.server.max_body_size
            ),
        });
    }

    // Convert headers to a lowercase map for the core request constructor
    let header_map: HashMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();

    let request = WebhookRequest::from_http_headers(&header_map, body);
    let correlation_id = request.correlation_id.clone();

    let outcome = state.processor.process(request).await.map_err(|e| {
        state.metrics.record_failure(&e);
        IngestHandlerError::from(e)
    })?;

    match outcome {
        IngestOutcome::Recorded { call_id, lead_id } => {
            state.metrics.calls_recorded.inc();
            info!(
                call_id = %call_id,
                lead_id = %lead_id,
                correlation_id = %correlation_id,
                "Recorded webhook call event"
            );
            Ok(Json(IngestAck::recorded()))
        }
        IngestOutcome::AlreadyProcessed { call_id } => {
            state.metrics.duplicate_deliveries.inc();
            info!(
                call_id = %call_id,
                correlation_id = %correlation_id,
                "Acknowledged duplicate webhook delivery"
            );
            Ok(Json(IngestAck::already_processed()))
        }
    }
}

// ============================================================================
// Lead Handlers
// ============================================================================

/// List leads, newest first
#[instrument(skip(state))]
async fn list_leads(
    State(state): State<AppState>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<LeadListResponse>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(LeadStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let (page, per_page) = page_params(params.page, params.per_page);
    let result = state
        .leads
        .list(LeadQuery {
            status,
            offset: (page - 1) * per_page,
            limit: per_page,
        })
        .await?;

    Ok(Json(LeadListResponse {
        leads: result.items,
        total: result.total,
        page,
        per_page,
    }))
}

/// Get one lead by ID
#[instrument(skip(state))]
async fn get_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let id = parse_lead_id(&lead_id)?;
    let lead = state
        .leads
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "lead".to_string(),
            id: lead_id,
        })?;

    Ok(Json(lead))
}

/// Apply an agent edit to a lead.
///
/// Unlike call ingestion, an explicit agent edit may overwrite the lead's
/// name; first-known-name-wins only protects against call data.
#[instrument(skip(state, request))]
async fn update_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    Json(request): Json<UpdateLeadRequest>,
) -> Result<Json<Lead>, ApiError> {
    let id = parse_lead_id(&lead_id)?;
    let mut lead = state
        .leads
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "lead".to_string(),
            id: lead_id,
        })?;

    if let Some(status) = request.status {
        lead.status = status;
    }
    if let Some(notes) = request.notes {
        lead.notes = notes;
    }
    if let Some(name) = request.name {
        lead.name = Some(name);
    }
    if let Some(email) = request.email {
        lead.email = Some(email);
    }
    lead.updated_at = Timestamp::now();

    state.leads.update(lead.clone()).await?;
    Ok(Json(lead))
}

// ============================================================================
// Call Handlers
// ============================================================================

/// List calls, newest first
#[instrument(skip(state))]
async fn list_calls(
    State(state): State<AppState>,
    Query(params): Query<CallListParams>,
) -> Result<Json<CallListResponse>, ApiError> {
    let lead_id = params
        .lead_id
        .as_deref()
        .map(parse_lead_id)
        .transpose()?;

    let (page, per_page) = page_params(params.page, params.per_page);
    let result = state
        .calls
        .list(CallQuery {
            lead_id,
            include_archived: params.include_archived.unwrap_or(false),
            offset: (page - 1) * per_page,
            limit: per_page,
        })
        .await?;

    Ok(Json(CallListResponse {
        calls: result.items.into_iter().map(CallSummaryView::from).collect(),
        total: result.total,
        page,
        per_page,
    }))
}

/// Get one call by its external identifier
#[instrument(skip(state))]
async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<Call>, ApiError> {
    let id = parse_call_id(&call_id)?;
    let call = state
        .calls
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "call".to_string(),
            id: call_id,
        })?;

    Ok(Json(call))
}

/// Apply an agent edit (assignment, tags, archival) to a call
#[instrument(skip(state, request))]
async fn update_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
    Json(request): Json<UpdateCallRequest>,
) -> Result<Json<Call>, ApiError> {
    let id = parse_call_id(&call_id)?;
    let mut call = state
        .calls
        .find_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "call".to_string(),
            id: call_id,
        })?;

    if let Some(user_id) = request.assigned_user_id {
        call.assigned_user_id = Some(user_id);
    }
    if let Some(user_name) = request.assigned_user_name {
        call.assigned_user_name = Some(user_name);
    }
    if let Some(tags) = request.tags {
        call.tags = tags;
    }
    if let Some(archived) = request.archived {
        call.archived = archived;
    }

    state.calls.update(call.clone()).await?;
    Ok(Json(call))
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let status = state.health_checker.check_health().await;

    let response = HealthResponse {
        status: if status.is_healthy {
            "healthy".to_string()
        } else {
            "unhealthy".to_string()
        },
        timestamp: Timestamp::now(),
        checks: status.checks,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if status.is_healthy {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Readiness check for load balancers
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let is_ready = state.health_checker.check_readiness().await;

    let response = ReadinessResponse {
        ready: is_ready,
        timestamp: Timestamp::now(),
    };

    if is_ready {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .render()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================================================
// Private helpers
// ============================================================================

fn page_params(page: Option<usize>, per_page: Option<usize>) -> (usize, usize) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(50).clamp(1, 200);
    (page, per_page)
}

fn parse_lead_id(raw: &str) -> Result<LeadId, ApiError> {
    raw.parse::<LeadId>()
        .map_err(|e| ApiError::bad_request(format!("invalid lead id: {}", e)))
}

fn parse_call_id(raw: &str) -> Result<CallId, ApiError> {
    CallId::new(raw).map_err(|e| ApiError::bad_request(format!("invalid call id: {}", e)))
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
