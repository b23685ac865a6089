//! # Call-Keeper Service
//!
//! Binary entry point for the Call-Keeper HTTP service.
//!
//! This executable:
//! - Loads configuration from environment and files
//! - Initializes observability (logging, tracing)
//! - Creates the ingestion pipeline and its dependencies
//! - Starts the HTTP server from call-keeper-api

mod summarizer;

use call_keeper_api::{
    start_server, AppState, DefaultHealthChecker, SecretConfig, ServiceConfig, ServiceError,
    ServiceMetrics, StorageConfig, SummarizerConfig,
};
use call_keeper_core::summarize::{DisabledSummarizer, Summarizer};
use call_keeper_core::webhook::{IngestPipeline, SecretString, SignatureVerifier};
use call_keeper_core::{CallStore, FilesystemStore, InMemoryStore, LeadStore, ReconcileEngine};
use std::sync::Arc;
use summarizer::HttpSummarizer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "call_keeper_service=info,call_keeper_api=info,call_keeper_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Call-Keeper Service");

    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (applied in order — later sources override earlier ones):
    //  1. /etc/call-keeper/service.yaml    — system-wide defaults
    //  2. ./config/service.yaml            — deployment-local override
    //  3. Path given by CK_CONFIG_FILE env — operator-specified file
    //  4. Environment variables prefixed CK__ (double-underscore separator)
    //     e.g. CK__SERVER__PORT=9090 sets server.port = 9090
    //
    // All service configuration fields carry serde defaults, so absent files
    // or an entirely unconfigured environment produces a valid service config
    // with built-in defaults.  A malformed file or an environment variable
    // that cannot be coerced to the correct type IS a hard error because it
    // indicates deliberate-but-broken operator configuration.
    // -------------------------------------------------------------------------
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/call-keeper/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    // Optional explicit path supplied by the operator.
    if let Ok(explicit_path) = std::env::var("CK_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
            info!(path = %explicit_path, "Loading configuration from explicit path");
        }
    }

    let config = match config_builder
        .add_source(config::Environment::with_prefix("CK").separator("__"))
        .build()
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    let service_config: ServiceConfig = match config.try_deserialize() {
        Ok(sc) => sc,
        Err(e) => {
            error!(
                error = %e,
                "Could not deserialize service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // -------------------------------------------------------------------------
    // Build the ingestion pipeline
    //
    // The store handle, summarizer, and signature verifier are constructed
    // once here and injected by reference. No module-level singletons, so
    // there is no hidden global mutable state to reason about.
    // -------------------------------------------------------------------------
    let secret = match resolve_webhook_secret(&service_config) {
        Ok(secret) => secret,
        Err(message) => {
            error!(error = %message, "Webhook secret configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    let verifier =
        SignatureVerifier::new(secret).with_tolerance(service_config.webhook.tolerance_seconds);

    let (leads, calls): (Arc<dyn LeadStore>, Arc<dyn CallStore>) = match &service_config.storage {
        StorageConfig::Memory => {
            warn!("Using the in-memory store; all state is lost on restart");
            let store = Arc::new(InMemoryStore::new());
            (store.clone(), store)
        }
        StorageConfig::Filesystem { root } => {
            match FilesystemStore::new(root.clone()).await {
                Ok(store) => {
                    info!(root = %root.display(), "Using the filesystem store");
                    let store = Arc::new(store);
                    (store.clone(), store)
                }
                Err(e) => {
                    error!(error = %e, root = %root.display(), "Failed to open filesystem store; aborting");
                    std::process::exit(4);
                }
            }
        }
    };

    let summarizer: Arc<dyn Summarizer> = match &service_config.summarizer {
        SummarizerConfig::Disabled => {
            info!("Summarizer disabled; calls will carry transcript-prefix summaries");
            Arc::new(DisabledSummarizer)
        }
        SummarizerConfig::Http {
            endpoint,
            timeout_seconds,
        } => match HttpSummarizer::new(endpoint.clone(), *timeout_seconds) {
            Ok(s) => {
                info!(endpoint = %endpoint, "Using HTTP summarizer");
                Arc::new(s)
            }
            Err(e) => {
                error!(error = %e, "Failed to construct HTTP summarizer; aborting");
                std::process::exit(3);
            }
        },
    };

    let engine = Arc::new(ReconcileEngine::new(
        leads.clone(),
        calls.clone(),
        summarizer,
    ));
    let pipeline = Arc::new(IngestPipeline::new(verifier, engine));

    let metrics = match ServiceMetrics::new() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            error!(error = %e, "Failed to initialize metrics; aborting");
            std::process::exit(3);
        }
    };

    let state = AppState::new(
        service_config.clone(),
        pipeline,
        leads,
        calls,
        Arc::new(DefaultHealthChecker),
        metrics,
    );

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhook.endpoint_path,
        "Starting HTTP server"
    );

    // Start the server
    if let Err(e) = start_server(state).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }

    Ok(())
}

// ============================================================================
// Private helpers
// ============================================================================

/// Resolve the configured webhook secret source into key material.
///
/// Returns `Ok(None)` when no secret is configured (open mode; the verifier
/// logs the trust decision). Literal secrets draw a startup `WARN` so
/// operators replace them before production.
fn resolve_webhook_secret(config: &ServiceConfig) -> Result<Option<SecretString>, String> {
    match &config.webhook.secret {
        None => Ok(None),
        Some(SecretConfig::Literal { value }) => {
            warn!(
                "A literal webhook secret is configured — literal secrets in configuration \
                 files are not safe for production. Move the secret to an environment \
                 variable before deploying."
            );
            Ok(Some(SecretString::new(value.clone())))
        }
        Some(SecretConfig::Env { variable }) => match std::env::var(variable) {
            Ok(value) if !value.is_empty() => Ok(Some(SecretString::new(value))),
            Ok(_) => Err(format!(
                "environment variable '{}' is set but empty",
                variable
            )),
            Err(_) => Err(format!("environment variable '{}' is not set", variable)),
        },
    }
}
