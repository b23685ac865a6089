//! # Webhook Processing Module
//!
//! Handles provider call-event webhook verification, normalization, and
//! hand-off to the reconciliation engine.
//!
//! Control flow for one delivery:
//!
//! 1. [`SignatureVerifier`] authenticates the raw body against the
//!    timestamped HMAC header (or skips in open mode).
//! 2. [`normalizer::normalize`] canonicalizes the heterogeneous payload.
//! 3. [`ReconcileEngine`](crate::reconcile::ReconcileEngine) resolves the
//!    event into Lead/Call state, idempotently.

use crate::reconcile::{IngestOutcome, ReconcileEngine, ReconcileError};
use crate::{CorrelationId, Timestamp};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

mod normalizer;
mod signature;

pub use normalizer::{normalize, CanonicalCallEvent, NormalizationError};
pub use signature::{
    SecretString, SignatureError, SignatureHeader, SignatureVerifier, VerificationOutcome,
    DEFAULT_TOLERANCE_SECONDS, SIGNATURE_HEADER,
};

// ============================================================================
// Core Types
// ============================================================================

/// Raw HTTP request data for one webhook delivery
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Exact request body bytes, pre-parse (the signature covers these).
    pub body: Bytes,
    /// Raw value of the provider signature header, if present.
    pub signature: Option<String>,
    pub received_at: Timestamp,
    pub correlation_id: CorrelationId,
}

impl WebhookRequest {
    /// Create new webhook request
    pub fn new(body: Bytes, signature: Option<String>) -> Self {
        Self {
            body,
            signature,
            received_at: Timestamp::now(),
            correlation_id: CorrelationId::new(),
        }
    }

    /// Build a request from a lowercase header map plus the raw body
    pub fn from_http_headers(headers: &HashMap<String, String>, body: Bytes) -> Self {
        let signature = headers.get(SIGNATURE_HEADER).cloned();
        Self::new(body, signature)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error for webhook processing failures
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Event normalization failed: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl WebhookError {
    /// Check if error is transient and the delivery worth redelivering
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Reconcile(e) => e.is_transient(),
            Self::Signature(_) => false,
            Self::JsonParsing(_) => false,
            Self::Normalization(_) => false,
        }
    }

    /// Get error category for monitoring
    pub fn error_category(&self) -> crate::ErrorCategory {
        match self {
            Self::Signature(_) => crate::ErrorCategory::Security,
            Self::JsonParsing(_) => crate::ErrorCategory::Permanent,
            Self::Normalization(_) => crate::ErrorCategory::Permanent,
            Self::Reconcile(e) => {
                if e.is_transient() {
                    crate::ErrorCategory::Transient
                } else {
                    crate::ErrorCategory::Permanent
                }
            }
        }
    }
}

// ============================================================================
// Core Operations
// ============================================================================

/// Main interface for the call-event ingestion pipeline
#[async_trait]
pub trait CallEventProcessor: Send + Sync {
    /// Process one webhook delivery end to end
    async fn process(&self, request: WebhookRequest) -> Result<IngestOutcome, WebhookError>;
}

/// The production ingestion pipeline: verify, normalize, reconcile.
///
/// Dependencies are injected at construction; the pipeline itself holds no
/// mutable state, so one instance serves all concurrent requests.
pub struct IngestPipeline {
    verifier: SignatureVerifier,
    engine: Arc<ReconcileEngine>,
}

impl IngestPipeline {
    /// Create a pipeline from a verifier and a reconciliation engine
    pub fn new(verifier: SignatureVerifier, engine: Arc<ReconcileEngine>) -> Self {
        Self { verifier, engine }
    }
}

#[async_trait]
impl CallEventProcessor for IngestPipeline {
    #[instrument(skip(self, request), fields(correlation_id = %request.correlation_id))]
    async fn process(&self, request: WebhookRequest) -> Result<IngestOutcome, WebhookError> {
        match self.verifier.verify_at(
            &request.body,
            request.signature.as_deref(),
            request.received_at,
        )? {
            VerificationOutcome::Verified => {
                debug!("Webhook signature verified");
            }
            VerificationOutcome::SkippedOpenMode => {
                debug!("Signature verification skipped, no secret configured");
            }
        }

        let payload: serde_json::Value = serde_json::from_slice(&request.body)?;
        let event = normalizer::normalize(payload)?;
        event.validate()?;

        info!(
            call_id = %event.call_id,
            phone = %event.caller_phone,
            "Normalized inbound call event"
        );

        let outcome = self.engine.ingest(event).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
