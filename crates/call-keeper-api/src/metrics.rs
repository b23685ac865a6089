//! Prometheus metrics for the ingestion service.

use call_keeper_core::webhook::WebhookError;
use prometheus::{IntCounter, Registry, TextEncoder};

/// Counters for the webhook ingestion pipeline.
///
/// Backed by an owned [`Registry`] rather than the process-global one so
/// tests can construct as many instances as they like.
pub struct ServiceMetrics {
    registry: Registry,

    /// Deliveries received, before any validation.
    pub events_received: IntCounter,
    /// Deliveries that produced a new call document.
    pub calls_recorded: IntCounter,
    /// Redeliveries answered from the idempotency check.
    pub duplicate_deliveries: IntCounter,
    /// Deliveries rejected for signature failures (401).
    pub signature_rejections: IntCounter,
    /// Deliveries rejected for malformed payloads (400).
    pub payload_rejections: IntCounter,
    /// Deliveries that failed on the document store (500).
    pub storage_failures: IntCounter,
}

impl ServiceMetrics {
    /// Create and register all counters
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_received = IntCounter::new(
            "callkeeper_events_received_total",
            "Webhook deliveries received",
        )?;
        let calls_recorded = IntCounter::new(
            "callkeeper_calls_recorded_total",
            "Deliveries that produced a new call document",
        )?;
        let duplicate_deliveries = IntCounter::new(
            "callkeeper_duplicate_deliveries_total",
            "Redeliveries answered idempotently",
        )?;
        let signature_rejections = IntCounter::new(
            "callkeeper_signature_rejections_total",
            "Deliveries rejected for signature failures",
        )?;
        let payload_rejections = IntCounter::new(
            "callkeeper_payload_rejections_total",
            "Deliveries rejected for malformed payloads",
        )?;
        let storage_failures = IntCounter::new(
            "callkeeper_storage_failures_total",
            "Deliveries that failed on the document store",
        )?;

        for counter in [
            &events_received,
            &calls_recorded,
            &duplicate_deliveries,
            &signature_rejections,
            &payload_rejections,
            &storage_failures,
        ] {
            registry.register(Box::new(counter.clone()))?;
        }

        Ok(Self {
            registry,
            events_received,
            calls_recorded,
            duplicate_deliveries,
            signature_rejections,
            payload_rejections,
            storage_failures,
        })
    }

    /// Bump the counter matching a pipeline failure
    pub fn record_failure(&self, error: &WebhookError) {
        match error {
            WebhookError::Signature(_) => self.signature_rejections.inc(),
            WebhookError::JsonParsing(_) | WebhookError::Normalization(_) => {
                self.payload_rejections.inc()
            }
            WebhookError::Reconcile(_) => self.storage_failures.inc(),
        }
    }

    /// Render the registry in Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
