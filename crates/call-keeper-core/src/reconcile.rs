//! # Reconciliation Module
//!
//! Turns one canonical call-event into durable Lead/Call state without
//! creating duplicates, under concurrent and retried delivery.
//!
//! Per external call identifier the event moves Unseen → Processing →
//! Recorded. The existence check for idempotency happens before any mutation,
//! the lead upsert happens before the call write, and the final call write is
//! a conditional create, so a duplicate delivery that races past the
//! existence check still loses cleanly at the store and is reported as
//! already processed.

use crate::store::{CallStore, LeadStore, StorageError};
use crate::summarize::{Summarizer, SummarizerError};
use crate::webhook::CanonicalCallEvent;
use crate::{CallId, LeadId, LeadStatus, PhoneNumber, Sentiment, Timestamp};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Maximum characters of transcript used as the summary when the
/// summarization collaborator is unavailable.
pub const SUMMARY_FALLBACK_MAX_CHARS: usize = 240;

// ============================================================================
// Lead
// ============================================================================

/// A prospective customer, keyed by normalized phone number.
///
/// Invariant: the store holds at most one lead per normalized phone. Leads
/// are never deleted by the ingestion core; deletion is an administrative
/// action elsewhere.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub phone: PhoneNumber,
    /// Display name; first known name wins, call data never overwrites it.
    pub name: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub notes: String,
    /// Most recent call recorded against this lead.
    pub last_call_id: Option<CallId>,
    pub total_calls: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Lead {
    /// Create a fresh lead from the first call event seen for a phone number
    pub fn from_first_call(event: &CanonicalCallEvent) -> Self {
        let now = Timestamp::now();
        Self {
            id: LeadId::new(),
            phone: event.caller_phone.clone(),
            name: event.caller_name.clone(),
            email: None,
            status: LeadStatus::New,
            notes: String::new(),
            last_call_id: Some(event.call_id.clone()),
            total_calls: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one new call event to an existing lead.
    ///
    /// Bumps the call counter and last-call pointer, and backfills the name
    /// only when the lead has none yet.
    pub fn record_call(&mut self, event: &CanonicalCallEvent) {
        self.total_calls += 1;
        self.last_call_id = Some(event.call_id.clone());
        self.updated_at = Timestamp::now();

        if self.name.is_none() {
            if let Some(name) = &event.caller_name {
                self.name = Some(name.clone());
            }
        }
    }
}

// ============================================================================
// Call
// ============================================================================

/// One ingested conversation event, tied to a lead.
///
/// The external identifier is globally unique; a call is recorded exactly
/// once per identifier. The raw provider payload is preserved verbatim for
/// audit.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Call {
    pub id: CallId,
    pub lead_id: Option<LeadId>,
    pub caller_phone: PhoneNumber,
    pub caller_name: Option<String>,
    pub transcript: String,
    pub summary: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub duration_seconds: Option<u64>,
    pub audio_url: Option<String>,
    pub tags: Vec<String>,
    pub assigned_user_id: Option<String>,
    pub assigned_user_name: Option<String>,
    pub archived: bool,
    pub raw_payload: serde_json::Value,
    pub created_at: Timestamp,
    pub ended_at: Option<Timestamp>,
}

impl Call {
    /// Build the call document for a canonical event bound to `lead_id`
    pub fn from_event(
        event: CanonicalCallEvent,
        lead_id: Option<LeadId>,
        summary: Option<String>,
        sentiment: Option<Sentiment>,
    ) -> Self {
        Self {
            id: event.call_id,
            lead_id,
            caller_phone: event.caller_phone,
            caller_name: event.caller_name,
            transcript: event.transcript,
            summary,
            sentiment,
            duration_seconds: event.duration_seconds,
            audio_url: event.audio_url,
            tags: Vec::new(),
            assigned_user_id: None,
            assigned_user_name: None,
            archived: false,
            raw_payload: event.raw_payload,
            created_at: Timestamp::now(),
            ended_at: event.ended_at,
        }
    }
}

// ============================================================================
// Outcome and Error Types
// ============================================================================

/// Result of reconciling one canonical event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event was recorded: the call document exists and its lead was
    /// created or updated.
    Recorded { call_id: CallId, lead_id: LeadId },

    /// The call identifier had already been recorded; nothing was written.
    AlreadyProcessed { call_id: CallId },
}

impl IngestOutcome {
    /// The external call identifier this outcome refers to
    pub fn call_id(&self) -> &CallId {
        match self {
            Self::Recorded { call_id, .. } => call_id,
            Self::AlreadyProcessed { call_id } => call_id,
        }
    }

    /// Whether this delivery was a redelivery of an already-recorded call
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::AlreadyProcessed { .. })
    }
}

/// Errors from the reconciliation engine.
///
/// Only storage can fail here; the summarization collaborator is wrapped and
/// recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Storage failure during reconciliation: {0}")]
    Storage(#[from] StorageError),
}

impl ReconcileError {
    /// Check if error is transient; upstream redelivery is safe either way
    /// because the idempotency check re-runs.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
        }
    }
}

// ============================================================================
// ReconcileEngine
// ============================================================================

/// Resolves canonical call-events into Lead/Call upserts.
///
/// All durable state lives behind the injected store handles; the engine
/// itself is stateless and serves concurrent requests from one instance.
pub struct ReconcileEngine {
    leads: Arc<dyn LeadStore>,
    calls: Arc<dyn CallStore>,
    summarizer: Arc<dyn Summarizer>,
}

impl ReconcileEngine {
    /// Create an engine over the given stores and summarizer
    pub fn new(
        leads: Arc<dyn LeadStore>,
        calls: Arc<dyn CallStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            leads,
            calls,
            summarizer,
        }
    }

    /// Reconcile one canonical event into durable state.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Storage`] on store failures. A failure after
    /// the idempotency check but before the call commit leaves the event
    /// unrecorded; redelivery re-runs lead resolution and call creation,
    /// which is safe because the call document does not exist yet. A lead
    /// without a call is legal intermediate state.
    #[instrument(skip(self, event), fields(call_id = %event.call_id, phone = %event.caller_phone))]
    pub async fn ingest(&self, event: CanonicalCallEvent) -> Result<IngestOutcome, ReconcileError> {
        // Idempotency check happens-before any mutation.
        if self.calls.find_by_id(&event.call_id).await?.is_some() {
            info!("Call already recorded, treating redelivery as success");
            return Ok(IngestOutcome::AlreadyProcessed {
                call_id: event.call_id,
            });
        }

        let (summary, sentiment) = self.summarize_or_fallback(&event.transcript).await;

        let lead = self.resolve_lead(&event).await?;

        let lead_id = lead.id;
        let call_id = event.call_id.clone();
        let call = Call::from_event(event, Some(lead_id), summary, sentiment);

        match self.calls.create(call).await {
            Ok(()) => {
                info!(lead_id = %lead_id, "Recorded new call");
                Ok(IngestOutcome::Recorded { call_id, lead_id })
            }
            // A concurrent duplicate delivery won the conditional create.
            Err(StorageError::AlreadyExists { .. }) => {
                info!("Concurrent duplicate delivery won the call create");
                Ok(IngestOutcome::AlreadyProcessed { call_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Invoke the summarization collaborator; never let it abort ingestion.
    async fn summarize_or_fallback(
        &self,
        transcript: &str,
    ) -> (Option<String>, Option<Sentiment>) {
        match self.summarizer.summarize(transcript).await {
            Ok(result) => (Some(result.summary), result.sentiment),
            Err(SummarizerError::Disabled) => (transcript_prefix(transcript), None),
            Err(e) => {
                warn!(error = %e, "Summarizer failed, falling back to transcript prefix");
                (transcript_prefix(transcript), None)
            }
        }
    }

    /// Find-or-create the lead for this event's phone number.
    ///
    /// Two simultaneous first calls from the same number race on the
    /// conditional lead create; the loser re-reads the winner's document and
    /// records its call against it.
    async fn resolve_lead(&self, event: &CanonicalCallEvent) -> Result<Lead, StorageError> {
        if let Some(mut lead) = self.leads.find_by_phone(&event.caller_phone).await? {
            lead.record_call(event);
            self.leads.update(lead.clone()).await?;
            return Ok(lead);
        }

        let lead = Lead::from_first_call(event);
        match self.leads.create(lead.clone()).await {
            Ok(()) => Ok(lead),
            Err(StorageError::AlreadyExists { .. }) => {
                let mut existing = self
                    .leads
                    .find_by_phone(&event.caller_phone)
                    .await?
                    .ok_or_else(|| StorageError::OperationFailed {
                        message: format!(
                            "lead for phone '{}' vanished after conflicting create",
                            event.caller_phone
                        ),
                    })?;
                existing.record_call(event);
                self.leads.update(existing.clone()).await?;
                Ok(existing)
            }
            Err(e) => Err(e),
        }
    }
}

/// Bounded, char-boundary-safe transcript prefix; `None` for empty
/// transcripts.
fn transcript_prefix(transcript: &str) -> Option<String> {
    let trimmed = transcript.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(SUMMARY_FALLBACK_MAX_CHARS).collect())
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
