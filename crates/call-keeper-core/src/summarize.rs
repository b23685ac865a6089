//! # Transcript Summarization Collaborator
//!
//! The summarizer is an external capability (an AI text service) that turns a
//! call transcript into a short summary and a sentiment label. It is treated
//! as unreliable by design: the reconciliation engine wraps every call and
//! falls back to transcript truncation, so a summarizer outage can never
//! abort ingestion.

use crate::Sentiment;
use async_trait::async_trait;

/// Summarization result for one transcript
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub summary: String,
    pub sentiment: Option<Sentiment>,
}

/// Errors from the summarization collaborator.
///
/// None of these are terminal for ingestion; the reconciliation engine
/// recovers from all of them locally.
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    /// No summarizer is configured for this deployment.
    #[error("Summarizer is disabled")]
    Disabled,

    #[error("Summarizer unavailable: {message}")]
    Unavailable { message: String },

    #[error("Summarizer returned a malformed response: {message}")]
    MalformedResponse { message: String },
}

/// Interface for transcript summarization
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a transcript into a short summary plus sentiment label
    async fn summarize(&self, transcript: &str) -> Result<CallSummary, SummarizerError>;
}

/// Summarizer used when no backing service is configured.
///
/// Always reports [`SummarizerError::Disabled`], which the reconciliation
/// engine turns into the truncation fallback.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _transcript: &str) -> Result<CallSummary, SummarizerError> {
        Err(SummarizerError::Disabled)
    }
}
