//! HTTP-backed [`Summarizer`] implementation for the service binary.
//!
//! Posts `{"transcript": ...}` to a configured endpoint and expects
//! `{"summary": ..., "sentiment": ...}` back, where sentiment is one of
//! `positive`, `neutral`, `negative`, or null. The backing service is
//! treated as unreliable: every failure maps to a [`SummarizerError`] that
//! the reconciliation engine recovers from with the truncation fallback.

use async_trait::async_trait;
use call_keeper_core::summarize::{CallSummary, Summarizer, SummarizerError};
use call_keeper_core::Sentiment;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::{instrument, warn};

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    transcript: &'a str,
}

#[derive(Deserialize)]
struct SummarizeResponse {
    summary: String,
    sentiment: Option<String>,
}

/// Summarizer backed by an HTTP text-AI service
pub struct HttpSummarizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSummarizer {
    /// Build a summarizer with its own pooled client and request timeout
    pub fn new(endpoint: String, timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    #[instrument(skip(self, transcript), fields(transcript_chars = transcript.chars().count()))]
    async fn summarize(&self, transcript: &str) -> Result<CallSummary, SummarizerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SummarizeRequest { transcript })
            .send()
            .await
            .map_err(|e| SummarizerError::Unavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizerError::Unavailable {
                message: format!("summarizer answered HTTP {}", status),
            });
        }

        let body: SummarizeResponse =
            response
                .json()
                .await
                .map_err(|e| SummarizerError::MalformedResponse {
                    message: e.to_string(),
                })?;

        // An unrecognized sentiment label degrades to "no sentiment" rather
        // than failing the whole summary.
        let sentiment = body.sentiment.as_deref().and_then(|label| {
            let parsed = Sentiment::from_str(label).ok();
            if parsed.is_none() {
                warn!(label, "Summarizer returned unknown sentiment label");
            }
            parsed
        });

        Ok(CallSummary {
            summary: body.summary,
            sentiment,
        })
    }
}

#[cfg(test)]
#[path = "summarizer_tests.rs"]
mod tests;
