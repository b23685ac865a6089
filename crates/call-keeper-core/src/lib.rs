//! # Call-Keeper Core
//!
//! Core business logic for the Call-Keeper call-event intake and reconciliation
//! service.
//!
//! This crate contains the domain logic for processing voice-AI provider
//! webhooks, validating signatures, normalizing heterogeneous call-event
//! payloads, and reconciling each event into durable Lead/Call state.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions
//! - Infrastructure implementations are injected at runtime
//! - All external dependencies (document store, summarizer) are abstracted
//!   behind traits
//!
//! ## Usage
//!
//! ```rust
//! use call_keeper_core::{CallId, LeadId, PhoneNumber};
//!
//! // Core types are available for use across the system
//! let lead_id = LeadId::new();
//! let call_id = CallId::synthesize();
//! let phone = PhoneNumber::normalize("+1 (555) 123-4567");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// Re-export commonly used types
pub use ulid::Ulid;
pub use uuid::Uuid;

/// Standard result type for call-keeper operations
pub type CallKeeperResult<T> = Result<T, CallKeeperError>;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// External call identifier supplied by the telephony provider.
///
/// This is the idempotency key for webhook ingestion: a call with a given
/// identifier is recorded at most once, no matter how many times the provider
/// delivers the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Create a call ID from a provider-supplied value with validation.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "call_id".to_string(),
            });
        }

        if trimmed.len() > 128 {
            return Err(ValidationError::TooLong {
                field: "call_id".to_string(),
                max_length: 128,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Synthesize a call ID for payloads that did not carry one.
    ///
    /// ULIDs are time-ordered, so synthesized IDs sort next to the calls
    /// that arrived around the same moment.
    pub fn synthesize() -> Self {
        Self(format!("call-{}", Ulid::new()))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CallId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Unique identifier for lead records.
///
/// Uses ULID for lexicographic sorting and global uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(Ulid);

impl LeadId {
    /// Generate a new unique lead ID
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Get string representation of lead ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeadId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = s.parse::<Ulid>().map_err(|_| ParseError::InvalidFormat {
            expected: "ULID format".to_string(),
            actual: s.to_string(),
        })?;
        Ok(Self(ulid))
    }
}

/// Identifier for tracing requests across system boundaries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate new correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get string representation
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phone Numbers
// ============================================================================

/// Literal used when a payload carried no usable caller phone number.
///
/// Leads for such calls are pooled under this value; they are not
/// deduplicated further.
pub const UNKNOWN_PHONE: &str = "unknown";

static PHONE_SANITIZER: OnceLock<regex::Regex> = OnceLock::new();

/// Normalized caller phone number, the natural deduplication key for leads.
///
/// Normalization strips formatting characters (spaces, dashes, parentheses,
/// dots) and keeps digits plus a single leading `+`. Two renderings of the
/// same number (`"+1 (555) 123-4567"` and `"+15551234567"`) normalize to the
/// same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize a raw phone string.
    ///
    /// Returns `None` when nothing phone-like remains after stripping
    /// formatting characters.
    pub fn normalize(raw: &str) -> Option<Self> {
        let sanitizer = PHONE_SANITIZER
            .get_or_init(|| regex::Regex::new(r"[^0-9+]").expect("static phone pattern"));
        let stripped = sanitizer.replace_all(raw, "");

        let has_plus = stripped.starts_with('+');
        let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.is_empty() || digits.len() > 32 {
            return None;
        }

        if has_plus {
            Some(Self(format!("+{}", digits)))
        } else {
            Some(Self(digits))
        }
    }

    /// The placeholder phone number for events without a caller number.
    pub fn unknown() -> Self {
        Self(UNKNOWN_PHONE.to_string())
    }

    /// Whether this is the placeholder value rather than a real number.
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_PHONE
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// UTC timestamp with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse timestamp from RFC3339 / ISO-8601 string
    pub fn from_rfc3339(s: &str) -> Result<Self, ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|_| ParseError::InvalidFormat {
                expected: "RFC3339 datetime".to_string(),
                actual: s.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Create timestamp from whole epoch seconds
    pub fn from_epoch_seconds(seconds: i64) -> Result<Self, ParseError> {
        DateTime::from_timestamp(seconds, 0)
            .map(Self)
            .ok_or_else(|| ParseError::InvalidFormat {
                expected: "epoch seconds in datetime range".to_string(),
                actual: seconds.to_string(),
            })
    }

    /// Create timestamp from fractional epoch seconds
    pub fn from_epoch_seconds_f64(seconds: f64) -> Result<Self, ParseError> {
        if !seconds.is_finite() {
            return Err(ParseError::InvalidFormat {
                expected: "finite epoch seconds".to_string(),
                actual: seconds.to_string(),
            });
        }
        let whole = seconds.trunc() as i64;
        let nanos = (seconds.fract().abs() * 1_000_000_000.0) as u32;
        DateTime::from_timestamp(whole, nanos)
            .map(Self)
            .ok_or_else(|| ParseError::InvalidFormat {
                expected: "epoch seconds in datetime range".to_string(),
                actual: seconds.to_string(),
            })
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Whole seconds since the Unix epoch
    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Add seconds to timestamp
    pub fn add_seconds(&self, seconds: u64) -> Self {
        let duration = chrono::Duration::seconds(seconds as i64);
        Self(self.0 + duration)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

// ============================================================================
// Domain Enumerations
// ============================================================================

/// Lifecycle status of a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    InProgress,
    Booked,
    Closed,
    Lost,
}

impl LeadStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Booked => "booked",
            Self::Closed => "closed",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "booked" => Ok(Self::Booked),
            "closed" => Ok(Self::Closed),
            "lost" => Ok(Self::Lost),
            _ => Err(ParseError::InvalidFormat {
                expected: "new, in_progress, booked, closed, or lost".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

/// Sentiment label derived from a call transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(ParseError::InvalidFormat {
                expected: "positive, neutral, or negative".to_string(),
                actual: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// High-level error categorization for retry and alerting decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Temporary failures that should be retried
    Transient,
    /// Permanent failures that won't succeed on retry
    Permanent,
    /// Security-related failures requiring immediate attention
    Security,
    /// Configuration errors preventing startup
    Configuration,
}

/// Error type for input validation failures
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    TooLong { field: String, max_length: usize },
}

/// Error type for string parsing failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid format: expected {expected}, got '{actual}'")]
    InvalidFormat { expected: String, actual: String },
}

/// Top-level error type for call-keeper operations
#[derive(Debug, thiserror::Error)]
pub enum CallKeeperError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] store::StorageError),

    #[error("Resource not found: {resource} '{id}'")]
    NotFound { resource: String, id: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CallKeeperError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(storage_error) => storage_error.is_transient(),
            Self::ExternalService { .. } => true,
            Self::Internal { .. } => true,
            Self::Validation(_) => false,
            Self::Parse(_) => false,
            Self::NotFound { .. } => false,
            Self::Configuration { .. } => false,
        }
    }

    /// Get error category for monitoring and alerting
    pub fn error_category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Permanent,
            Self::Parse(_) => ErrorCategory::Permanent,
            Self::NotFound { .. } => ErrorCategory::Permanent,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Storage(storage_error) => {
                if storage_error.is_transient() {
                    ErrorCategory::Transient
                } else {
                    ErrorCategory::Permanent
                }
            }
            Self::ExternalService { .. } => ErrorCategory::Transient,
            Self::Internal { .. } => ErrorCategory::Transient,
        }
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Webhook processing module for provider call events
pub mod webhook;

/// Reconciliation module turning canonical events into Lead/Call state
pub mod reconcile;

/// Document store trait abstractions
pub mod store;

/// Transcript summarization collaborator
pub mod summarize;

/// Store adapters module for infrastructure implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{FilesystemStore, InMemoryStore};
pub use reconcile::{Call, IngestOutcome, Lead, ReconcileEngine, ReconcileError};
pub use store::{CallQuery, CallStore, LeadQuery, LeadStore, Page, StorageError};
pub use summarize::{CallSummary, DisabledSummarizer, Summarizer, SummarizerError};
pub use webhook::{
    CallEventProcessor, CanonicalCallEvent, IngestPipeline, SecretString, SignatureError,
    SignatureVerifier, WebhookError, WebhookRequest,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
