//! Payload normalization.
//!
//! The upstream provider has shipped the same logical fields under several
//! names over time (snake_case, camelCase, and outright synonyms). Rather
//! than chase schema versions, normalization resolves each canonical field
//! from an explicit ordered list of synonym candidates, first usable value
//! wins. Unrecognized fields are never rejected; the full payload is carried
//! through verbatim for audit.

use serde_json::Value;
use tracing::warn;

use crate::{CallId, PhoneNumber, Timestamp, ValidationError};

// ============================================================================
// Synonym Tables
// ============================================================================

const CALL_ID_FIELDS: &[&str] = &["call_id", "callId", "id"];
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "created_at", "createdAt"];
const PHONE_FIELDS: &[&str] = &[
    "caller_phone_number",
    "callerPhoneNumber",
    "phone_number",
    "phoneNumber",
    "from",
];
const NAME_FIELDS: &[&str] = &["caller_name", "callerName", "name"];
const AUDIO_URL_FIELDS: &[&str] = &["audio_url", "audioUrl", "recording_url", "recordingUrl"];
const DURATION_FIELDS: &[&str] = &["duration", "durationSeconds"];

// ============================================================================
// Canonical Event
// ============================================================================

/// The schema-stable representation of one inbound call event.
///
/// Everything downstream of the webhook boundary (reconciliation, storage,
/// the REST surface) works from this shape; provider schema drift stops here.
#[derive(Debug, Clone)]
pub struct CanonicalCallEvent {
    /// External provider call identifier; the idempotency key.
    pub call_id: CallId,
    /// When the call happened according to the provider (or receipt time).
    pub occurred_at: Timestamp,
    /// Normalized caller phone, or the `"unknown"` placeholder.
    pub caller_phone: PhoneNumber,
    pub caller_name: Option<String>,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<u64>,
    /// Flattened transcript text; empty when the payload carried none.
    pub transcript: String,
    /// `occurred_at + duration` when both were present and parseable.
    pub ended_at: Option<Timestamp>,
    /// The original payload, preserved verbatim for audit.
    pub raw_payload: Value,
}

impl CanonicalCallEvent {
    /// Guard invoked before reconciliation: every processed event must carry
    /// a non-empty call identifier.
    ///
    /// [`normalize`] synthesizes an identifier when the payload has none, so
    /// this can only fail if an event was constructed by other means.
    pub fn validate(&self) -> Result<(), NormalizationError> {
        if self.call_id.as_str().is_empty() {
            return Err(NormalizationError::MissingRequiredField {
                field: "call_id".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors during payload normalization
#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("Invalid field format: {field} - {message}")]
    InvalidFieldFormat { field: String, message: String },
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a parsed webhook payload into a [`CanonicalCallEvent`].
///
/// # Errors
///
/// Returns [`NormalizationError`] when the payload is not a JSON object or a
/// resolved call identifier fails validation. Absent fields never fail:
/// every canonical field has a documented fallback.
pub fn normalize(payload: Value) -> Result<CanonicalCallEvent, NormalizationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| NormalizationError::MalformedPayload {
            message: "payload must be a JSON object".to_string(),
        })?;

    let call_id = match first_usable(obj, CALL_ID_FIELDS).and_then(stringish) {
        Some((field, value)) => {
            CallId::new(value).map_err(|e| invalid_field(field, e))?
        }
        None => CallId::synthesize(),
    };

    let occurred_at = match first_usable(obj, TIMESTAMP_FIELDS) {
        Some((field, value)) => parse_timestamp(value).unwrap_or_else(|| {
            warn!(field, "Unparseable event timestamp, falling back to receipt time");
            Timestamp::now()
        }),
        None => Timestamp::now(),
    };

    let caller_phone = match first_usable(obj, PHONE_FIELDS).and_then(stringish) {
        Some((field, value)) => PhoneNumber::normalize(&value).unwrap_or_else(|| {
            warn!(field, "Caller phone did not normalize, lead matching degraded");
            PhoneNumber::unknown()
        }),
        None => {
            warn!(call_id = %call_id, "Payload carried no caller phone, lead matching degraded");
            PhoneNumber::unknown()
        }
    };

    let caller_name = first_usable(obj, NAME_FIELDS)
        .and_then(stringish)
        .map(|(_, value)| value);

    let audio_url = first_usable(obj, AUDIO_URL_FIELDS)
        .and_then(stringish)
        .map(|(_, value)| value);

    let duration_seconds = first_usable(obj, DURATION_FIELDS).and_then(|(field, value)| {
        let parsed = parse_duration(value);
        if parsed.is_none() {
            warn!(field, "Unparseable call duration, dropping it");
        }
        parsed
    });

    let transcript = normalize_transcript(obj.get("transcript"));

    let ended_at = duration_seconds.map(|secs| occurred_at.add_seconds(secs));

    Ok(CanonicalCallEvent {
        call_id,
        occurred_at,
        caller_phone,
        caller_name,
        audio_url,
        duration_seconds,
        transcript,
        ended_at,
        raw_payload: payload,
    })
}

fn invalid_field(field: &'static str, error: ValidationError) -> NormalizationError {
    NormalizationError::InvalidFieldFormat {
        field: field.to_string(),
        message: error.to_string(),
    }
}

/// First candidate field that is present and carries a usable value.
///
/// Null, empty strings, and whitespace-only strings do not count as usable;
/// resolution falls through to the next synonym.
fn first_usable<'a>(
    obj: &'a serde_json::Map<String, Value>,
    fields: &'static [&'static str],
) -> Option<(&'static str, &'a Value)> {
    for &field in fields {
        match obj.get(field) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.trim().is_empty() => continue,
            Some(value) => return Some((field, value)),
        }
    }
    None
}

/// Coerce a scalar JSON value into a trimmed string.
///
/// Numeric values are accepted because providers have shipped numeric call
/// ids and phone numbers.
fn stringish<'a>((field, value): (&'static str, &'a Value)) -> Option<(&'static str, String)> {
    match value {
        Value::String(s) => Some((field, s.trim().to_string())),
        Value::Number(n) => Some((field, n.to_string())),
        _ => None,
    }
}

/// Parse a timestamp expressed as epoch seconds (integer or float) or as an
/// ISO-8601 / RFC3339 string.
fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    match value {
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                Timestamp::from_epoch_seconds(secs).ok()
            } else {
                n.as_f64()
                    .and_then(|secs| Timestamp::from_epoch_seconds_f64(secs).ok())
            }
        }
        Value::String(s) => Timestamp::from_rfc3339(s.trim()).ok(),
        _ => None,
    }
}

/// Parse a duration in seconds from an integer, float, or numeric string.
fn parse_duration(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(secs) = n.as_u64() {
                Some(secs)
            } else {
                match n.as_f64() {
                    Some(secs) if secs.is_finite() && secs >= 0.0 => Some(secs.round() as u64),
                    _ => None,
                }
            }
        }
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Flatten the transcript field into one text block.
///
/// Accepted shapes:
/// - a single string, used verbatim
/// - an array of plain strings, joined with single spaces
/// - an array of `{speaker, text}` objects, one `"speaker: text"` line each
///
/// Anything else (including absence) normalizes to the empty string.
fn normalize_transcript(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => {
            if items.iter().all(|item| item.is_string()) {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            } else {
                items
                    .iter()
                    .map(transcript_line)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        _ => String::new(),
    }
}

/// One dialogue line: strings verbatim, objects as `"speaker: text"`.
fn transcript_line(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(turn) => {
            let speaker = turn
                .get("speaker")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let text = turn.get("text").and_then(|v| v.as_str()).unwrap_or("");
            format!("{}: {}", speaker, text)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
