//! Tests for payload normalization.
//!
//! Covers the synonym resolution order, transcript flattening, fallback
//! values, and the derived end timestamp.

use super::*;
use serde_json::json;

// ============================================================================
// Field resolution tests
// ============================================================================

mod field_resolution_tests {
    use super::*;

    /// snake_case, camelCase, and bare synonyms all resolve to the same
    /// canonical call id.
    #[test]
    fn test_call_id_synonyms() {
        for payload in [
            json!({"call_id": "c1"}),
            json!({"callId": "c1"}),
            json!({"id": "c1"}),
        ] {
            let event = normalize(payload).unwrap();
            assert_eq!(event.call_id.as_str(), "c1");
        }
    }

    /// Earlier candidates win over later ones.
    #[test]
    fn test_call_id_resolution_order() {
        let event = normalize(json!({"id": "later", "call_id": "first"})).unwrap();
        assert_eq!(event.call_id.as_str(), "first");
    }

    /// Empty and null candidates fall through to the next synonym.
    #[test]
    fn test_empty_candidates_fall_through() {
        let event = normalize(json!({"call_id": "", "callId": null, "id": "c3"})).unwrap();
        assert_eq!(event.call_id.as_str(), "c3");
    }

    /// A payload with no id at all gets a synthesized, non-empty id.
    #[test]
    fn test_missing_call_id_synthesized() {
        let event = normalize(json!({"phone_number": "5551234567"})).unwrap();
        assert!(!event.call_id.as_str().is_empty());
        assert!(event.call_id.as_str().starts_with("call-"));
        assert!(event.validate().is_ok());
    }

    /// Numeric ids are coerced to strings.
    #[test]
    fn test_numeric_call_id_coerced() {
        let event = normalize(json!({"call_id": 12345})).unwrap();
        assert_eq!(event.call_id.as_str(), "12345");
    }

    /// All phone synonyms resolve and normalize.
    #[test]
    fn test_phone_synonyms() {
        for payload in [
            json!({"call_id": "c1", "caller_phone_number": "+1 (555) 123-4567"}),
            json!({"call_id": "c1", "callerPhoneNumber": "+1 (555) 123-4567"}),
            json!({"call_id": "c1", "phone_number": "+1 (555) 123-4567"}),
            json!({"call_id": "c1", "phoneNumber": "+1 (555) 123-4567"}),
            json!({"call_id": "c1", "from": "+1 (555) 123-4567"}),
        ] {
            let event = normalize(payload).unwrap();
            assert_eq!(event.caller_phone.as_str(), "+15551234567");
        }
    }

    /// A missing phone produces the "unknown" placeholder instead of failing.
    #[test]
    fn test_missing_phone_becomes_unknown() {
        let event = normalize(json!({"call_id": "c1"})).unwrap();
        assert!(event.caller_phone.is_unknown());
    }

    /// Name and audio URL resolve across their synonyms; absence is None.
    #[test]
    fn test_optional_fields() {
        let event = normalize(json!({
            "call_id": "c1",
            "callerName": "Alice",
            "recording_url": "https://cdn.example.com/rec.mp3",
        }))
        .unwrap();
        assert_eq!(event.caller_name.as_deref(), Some("Alice"));
        assert_eq!(
            event.audio_url.as_deref(),
            Some("https://cdn.example.com/rec.mp3")
        );

        let bare = normalize(json!({"call_id": "c1"})).unwrap();
        assert_eq!(bare.caller_name, None);
        assert_eq!(bare.audio_url, None);
        assert_eq!(bare.duration_seconds, None);
        assert_eq!(bare.ended_at, None);
    }

    /// Unknown fields are preserved in the raw payload, not rejected.
    #[test]
    fn test_unknown_fields_passthrough() {
        let payload = json!({
            "call_id": "c1",
            "someVendorExtension": {"nested": [1, 2, 3]},
        });
        let event = normalize(payload.clone()).unwrap();
        assert_eq!(event.raw_payload, payload);
    }

    /// Non-object payloads are a hard failure.
    #[test]
    fn test_non_object_payload_rejected() {
        for payload in [json!([1, 2, 3]), json!("just a string"), json!(42)] {
            let result = normalize(payload);
            assert!(matches!(
                result,
                Err(NormalizationError::MalformedPayload { .. })
            ));
        }
    }

    /// A call id beyond the length limit is rejected, not truncated.
    #[test]
    fn test_oversized_call_id_rejected() {
        let result = normalize(json!({"call_id": "x".repeat(200)}));
        assert!(matches!(
            result,
            Err(NormalizationError::InvalidFieldFormat { .. })
        ));
    }
}

// ============================================================================
// Timestamp and duration tests
// ============================================================================

mod timestamp_tests {
    use super::*;

    /// Epoch-second timestamps parse numerically.
    #[test]
    fn test_epoch_timestamp() {
        let event = normalize(json!({"call_id": "c1", "timestamp": 1_700_000_000})).unwrap();
        assert_eq!(event.occurred_at.epoch_seconds(), 1_700_000_000);
    }

    /// ISO-8601 string timestamps parse as well.
    #[test]
    fn test_iso8601_timestamp() {
        let event = normalize(json!({
            "call_id": "c1",
            "created_at": "2023-11-14T22:13:20Z",
        }))
        .unwrap();
        assert_eq!(event.occurred_at.epoch_seconds(), 1_700_000_000);
    }

    /// duration=120 on timestamp=1700000000 derives endedAt=1700000120.
    #[test]
    fn test_ended_at_derivation() {
        let event = normalize(json!({
            "call_id": "c1",
            "timestamp": 1_700_000_000,
            "duration": 120,
        }))
        .unwrap();
        assert_eq!(event.duration_seconds, Some(120));
        assert_eq!(event.ended_at.unwrap().epoch_seconds(), 1_700_000_120);
    }

    /// The derivation also works with the camelCase duration synonym and a
    /// string timestamp.
    #[test]
    fn test_ended_at_with_synonyms() {
        let event = normalize(json!({
            "call_id": "c1",
            "createdAt": "2023-11-14T22:13:20Z",
            "durationSeconds": 60,
        }))
        .unwrap();
        assert_eq!(event.ended_at.unwrap().epoch_seconds(), 1_700_000_060);
    }

    /// Without a duration there is no derived end timestamp.
    #[test]
    fn test_no_duration_no_ended_at() {
        let event = normalize(json!({"call_id": "c1", "timestamp": 1_700_000_000})).unwrap();
        assert_eq!(event.ended_at, None);
    }

    /// Numeric-string durations are tolerated.
    #[test]
    fn test_string_duration() {
        let event = normalize(json!({"call_id": "c1", "duration": "90"})).unwrap();
        assert_eq!(event.duration_seconds, Some(90));
    }

    /// Negative durations are dropped rather than wrapping around.
    #[test]
    fn test_negative_duration_dropped() {
        let event = normalize(json!({"call_id": "c1", "duration": -5})).unwrap();
        assert_eq!(event.duration_seconds, None);
        assert_eq!(event.ended_at, None);
    }
}

// ============================================================================
// Transcript tests
// ============================================================================

mod transcript_tests {
    use super::*;

    /// A plain string transcript is used verbatim.
    #[test]
    fn test_string_transcript_verbatim() {
        let event = normalize(json!({
            "call_id": "c1",
            "transcript": "Hello, I'd like to book a trip.",
        }))
        .unwrap();
        assert_eq!(event.transcript, "Hello, I'd like to book a trip.");
    }

    /// An array of strings is joined with single spaces.
    #[test]
    fn test_string_array_joined_with_spaces() {
        let event = normalize(json!({
            "call_id": "c1",
            "transcript": ["Hi", "there"],
        }))
        .unwrap();
        assert_eq!(event.transcript, "Hi there");
    }

    /// An array of speaker turns becomes one "speaker: text" line each.
    #[test]
    fn test_speaker_turns_joined_with_newlines() {
        let event = normalize(json!({
            "call_id": "c1",
            "transcript": [
                {"speaker": "Agent", "text": "Hello"},
                {"speaker": "User", "text": "Hi"},
            ],
        }))
        .unwrap();
        assert_eq!(event.transcript, "Agent: Hello\nUser: Hi");
    }

    /// Absent or empty transcripts normalize to the empty string.
    #[test]
    fn test_absent_transcript_is_empty() {
        let event = normalize(json!({"call_id": "c1"})).unwrap();
        assert_eq!(event.transcript, "");

        let event = normalize(json!({"call_id": "c1", "transcript": []})).unwrap();
        assert_eq!(event.transcript, "");
    }

    /// A turn without a speaker still produces a line.
    #[test]
    fn test_turn_without_speaker() {
        let event = normalize(json!({
            "call_id": "c1",
            "transcript": [{"text": "Hello?"}],
        }))
        .unwrap();
        assert_eq!(event.transcript, "unknown: Hello?");
    }
}
