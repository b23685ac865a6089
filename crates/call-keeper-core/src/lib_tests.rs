//! Tests for core domain types.

use super::*;

// ============================================================================
// CallId tests
// ============================================================================

mod call_id_tests {
    use super::*;

    #[test]
    fn test_valid_call_id() {
        let id = CallId::new("conv_abc123").unwrap();
        assert_eq!(id.as_str(), "conv_abc123");
    }

    #[test]
    fn test_call_id_is_trimmed() {
        let id = CallId::new("  conv-1  ").unwrap();
        assert_eq!(id.as_str(), "conv-1");
    }

    #[test]
    fn test_empty_call_id_rejected() {
        assert!(matches!(
            CallId::new(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            CallId::new("   "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_oversized_call_id_rejected() {
        assert!(matches!(
            CallId::new("x".repeat(129)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_synthesized_ids_are_unique_and_prefixed() {
        let a = CallId::synthesize();
        let b = CallId::synthesize();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("call-"));
    }
}

// ============================================================================
// LeadId tests
// ============================================================================

mod lead_id_tests {
    use super::*;

    #[test]
    fn test_lead_id_round_trips_through_string() {
        let id = LeadId::new();
        let parsed: LeadId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_invalid_lead_id_rejected() {
        let result: Result<LeadId, _> = "not-a-ulid!".parse();
        assert!(result.is_err());
    }
}

// ============================================================================
// PhoneNumber tests
// ============================================================================

mod phone_number_tests {
    use super::*;

    /// Different renderings of the same number normalize identically.
    #[test]
    fn test_formatting_stripped() {
        let variants = [
            "+1 (555) 123-4567",
            "+1.555.123.4567",
            "+1 555 123 4567",
            "+15551234567",
        ];
        for raw in variants {
            let phone = PhoneNumber::normalize(raw).unwrap();
            assert_eq!(phone.as_str(), "+15551234567", "from '{}'", raw);
        }
    }

    #[test]
    fn test_plus_only_kept_when_leading() {
        let phone = PhoneNumber::normalize("555+123+4567").unwrap();
        assert_eq!(phone.as_str(), "5551234567");
    }

    #[test]
    fn test_domestic_number_without_plus() {
        let phone = PhoneNumber::normalize("(555) 123-4567").unwrap();
        assert_eq!(phone.as_str(), "5551234567");
    }

    #[test]
    fn test_nothing_phone_like_is_none() {
        assert!(PhoneNumber::normalize("").is_none());
        assert!(PhoneNumber::normalize("anonymous").is_none());
        assert!(PhoneNumber::normalize("+").is_none());
    }

    #[test]
    fn test_unknown_placeholder() {
        let phone = PhoneNumber::unknown();
        assert!(phone.is_unknown());
        assert_eq!(phone.as_str(), UNKNOWN_PHONE);

        let real = PhoneNumber::normalize("5551234567").unwrap();
        assert!(!real.is_unknown());
    }
}

// ============================================================================
// Timestamp tests
// ============================================================================

mod timestamp_tests {
    use super::*;

    #[test]
    fn test_epoch_round_trip() {
        let ts = Timestamp::from_epoch_seconds(1_700_000_000).unwrap();
        assert_eq!(ts.epoch_seconds(), 1_700_000_000);
    }

    #[test]
    fn test_rfc3339_round_trip() {
        let ts = Timestamp::from_rfc3339("2023-11-14T22:13:20Z").unwrap();
        assert_eq!(ts.epoch_seconds(), 1_700_000_000);
        assert!(ts.to_rfc3339().starts_with("2023-11-14T22:13:20"));
    }

    #[test]
    fn test_invalid_rfc3339_rejected() {
        assert!(Timestamp::from_rfc3339("last tuesday").is_err());
    }

    #[test]
    fn test_fractional_epoch_seconds() {
        let ts = Timestamp::from_epoch_seconds_f64(1_700_000_000.5).unwrap();
        assert_eq!(ts.epoch_seconds(), 1_700_000_000);
        assert!(Timestamp::from_epoch_seconds_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_add_seconds() {
        let ts = Timestamp::from_epoch_seconds(1_700_000_000).unwrap();
        assert_eq!(ts.add_seconds(120).epoch_seconds(), 1_700_000_120);
    }

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::from_epoch_seconds(1_700_000_000).unwrap();
        let later = Timestamp::from_epoch_seconds(1_700_000_001).unwrap();
        assert!(earlier < later);
    }
}

// ============================================================================
// Enum parsing tests
// ============================================================================

mod enum_tests {
    use super::*;

    #[test]
    fn test_lead_status_round_trip() {
        for status in [
            LeadStatus::New,
            LeadStatus::InProgress,
            LeadStatus::Booked,
            LeadStatus::Closed,
            LeadStatus::Lost,
        ] {
            let parsed: LeadStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_unknown_lead_status_rejected() {
        let result: Result<LeadStatus, _> = "vaporized".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_sentiment_round_trip() {
        for sentiment in [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative] {
            let parsed: Sentiment = sentiment.as_str().parse().unwrap();
            assert_eq!(parsed, sentiment);
        }
    }

    #[test]
    fn test_sentiment_serde_is_lowercase() {
        let json = serde_json::to_string(&Sentiment::Positive).unwrap();
        assert_eq!(json, r#""positive""#);

        let json = serde_json::to_string(&LeadStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
    }
}

// ============================================================================
// Error classification tests
// ============================================================================

mod error_tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let storage = CallKeeperError::Storage(store::StorageError::Unavailable {
            message: "down".to_string(),
        });
        assert!(storage.is_transient());
        assert_eq!(storage.error_category(), ErrorCategory::Transient);

        let validation = CallKeeperError::Validation(ValidationError::Required {
            field: "call_id".to_string(),
        });
        assert!(!validation.is_transient());
        assert_eq!(validation.error_category(), ErrorCategory::Permanent);

        let not_found = CallKeeperError::NotFound {
            resource: "lead".to_string(),
            id: "abc".to_string(),
        };
        assert!(!not_found.is_transient());
    }
}
