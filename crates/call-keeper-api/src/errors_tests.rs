//! Tests for HTTP error mapping.
//!
//! The webhook contract is strict: 401 for every signature failure, 400 for
//! payload problems, 500 for storage failures, all with `{ok:false,error}`
//! bodies.

use super::*;
use axum::http::StatusCode;
use call_keeper_core::reconcile::ReconcileError;

// ============================================================================
// IngestHandlerError mapping tests
// ============================================================================

mod ingest_error_tests {
    use super::*;

    #[test]
    fn test_signature_failures_map_to_401() {
        let variants = [
            SignatureError::MissingSignature,
            SignatureError::MalformedSignature {
                message: "missing 't=' part".to_string(),
            },
            SignatureError::StaleTimestamp {
                age_seconds: 3600,
                tolerance_seconds: 1800,
            },
            SignatureError::DigestMismatch,
        ];

        for variant in variants {
            let error = IngestHandlerError::from(WebhookError::Signature(variant));
            assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    /// Each signature failure mode keeps its own message so operators can
    /// tell them apart in responses and logs.
    #[test]
    fn test_signature_failure_modes_are_distinguishable() {
        let missing = IngestHandlerError::Unauthorized(SignatureError::MissingSignature);
        let stale = IngestHandlerError::Unauthorized(SignatureError::StaleTimestamp {
            age_seconds: 3600,
            tolerance_seconds: 1800,
        });
        let mismatch = IngestHandlerError::Unauthorized(SignatureError::DigestMismatch);

        let messages = [missing.to_string(), stale.to_string(), mismatch.to_string()];
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b, "failure modes must not share a message");
            }
        }
    }

    #[test]
    fn test_payload_failures_map_to_400() {
        let parse_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error = IngestHandlerError::from(WebhookError::JsonParsing(parse_error));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_failures_map_to_500() {
        let error = IngestHandlerError::from(WebhookError::Reconcile(ReconcileError::Storage(
            StorageError::Unavailable {
                message: "store down".to_string(),
            },
        )));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    /// Error responses carry the `{ok:false,error}` body shape.
    #[tokio::test]
    async fn test_error_body_shape() {
        let error = IngestHandlerError::Unauthorized(SignatureError::MissingSignature);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], serde_json::json!(false));
        assert!(body["error"].as_str().unwrap().contains("missing"));
    }
}

// ============================================================================
// ApiError mapping tests
// ============================================================================

mod api_error_tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let error = ApiError::NotFound {
            resource: "lead".to_string(),
            id: "abc".to_string(),
        };
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_maps_to_400() {
        let response = ApiError::bad_request("invalid lead id").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transient_storage_maps_to_503() {
        let error = ApiError::Storage(StorageError::Unavailable {
            message: "down".to_string(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_permanent_storage_maps_to_500() {
        let error = ApiError::Storage(StorageError::Corrupt {
            message: "bad document".to_string(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
