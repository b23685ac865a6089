//! Response types, query parameters, and supporting types for the API.

use call_keeper_core::{
    Call, CallId, Lead, LeadId, LeadStatus, PhoneNumber, Sentiment, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Webhook Response Types
// ============================================================================

/// Acknowledgement body for the webhook endpoint.
///
/// Success is `{"ok":true}`; an idempotent replay adds
/// `"message":"already processed"`.
#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl IngestAck {
    /// Acknowledgement for a newly recorded call
    pub fn recorded() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    /// Acknowledgement for an idempotent redelivery
    pub fn already_processed() -> Self {
        Self {
            ok: true,
            message: Some("already processed".to_string()),
        }
    }
}

// ============================================================================
// Lead/Call Response Types
// ============================================================================

/// Lead list response
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Call summary for listing; the raw payload and full transcript stay on the
/// detail endpoint.
#[derive(Debug, Serialize)]
pub struct CallSummaryView {
    pub id: CallId,
    pub lead_id: Option<LeadId>,
    pub caller_phone: PhoneNumber,
    pub caller_name: Option<String>,
    pub summary: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub duration_seconds: Option<u64>,
    pub assigned_user_name: Option<String>,
    pub archived: bool,
    pub created_at: Timestamp,
}

impl From<Call> for CallSummaryView {
    fn from(call: Call) -> Self {
        Self {
            id: call.id,
            lead_id: call.lead_id,
            caller_phone: call.caller_phone,
            caller_name: call.caller_name,
            summary: call.summary,
            sentiment: call.sentiment,
            duration_seconds: call.duration_seconds,
            assigned_user_name: call.assigned_user_name,
            archived: call.archived,
            created_at: call.created_at,
        }
    }
}

/// Call list response
#[derive(Debug, Serialize)]
pub struct CallListResponse {
    pub calls: Vec<CallSummaryView>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub checks: HashMap<String, HealthCheckResult>,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: Timestamp,
}

// ============================================================================
// Query Parameter Types
// ============================================================================

/// Parameters for lead listing
#[derive(Debug, Deserialize)]
pub struct LeadListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub status: Option<String>,
}

/// Parameters for call listing
#[derive(Debug, Deserialize)]
pub struct CallListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub lead_id: Option<String>,
    pub include_archived: Option<bool>,
}

// ============================================================================
// Update Request Types
// ============================================================================

/// Agent-side lead edit; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Agent-side call edit; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateCallRequest {
    pub assigned_user_id: Option<String>,
    pub assigned_user_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub archived: Option<bool>,
}

// ============================================================================
// Supporting Types
// ============================================================================

/// Health check result for individual components
#[derive(Debug, Serialize, Clone)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub message: String,
    pub duration_ms: u64,
}

/// Overall health status
#[derive(Debug)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub checks: HashMap<String, HealthCheckResult>,
}

// ============================================================================
// Trait Definitions
// ============================================================================

/// Interface for system health monitoring
#[async_trait::async_trait]
pub trait HealthChecker: Send + Sync {
    /// Basic health check (fast)
    async fn check_health(&self) -> HealthStatus;

    /// Readiness check for load balancers
    async fn check_readiness(&self) -> bool;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Default health checker implementation
pub struct DefaultHealthChecker;

#[async_trait::async_trait]
impl HealthChecker for DefaultHealthChecker {
    async fn check_health(&self) -> HealthStatus {
        let start = std::time::Instant::now();
        let mut checks = HashMap::new();

        // Basic service check - if we can respond, we're alive
        checks.insert(
            "service".to_string(),
            HealthCheckResult {
                healthy: true,
                message: "Service is running".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
            },
        );

        HealthStatus {
            is_healthy: true,
            checks,
        }
    }

    async fn check_readiness(&self) -> bool {
        // If configuration loaded and the router is serving, we are ready to
        // take traffic; store connectivity is surfaced per request instead.
        true
    }
}
