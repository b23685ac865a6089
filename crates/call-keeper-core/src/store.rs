//! # Document Store Abstractions
//!
//! Trait seams between the reconciliation engine and the backing document
//! store. The store provides per-document atomic operations but no
//! cross-document transactions; ingestion safety is built on conditional
//! creates instead (see [`CallStore::create`] and [`LeadStore::create`]).

use crate::reconcile::{Call, Lead};
use crate::{CallId, LeadId, LeadStatus, PhoneNumber};
use async_trait::async_trait;

/// Default page size for list operations
pub const DEFAULT_PAGE_SIZE: usize = 50;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from document store operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A conditional create found the document already present.
    ///
    /// This is the signal that closes the duplicate-delivery race: callers
    /// treat it as "someone else won", not as a failure.
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Storage operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Storage not available: {message}")]
    Unavailable { message: String },

    #[error("Stored document is corrupt: {message}")]
    Corrupt { message: String },
}

impl StorageError {
    /// Check if storage error is transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::OperationFailed { .. } => true,
            Self::Unavailable { .. } => true,
            Self::AlreadyExists { .. } => false,
            Self::NotFound { .. } => false,
            Self::Corrupt { .. } => false,
        }
    }
}

// ============================================================================
// Query Types
// ============================================================================

/// Filters and pagination for lead listing
#[derive(Debug, Clone)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub offset: usize,
    pub limit: usize,
}

impl Default for LeadQuery {
    fn default() -> Self {
        Self {
            status: None,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Filters and pagination for call listing
#[derive(Debug, Clone)]
pub struct CallQuery {
    pub lead_id: Option<LeadId>,
    pub include_archived: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Default for CallQuery {
    fn default() -> Self {
        Self {
            lead_id: None,
            include_archived: false,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of list results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching documents before pagination was applied
    pub total: usize,
}

// ============================================================================
// Store Traits
// ============================================================================

/// Interface for lead document persistence
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Look up a lead by its identifier
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, StorageError>;

    /// Look up a lead by its normalized phone number.
    ///
    /// The phone number is the natural deduplication key: the store holds at
    /// most one lead per normalized phone.
    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Lead>, StorageError>;

    /// Create a lead, failing with [`StorageError::AlreadyExists`] when a
    /// lead with the same normalized phone number is already present.
    async fn create(&self, lead: Lead) -> Result<(), StorageError>;

    /// Replace an existing lead document.
    ///
    /// Fails with [`StorageError::NotFound`] when the lead does not exist.
    async fn update(&self, lead: Lead) -> Result<(), StorageError>;

    /// List leads, newest first
    async fn list(&self, query: LeadQuery) -> Result<Page<Lead>, StorageError>;
}

/// Interface for call document persistence
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Look up a call by its external provider identifier
    async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>, StorageError>;

    /// Create a call, failing with [`StorageError::AlreadyExists`] when a
    /// call with the same external identifier is already present.
    ///
    /// The conditional semantics make concurrent duplicate deliveries safe:
    /// exactly one writer wins, the loser observes `AlreadyExists`.
    async fn create(&self, call: Call) -> Result<(), StorageError>;

    /// Replace an existing call document.
    ///
    /// Fails with [`StorageError::NotFound`] when the call does not exist.
    async fn update(&self, call: Call) -> Result<(), StorageError>;

    /// List calls, newest first
    async fn list(&self, query: CallQuery) -> Result<Page<Call>, StorageError>;
}
