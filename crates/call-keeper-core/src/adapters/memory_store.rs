//! # In-Memory Store Implementation
//!
//! Thread-safe in-memory implementation for testing and development.
//! Provides the full [`LeadStore`] and [`CallStore`] interface, including
//! the conditional-create semantics the reconciliation engine relies on.

use crate::reconcile::{Call, Lead};
use crate::store::{CallQuery, CallStore, LeadQuery, LeadStore, Page, StorageError};
use crate::{CallId, LeadId, PhoneNumber};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// In-memory document store holding both collections.
///
/// Uses RwLock for concurrent access with minimal contention; conditional
/// creates take the write lock so the existence check and the insert are one
/// atomic step.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    leads: Arc<RwLock<HashMap<String, Lead>>>,
    calls: Arc<RwLock<HashMap<String, Call>>>,
}

impl InMemoryStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lead documents currently held
    pub fn lead_count(&self) -> usize {
        self.leads.read().unwrap().len()
    }

    /// Number of call documents currently held
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl LeadStore for InMemoryStore {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, StorageError> {
        Ok(self.leads.read().unwrap().get(&id.as_str()).cloned())
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Lead>, StorageError> {
        Ok(self
            .leads
            .read()
            .unwrap()
            .values()
            .find(|lead| &lead.phone == phone)
            .cloned())
    }

    async fn create(&self, lead: Lead) -> Result<(), StorageError> {
        let mut leads = self.leads.write().unwrap();

        // Uniqueness on the normalized phone, checked under the write lock.
        if leads.values().any(|existing| existing.phone == lead.phone) {
            return Err(StorageError::AlreadyExists {
                collection: "leads".to_string(),
                id: lead.phone.as_str().to_string(),
            });
        }

        leads.insert(lead.id.as_str(), lead);
        Ok(())
    }

    async fn update(&self, lead: Lead) -> Result<(), StorageError> {
        let mut leads = self.leads.write().unwrap();
        let key = lead.id.as_str();

        if !leads.contains_key(&key) {
            return Err(StorageError::NotFound {
                collection: "leads".to_string(),
                id: key,
            });
        }

        leads.insert(key, lead);
        Ok(())
    }

    async fn list(&self, query: LeadQuery) -> Result<Page<Lead>, StorageError> {
        let leads = self.leads.read().unwrap();

        let mut matching: Vec<Lead> = leads
            .values()
            .filter(|lead| query.status.map_or(true, |status| lead.status == status))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(Page { items, total })
    }
}

#[async_trait]
impl CallStore for InMemoryStore {
    async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>, StorageError> {
        Ok(self.calls.read().unwrap().get(id.as_str()).cloned())
    }

    async fn create(&self, call: Call) -> Result<(), StorageError> {
        let mut calls = self.calls.write().unwrap();
        let key = call.id.as_str().to_string();

        if calls.contains_key(&key) {
            return Err(StorageError::AlreadyExists {
                collection: "calls".to_string(),
                id: key,
            });
        }

        calls.insert(key, call);
        Ok(())
    }

    async fn update(&self, call: Call) -> Result<(), StorageError> {
        let mut calls = self.calls.write().unwrap();
        let key = call.id.as_str().to_string();

        if !calls.contains_key(&key) {
            return Err(StorageError::NotFound {
                collection: "calls".to_string(),
                id: key,
            });
        }

        calls.insert(key, call);
        Ok(())
    }

    async fn list(&self, query: CallQuery) -> Result<Page<Call>, StorageError> {
        let calls = self.calls.read().unwrap();

        let mut matching: Vec<Call> = calls
            .values()
            .filter(|call| query.include_archived || !call.archived)
            .filter(|call| {
                query
                    .lead_id
                    .map_or(true, |lead_id| call.lead_id == Some(lead_id))
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(Page { items, total })
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
