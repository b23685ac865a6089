//! # Filesystem Store Adapter
//!
//! Local filesystem implementation of the lead and call stores for
//! single-node deployments and development.
//!
//! Documents are JSON files: leads keyed by their normalized phone number
//! (which makes the one-lead-per-phone invariant a filesystem guarantee) and
//! calls keyed by their external identifier. Conditional creates map to
//! `O_CREAT|O_EXCL` (`create_new`), so concurrent duplicate writers race at
//! the kernel and exactly one wins.

use crate::reconcile::{Call, Lead};
use crate::store::{CallQuery, CallStore, LeadQuery, LeadStore, Page, StorageError};
use crate::{CallId, LeadId, PhoneNumber};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Filesystem-based document store holding both collections
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create new filesystem store rooted at `base_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the collection directories
    /// cannot be created or accessed.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        for collection in ["leads", "calls"] {
            fs::create_dir_all(base_path.join(collection))
                .await
                .map_err(|e| StorageError::Unavailable {
                    message: format!("Failed to create {} directory: {}", collection, e),
                })?;
        }

        Ok(Self { base_path })
    }

    fn lead_path(&self, phone: &PhoneNumber) -> PathBuf {
        self.base_path
            .join("leads")
            .join(format!("{}.json", sanitize_component(phone.as_str())))
    }

    fn call_path(&self, id: &CallId) -> PathBuf {
        self.base_path
            .join("calls")
            .join(format!("{}.json", sanitize_component(id.as_str())))
    }
}

/// Replace characters that are not filesystem-safe with `-`.
///
/// Keeps alphanumerics plus `+`, `.`, `_`, and `-`, which covers normalized
/// phone numbers and well-behaved provider identifiers.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Serialize a document and create its file, failing if it already exists.
async fn create_document<T: serde::Serialize>(
    path: &Path,
    collection: &str,
    id: &str,
    document: &T,
) -> Result<(), StorageError> {
    let json =
        serde_json::to_string_pretty(document).map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to serialize document: {}", e),
        })?;

    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(StorageError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Err(e) => {
            return Err(StorageError::OperationFailed {
                message: format!("Failed to create document: {}", e),
            });
        }
    };

    file.write_all(json.as_bytes())
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to write document: {}", e),
        })?;
    file.flush()
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to flush document: {}", e),
        })?;

    Ok(())
}

/// Overwrite an existing document via the write-temp-then-rename pattern so
/// readers never observe a partial file.
async fn replace_document<T: serde::Serialize>(
    path: &Path,
    collection: &str,
    id: &str,
    document: &T,
) -> Result<(), StorageError> {
    if !path.exists() {
        return Err(StorageError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }

    let json =
        serde_json::to_string_pretty(document).map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to serialize document: {}", e),
        })?;

    let temp_path = path.with_extension("tmp");
    let mut file =
        fs::File::create(&temp_path)
            .await
            .map_err(|e| StorageError::OperationFailed {
                message: format!("Failed to create temp file: {}", e),
            })?;

    file.write_all(json.as_bytes())
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to write document: {}", e),
        })?;
    file.flush()
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to flush document: {}", e),
        })?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to rename temp file: {}", e),
        })?;

    Ok(())
}

/// Read and parse a document, `None` when the file does not exist.
async fn read_document<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, StorageError> {
    let json = match fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StorageError::OperationFailed {
                message: format!("Failed to read document: {}", e),
            });
        }
    };

    let document = serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
        message: format!("{}: {}", path.display(), e),
    })?;

    Ok(Some(document))
}

/// Read every document in a collection directory.
async fn read_collection<T: serde::de::DeserializeOwned>(
    dir: &Path,
) -> Result<Vec<T>, StorageError> {
    let mut documents = Vec::new();

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to read collection directory: {}", e),
        })?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::OperationFailed {
            message: format!("Failed to read directory entry: {}", e),
        })?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(document) = read_document(&path).await? {
            documents.push(document);
        }
    }

    Ok(documents)
}

#[async_trait]
impl LeadStore for FilesystemStore {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, StorageError> {
        // Lead files are keyed by phone; id lookup scans the collection.
        let leads: Vec<Lead> = read_collection(&self.base_path.join("leads")).await?;
        Ok(leads.into_iter().find(|lead| lead.id == *id))
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Lead>, StorageError> {
        read_document(&self.lead_path(phone)).await
    }

    async fn create(&self, lead: Lead) -> Result<(), StorageError> {
        let path = self.lead_path(&lead.phone);
        create_document(&path, "leads", lead.phone.as_str(), &lead).await
    }

    async fn update(&self, lead: Lead) -> Result<(), StorageError> {
        let path = self.lead_path(&lead.phone);
        replace_document(&path, "leads", lead.phone.as_str(), &lead).await
    }

    async fn list(&self, query: LeadQuery) -> Result<Page<Lead>, StorageError> {
        let mut matching: Vec<Lead> = read_collection(&self.base_path.join("leads"))
            .await?
            .into_iter()
            .filter(|lead: &Lead| query.status.map_or(true, |status| lead.status == status))
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
impl CallStore for FilesystemStore {
    async fn find_by_id(&self, id: &CallId) -> Result<Option<Call>, StorageError> {
        read_document(&self.call_path(id)).await
    }

    async fn create(&self, call: Call) -> Result<(), StorageError> {
        let path = self.call_path(&call.id);
        create_document(&path, "calls", call.id.as_str(), &call).await
    }

    async fn update(&self, call: Call) -> Result<(), StorageError> {
        let path = self.call_path(&call.id);
        replace_document(&path, "calls", call.id.as_str(), &call).await
    }

    async fn list(&self, query: CallQuery) -> Result<Page<Call>, StorageError> {
        let mut matching: Vec<Call> = read_collection(&self.base_path.join("calls"))
            .await?
            .into_iter()
            .filter(|call: &Call| query.include_archived || !call.archived)
            .filter(|call| {
                query
                    .lead_id
                    .map_or(true, |lead_id| call.lead_id == Some(lead_id))
            })
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
#[path = "filesystem_store_tests.rs"]
mod tests;
