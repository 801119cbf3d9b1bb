//! Audit history persistence seam.
//!
//! The pipeline persists exactly one record per audit, best-effort: a failed
//! save is logged and never fails the response.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::error::AuditError;
use crate::core::types::AuditRecord;

/// Append-only audit history store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn save(&self, record: AuditRecord) -> Result<(), AuditError>;

    async fn get(&self, id: &str) -> Result<Option<AuditRecord>, AuditError>;

    /// Records for `user_id`, newest first.
    async fn list(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<AuditRecord>, AuditError>;
}

/// In-memory store backing the retrieval endpoints. Suitable for single-node
/// deployments and tests; swap for a database-backed implementation behind
/// the same trait.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn save(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AuditRecord>, AuditError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn list(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Report;

    fn record(id: &str, user: &str) -> AuditRecord {
        AuditRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            content_type: "text".to_string(),
            original_input: "input".to_string(),
            extracted_text: "text".to_string(),
            transcript: String::new(),
            audit_result: Report::error_shell("none", "test", 0),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_get() {
        let store = MemoryStore::new();
        store.save(record("a", "u1")).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.save(record(&format!("r{i}"), "u1")).await.unwrap();
        }
        store.save(record("other", "u2")).await.unwrap();

        let page = store.list("u1", 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "r3");
        assert_eq!(page[1].id, "r2");
    }
}
