//! In-memory profile store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::traits::ProfileStore;
use crate::error::StoreError;
use crate::onboarding::model::{ProfileRecord, StoredProfile};

#[derive(Default)]
struct Inner {
    profiles: HashMap<String, StoredProfile>,
    writes: usize,
    reject_next: Option<String>,
}

/// `HashMap`-backed store. Counts writes so callers can check how many
/// upserts happened.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: RwLock<Inner>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upserts attempted.
    pub async fn write_count(&self) -> usize {
        self.inner.read().await.writes
    }

    /// Reject the next upsert with `reason`.
    pub async fn reject_next(&self, reason: &str) {
        self.inner.write().await.reject_next = Some(reason.to_string());
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.writes += 1;
        if let Some(reason) = inner.reject_next.take() {
            return Err(StoreError::Rejected(reason));
        }

        let now = Utc::now();
        inner
            .profiles
            .entry(record.uid.clone())
            .and_modify(|stored| {
                stored.record = record.clone();
                stored.updated_at = now;
            })
            .or_insert_with(|| StoredProfile {
                record: record.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<StoredProfile>, StoreError> {
        Ok(self.inner.read().await.profiles.get(uid).cloned())
    }
}
