//! `ProfileStore` trait: the document store the onboarding flow writes to.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::onboarding::model::{ProfileRecord, StoredProfile};

/// Backend-agnostic profile store.
///
/// The upsert is the trusted server-side write made once onboarding
/// completes. Last write wins.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert or overwrite the profile keyed by `record.uid`.
    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<(), StoreError>;

    /// Read a profile back by identity id.
    async fn get_profile(&self, uid: &str) -> Result<Option<StoredProfile>, StoreError>;
}
