//! Onboarding data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durable profile written to the document store when onboarding
/// completes. Keyed by identity id; values are stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub phone_number: String,
}

impl ProfileRecord {
    pub fn new(
        uid: impl Into<String>,
        display_name: impl Into<String>,
        email: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            email: email.into(),
            phone_number: phone_number.into(),
        }
    }
}

/// A profile as read back from the store, with bookkeeping timestamps.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProfile {
    #[serde(flatten)]
    pub record: ProfileRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How the visitor entered profile completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingMode {
    /// A phone-verified identity exists; credentials are linked to it.
    PhoneVerified,
    /// Phone verification skipped; a new identity is created on submit.
    Bypass,
}
