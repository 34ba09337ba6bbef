//! Identity records as reported by the identity provider.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Federated sign-in providers offered on the profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederatedProvider {
    Google,
    Apple,
}

impl std::fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Apple => write!(f, "apple"),
        }
    }
}

impl std::str::FromStr for FederatedProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" | "google.com" => Ok(Self::Google),
            "apple" | "apple.com" => Ok(Self::Apple),
            other => Err(format!("unknown federated provider: {other}")),
        }
    }
}

/// Kind of credential attached to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Phone,
    Password,
    Federated(FederatedProvider),
}

/// An account record owned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub credentials: BTreeSet<CredentialKind>,
}

impl Identity {
    /// A new identity with no attributes and no credentials.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            phone_number: None,
            email: None,
            display_name: None,
            credentials: BTreeSet::new(),
        }
    }

    /// Identity created by a completed phone verification.
    pub fn with_phone(id: impl Into<String>, phone_number: impl Into<String>) -> Self {
        let mut identity = Self::new(id);
        identity.phone_number = Some(phone_number.into());
        identity.credentials.insert(CredentialKind::Phone);
        identity
    }

    /// Whether the provider reported a verified phone number.
    pub fn has_verified_phone(&self) -> bool {
        self.phone_number.as_deref().is_some_and(|p| !p.is_empty())
            && self.credentials.contains(&CredentialKind::Phone)
    }

    /// Whether a password or federated credential is attached.
    pub fn has_non_phone_credential(&self) -> bool {
        self.credentials
            .iter()
            .any(|c| !matches!(c, CredentialKind::Phone))
    }

    pub fn has_credential(&self, kind: CredentialKind) -> bool {
        self.credentials.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_identity_is_verified() {
        let identity = Identity::with_phone("uid-1", "+6281234567890");
        assert!(identity.has_verified_phone());
        assert!(!identity.has_non_phone_credential());
    }

    #[test]
    fn empty_phone_is_not_verified() {
        let mut identity = Identity::with_phone("uid-1", "");
        assert!(!identity.has_verified_phone());
        identity.phone_number = None;
        assert!(!identity.has_verified_phone());
    }

    #[test]
    fn federated_counts_as_non_phone() {
        let mut identity = Identity::with_phone("uid-1", "+62811");
        identity
            .credentials
            .insert(CredentialKind::Federated(FederatedProvider::Apple));
        assert!(identity.has_non_phone_credential());
    }

    #[test]
    fn provider_parses_both_spellings() {
        assert_eq!("google".parse::<FederatedProvider>(), Ok(FederatedProvider::Google));
        assert_eq!("apple.com".parse::<FederatedProvider>(), Ok(FederatedProvider::Apple));
        assert!("github".parse::<FederatedProvider>().is_err());
    }

    #[test]
    fn display_matches_serde() {
        for provider in [FederatedProvider::Google, FederatedProvider::Apple] {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(format!("\"{provider}\""), json);
        }
    }

    #[test]
    fn identity_serializes_camel_case() {
        let identity = Identity::with_phone("uid-1", "+62811");
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["phoneNumber"], "+62811");
        assert!(json.get("email").is_none());
        assert_eq!(json["credentials"], serde_json::json!(["phone"]));
    }
}
