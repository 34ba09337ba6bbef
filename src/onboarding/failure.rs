//! Failures surfaced by the onboarding flow.
//!
//! Every error raised while submitting is classified into `FlowError` and
//! shown to the user; nothing escapes the controller.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::password::{self, PasswordRequirement};
use crate::error::{ProviderError, StoreError};

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("email regex is valid"));

/// Local validation failures. No provider call is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    MissingFullName,
    MissingEmail,
    InvalidEmail,
    Password { requirement: PasswordRequirement },
    /// The federated provider returned no email address.
    MissingProviderEmail,
}

impl ValidationError {
    /// Form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingFullName => "fullName",
            Self::MissingEmail | Self::InvalidEmail => "email",
            Self::Password { .. } => "password",
            Self::MissingProviderEmail => "provider",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingFullName => "Please enter your full name.",
            Self::MissingEmail => "Please enter your email address.",
            Self::InvalidEmail => "Please enter a valid email address.",
            Self::Password { requirement } => requirement.violation_message(),
            Self::MissingProviderEmail => {
                "Could not retrieve email from provider. Please try a different method."
            }
        }
    }
}

/// Which submission produced a provider error. Conflict messages differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPath {
    Password,
    Federated,
}

/// Classified, user-facing failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowError {
    Validation { error: ValidationError },
    CredentialConflict { federated: bool },
    WeakCredential,
    PasswordRequirementsUnmet,
    AttestationFailure,
    MissingIdentity,
    ShortcutDisabled,
    Unknown { message: String },
}

impl FlowError {
    pub fn validation(error: ValidationError) -> Self {
        Self::Validation { error }
    }

    /// Classify a provider failure.
    pub fn from_provider(err: ProviderError, path: CredentialPath) -> Self {
        match err {
            ProviderError::CredentialConflict => Self::CredentialConflict {
                federated: path == CredentialPath::Federated,
            },
            ProviderError::WeakCredential => Self::WeakCredential,
            ProviderError::PasswordRequirementsUnmet => Self::PasswordRequirementsUnmet,
            ProviderError::AttestationFailure(_) => Self::AttestationFailure,
            ProviderError::NoCurrentIdentity => Self::MissingIdentity,
            ProviderError::Other { message, .. } => Self::Unknown { message },
        }
    }

    pub fn from_store(err: StoreError) -> Self {
        Self::Unknown {
            message: err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Message shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { error } => error.message().to_string(),
            Self::CredentialConflict { federated: false } => {
                "This email address is already associated with another account.".to_string()
            }
            Self::CredentialConflict { federated: true } => {
                "This social account is already linked to another user.".to_string()
            }
            Self::WeakCredential => {
                "The password is too weak. Please check the requirements.".to_string()
            }
            Self::PasswordRequirementsUnmet => {
                "Password does not meet the security requirements. Please check all criteria."
                    .to_string()
            }
            Self::AttestationFailure => "App Check validation failed. Please ensure your debug \
                 token is configured correctly in the identity provider console."
                .to_string(),
            Self::MissingIdentity => {
                "No authenticated user found. Please sign up again.".to_string()
            }
            Self::ShortcutDisabled => "The developer shortcut is not enabled.".to_string(),
            Self::Unknown { message } if message.is_empty() => {
                "Failed to complete profile. Please try again.".to_string()
            }
            Self::Unknown { message } => message.clone(),
        }
    }
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

/// Validate the email/password form fields, in form order.
pub fn validate_profile_fields(
    full_name: &str,
    email: &str,
    password: &str,
) -> Result<(), ValidationError> {
    if full_name.trim().is_empty() {
        return Err(ValidationError::MissingFullName);
    }
    if email.trim().is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    password::validate(password).map_err(|requirement| ValidationError::Password { requirement })
}
