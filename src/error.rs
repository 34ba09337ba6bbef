//! Error types for Clarity onboarding.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Identity provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures reported by an identity provider adapter.
///
/// Adapters translate their vendor-specific error codes into this closed set
/// so the onboarding flow never matches on provider string constants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The email or credential already belongs to a different identity.
    #[error("Credential already in use")]
    CredentialConflict,

    /// The provider considers the password too weak.
    #[error("Weak password")]
    WeakCredential,

    /// The provider's own password policy rejected the password.
    #[error("Password does not meet provider requirements")]
    PasswordRequirementsUnmet,

    /// Platform or app-integrity attestation rejected the request.
    #[error("Attestation failed: {0}")]
    AttestationFailure(String),

    /// The operation needs a signed-in identity and none exists.
    #[error("No authenticated identity")]
    NoCurrentIdentity,

    #[error("{message}")]
    Other { code: Option<String>, message: String },
}

impl ProviderError {
    /// Map a Firebase-style `auth/...` error code to the closed error set.
    ///
    /// Meant for adapters sitting on top of a hosted identity SDK.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "auth/email-already-in-use"
            | "auth/credential-already-in-use"
            | "auth/account-exists-with-different-credential"
            | "auth/provider-already-linked" => Self::CredentialConflict,
            "auth/weak-password" => Self::WeakCredential,
            "auth/password-does-not-meet-requirements" => Self::PasswordRequirementsUnmet,
            c if c.contains("app-check") => Self::AttestationFailure(message),
            "auth/no-current-user" | "auth/user-token-expired" => Self::NoCurrentIdentity,
            _ => Self::Other {
                code: Some(code.to_string()),
                message,
            },
        }
    }
}

/// Profile store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
