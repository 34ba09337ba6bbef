//! The `IdentityProvider` trait: capabilities the onboarding flow needs from
//! a hosted identity service.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use secrecy::SecretString;

use super::model::{FederatedProvider, Identity};
use crate::error::ProviderError;

/// Session-change notifications. Yields the current identity (or `None` when
/// signed out) once on subscribe and again on every sign-in / sign-out.
/// Dropping the stream unsubscribes.
pub type SessionStream = Pin<Box<dyn Stream<Item = Option<Identity>> + Send>>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Subscribe to session changes.
    fn subscribe(&self) -> SessionStream;

    /// Create (and sign in) a new identity with an email/password credential.
    async fn create_with_email_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError>;

    /// Attach an email/password credential to an existing identity. The
    /// identity keeps its id and phone number.
    async fn link_email_password(
        &self,
        identity: &Identity,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError>;

    /// Interactive federated sign-in. Creates the identity if needed.
    async fn sign_in_federated(&self, provider: FederatedProvider)
    -> Result<Identity, ProviderError>;

    /// Interactive federated credential link against an existing identity.
    async fn link_federated(
        &self,
        identity: &Identity,
        provider: FederatedProvider,
    ) -> Result<Identity, ProviderError>;

    /// Set the display name on an identity.
    async fn update_display_name(
        &self,
        identity_id: &str,
        display_name: &str,
    ) -> Result<(), ProviderError>;
}
