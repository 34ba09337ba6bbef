//! In-memory identity provider.
//!
//! Behaves like a hosted identity service closely enough to drive the
//! onboarding flow locally: unique emails, credential linking, federated
//! accounts registered up front in place of an interactive popup, and
//! session-change notifications on sign-in / sign-out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{CredentialKind, FederatedProvider, Identity};
use super::provider::{IdentityProvider, SessionStream};
use crate::error::ProviderError;

/// Shortest password the provider itself accepts.
const PROVIDER_MIN_PASSWORD_LEN: usize = 6;

/// What an interactive federated sign-in would hand back.
#[derive(Debug, Clone)]
struct FederatedAccount {
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Default)]
struct State {
    identities: HashMap<String, Identity>,
    federated: HashMap<FederatedProvider, FederatedAccount>,
    injected_failures: VecDeque<ProviderError>,
    mutations: usize,
}

impl State {
    fn email_owner(&self, email: &str) -> Option<&Identity> {
        self.identities.values().find(|i| {
            i.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
    }

    fn federated_owner(&self, provider: FederatedProvider) -> Option<&Identity> {
        self.identities
            .values()
            .find(|i| i.has_credential(CredentialKind::Federated(provider)))
    }

    fn take_failure(&mut self) -> Result<(), ProviderError> {
        self.mutations += 1;
        match self.injected_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct InMemoryIdentityProvider {
    state: Mutex<State>,
    session: watch::Sender<Option<Identity>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (session, _rx) = watch::channel(None);
        Self {
            state: Mutex::new(State::default()),
            session,
        }
    }

    /// Register the account a federated popup for `provider` would return.
    pub fn with_federated_account(
        self,
        provider: FederatedProvider,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Self {
        self.lock().federated.insert(
            provider,
            FederatedAccount {
                email: email.map(String::from),
                display_name: display_name.map(String::from),
            },
        );
        self
    }

    /// Make the next mutating call fail with `err`. Failures queue up.
    pub fn fail_next(&self, err: ProviderError) {
        self.lock().injected_failures.push_back(err);
    }

    /// Number of mutating calls received so far.
    pub fn mutation_count(&self) -> usize {
        self.lock().mutations
    }

    /// Complete a phone verification: creates a phone identity and signs it in.
    pub fn sign_in_with_phone(&self, phone_number: &str) -> Identity {
        let identity = Identity::with_phone(Uuid::new_v4().to_string(), phone_number);
        self.lock()
            .identities
            .insert(identity.id.clone(), identity.clone());
        info!(uid = %identity.id, "Phone identity signed in");
        self.session.send_replace(Some(identity.clone()));
        identity
    }

    pub fn sign_out(&self) {
        debug!("Session signed out");
        self.session.send_replace(None);
    }

    pub fn get(&self, id: &str) -> Option<Identity> {
        self.lock().identities.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("identity state mutex poisoned")
    }

    fn signed_in(&self, identity: &Identity) {
        self.session.send_replace(Some(identity.clone()));
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn subscribe(&self) -> SessionStream {
        Box::pin(WatchStream::new(self.session.subscribe()))
    }

    async fn create_with_email_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        let identity = {
            let mut state = self.lock();
            state.take_failure()?;
            if state.email_owner(email).is_some() {
                return Err(ProviderError::CredentialConflict);
            }
            if password.expose_secret().chars().count() < PROVIDER_MIN_PASSWORD_LEN {
                return Err(ProviderError::WeakCredential);
            }
            let mut identity = Identity::new(Uuid::new_v4().to_string());
            identity.email = Some(email.to_string());
            identity.credentials.insert(CredentialKind::Password);
            state.identities.insert(identity.id.clone(), identity.clone());
            identity
        };
        info!(uid = %identity.id, "Email/password identity created");
        self.signed_in(&identity);
        Ok(identity)
    }

    async fn link_email_password(
        &self,
        identity: &Identity,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        let mut state = self.lock();
        state.take_failure()?;
        if state
            .email_owner(email)
            .is_some_and(|owner| owner.id != identity.id)
        {
            return Err(ProviderError::CredentialConflict);
        }
        if password.expose_secret().chars().count() < PROVIDER_MIN_PASSWORD_LEN {
            return Err(ProviderError::WeakCredential);
        }
        let stored = state
            .identities
            .get_mut(&identity.id)
            .ok_or(ProviderError::NoCurrentIdentity)?;
        if stored.has_credential(CredentialKind::Password) {
            return Err(ProviderError::CredentialConflict);
        }
        stored.email = Some(email.to_string());
        stored.credentials.insert(CredentialKind::Password);
        debug!(uid = %stored.id, "Password credential linked");
        Ok(stored.clone())
    }

    async fn sign_in_federated(
        &self,
        provider: FederatedProvider,
    ) -> Result<Identity, ProviderError> {
        let identity = {
            let mut state = self.lock();
            state.take_failure()?;
            let account = state
                .federated
                .get(&provider)
                .cloned()
                .ok_or_else(|| ProviderError::Other {
                    code: Some("auth/popup-closed-by-user".to_string()),
                    message: format!("No {provider} account selected"),
                })?;

            if let Some(existing) = state.federated_owner(provider) {
                existing.clone()
            } else {
                if let Some(email) = account.email.as_deref() {
                    if state.email_owner(email).is_some() {
                        return Err(ProviderError::CredentialConflict);
                    }
                }
                let mut identity = Identity::new(Uuid::new_v4().to_string());
                identity.email = account.email;
                identity.display_name = account.display_name;
                identity
                    .credentials
                    .insert(CredentialKind::Federated(provider));
                state.identities.insert(identity.id.clone(), identity.clone());
                identity
            }
        };
        info!(uid = %identity.id, %provider, "Federated sign-in");
        self.signed_in(&identity);
        Ok(identity)
    }

    async fn link_federated(
        &self,
        identity: &Identity,
        provider: FederatedProvider,
    ) -> Result<Identity, ProviderError> {
        let mut state = self.lock();
        state.take_failure()?;
        let account = state
            .federated
            .get(&provider)
            .cloned()
            .ok_or_else(|| ProviderError::Other {
                code: Some("auth/popup-closed-by-user".to_string()),
                message: format!("No {provider} account selected"),
            })?;
        if state.federated_owner(provider).is_some() {
            return Err(ProviderError::CredentialConflict);
        }
        if let Some(email) = account.email.as_deref() {
            if state
                .email_owner(email)
                .is_some_and(|owner| owner.id != identity.id)
            {
                return Err(ProviderError::CredentialConflict);
            }
        }
        let stored = state
            .identities
            .get_mut(&identity.id)
            .ok_or(ProviderError::NoCurrentIdentity)?;
        if stored.email.is_none() {
            stored.email = account.email;
        }
        if stored.display_name.is_none() {
            stored.display_name = account.display_name;
        }
        stored
            .credentials
            .insert(CredentialKind::Federated(provider));
        debug!(uid = %stored.id, %provider, "Federated credential linked");
        Ok(stored.clone())
    }

    async fn update_display_name(
        &self,
        identity_id: &str,
        display_name: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.take_failure()?;
        let stored = state
            .identities
            .get_mut(identity_id)
            .ok_or(ProviderError::NoCurrentIdentity)?;
        stored.display_name = Some(display_name.to_string());
        Ok(())
    }
}
