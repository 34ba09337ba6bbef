//! OnboardingController: drives a visitor from a verified phone (or bypass
//! mode) to a persisted profile.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{EventBus, FlowEvent, Notice};
use super::failure::{CredentialPath, FlowError, ValidationError, validate_profile_fields};
use super::form::PendingSession;
use super::model::{OnboardingMode, ProfileRecord};
use super::password::RequirementStatus;
use super::state::{FlowPhase, FlowState};
use crate::config::OnboardingConfig;
use crate::error::ProviderError;
use crate::identity::{FederatedProvider, Identity, IdentityProvider};
use crate::session::SessionFlags;
use crate::store::ProfileStore;

/// Result of a submit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Completed { profile: ProfileRecord },
    Failed { error: FlowError },
    /// Dropped: another submission is in flight, or the flow is not ready.
    Ignored { phase: FlowPhase },
}

/// Snapshot of the controller for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingStatus {
    pub state: FlowState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<OnboardingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub password_visible: bool,
    pub requirements: Vec<RequirementStatus>,
}

struct Inner {
    state: FlowState,
    /// Phone-verified identity from the latest session notification.
    verified: Option<Identity>,
}

/// Owned by one UI session. Create with [`OnboardingController::mount`], then
/// call [`OnboardingController::observe_identity`] once.
pub struct OnboardingController {
    config: OnboardingConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
    flags: Arc<dyn SessionFlags>,
    events: EventBus,
    /// Bypass flag as read at mount.
    bypass: bool,
    /// Developer-shortcut flag as read at mount.
    shortcut_requested: bool,
    shortcut_fired: AtomicBool,
    observing: AtomicBool,
    inner: RwLock<Inner>,
    form: RwLock<PendingSession>,
}

/// Live session subscription. Dropping it (or calling `stop`) unsubscribes.
pub struct IdentityObserver {
    handle: JoinHandle<()>,
}

impl IdentityObserver {
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for IdentityObserver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Where the identity used for the profile came from, decided when the
/// submission starts.
struct SubmissionContext {
    verified: Option<Identity>,
}

impl OnboardingController {
    /// Mount the controller. Session flags are read here, once.
    pub fn mount(
        config: OnboardingConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
        flags: Arc<dyn SessionFlags>,
    ) -> Arc<Self> {
        let bypass = flags.bypass_enabled();
        let shortcut_requested = flags.developer_shortcut();
        info!(
            provider = identity.name(),
            bypass, shortcut_requested, "Onboarding controller mounted"
        );
        Arc::new(Self {
            config,
            identity,
            store,
            flags,
            events: EventBus::new(),
            bypass,
            shortcut_requested,
            shortcut_fired: AtomicBool::new(false),
            observing: AtomicBool::new(false),
            inner: RwLock::new(Inner {
                state: FlowState::Loading,
                verified: None,
            }),
            form: RwLock::new(PendingSession::default()),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn state(&self) -> FlowState {
        self.inner.read().await.state.clone()
    }

    pub async fn phase(&self) -> FlowPhase {
        self.inner.read().await.state.phase()
    }

    /// Subscribe to the provider's session changes. Only the first call
    /// subscribes; later calls return `None`.
    pub fn observe_identity(self: &Arc<Self>) -> Option<IdentityObserver> {
        if self.observing.swap(true, Ordering::SeqCst) {
            warn!("Identity observer already running");
            return None;
        }

        let mut sessions = self.identity.subscribe();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(identity) = sessions.next().await {
                controller.handle_session_change(identity).await;
            }
            debug!("Session stream closed");
        });

        Some(IdentityObserver { handle })
    }

    /// Apply one session-change notification. A shortcut requested at mount
    /// starts in its own task once the flow becomes ready.
    pub async fn handle_session_change(
        self: &Arc<Self>,
        identity: Option<Identity>,
    ) -> FlowState {
        let (state, became_ready) = {
            let mut inner = self.inner.write().await;
            let phase = inner.state.phase();
            if !phase.observes_session() {
                debug!(%phase, "Ignoring session change");
                return inner.state.clone();
            }

            let verified = identity.filter(Identity::has_verified_phone);
            let became_ready = if let Some(identity) = verified {
                info!(uid = %identity.id, "Phone-verified identity observed");
                inner.verified = Some(identity);
                self.events.notice(Notice::info(
                    "Phone Verified!",
                    "Please complete your profile to continue.",
                ));
                self.enter_ready(&mut inner)
            } else if self.bypass {
                inner.verified = None;
                self.enter_ready(&mut inner)
            } else {
                inner.verified = None;
                if phase != FlowPhase::AwaitingPhoneVerifiedIdentity {
                    info!("No verified identity and no bypass, redirecting to signup");
                    self.set_state(&mut inner, FlowState::AwaitingPhoneVerifiedIdentity);
                    self.events.notice(Notice::destructive(
                        "Verification Needed",
                        "Please start the sign up process over.",
                    ));
                    self.events.navigate(&self.config.signup_route, true);
                }
                false
            };
            (inner.state.clone(), became_ready)
        };

        if became_ready
            && self.shortcut_requested
            && self.config.dev_shortcut.is_some()
            && !self.shortcut_fired.swap(true, Ordering::SeqCst)
        {
            // Runs outside the observer task; observer teardown must not cancel it.
            info!("Developer shortcut requested at mount, running it");
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                controller.developer_bypass_shortcut().await;
            });
        }

        state
    }

    /// Update the held form fields and return the live password checks.
    pub async fn edit_form<F>(&self, edit: F) -> Vec<RequirementStatus>
    where
        F: FnOnce(&mut PendingSession),
    {
        let mut form = self.form.write().await;
        edit(&mut form);
        form.requirements()
    }

    /// Submit the held form fields as an email/password profile.
    pub async fn submit_form(&self) -> SubmitOutcome {
        let (full_name, email, password) = {
            let form = self.form.read().await;
            (
                form.full_name.clone(),
                form.email.clone(),
                SecretString::from(form.password().expose_secret().to_string()),
            )
        };
        self.submit_email_password_profile(&full_name, &email, &password)
            .await
    }

    /// Attach an email/password credential (or create the identity in bypass
    /// mode), set the display name, and persist the profile.
    pub async fn submit_email_password_profile(
        &self,
        full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> SubmitOutcome {
        let ctx = match self
            .begin_submission(|| {
                validate_profile_fields(full_name, email, password.expose_secret())
            })
            .await
        {
            Ok(ctx) => ctx,
            Err(outcome) => return outcome,
        };

        let result = self
            .complete_with_password(ctx, full_name, email, password)
            .await;
        self.settle(result).await
    }

    /// Link (or, in bypass mode, sign in with) a federated account and
    /// persist the profile with the provider-supplied name and email.
    pub async fn submit_federated_profile(&self, provider: FederatedProvider) -> SubmitOutcome {
        let ctx = match self.begin_submission(|| Ok(())).await {
            Ok(ctx) => ctx,
            Err(outcome) => return outcome,
        };

        let result = self.complete_with_federated(ctx, provider).await;
        self.settle(result).await
    }

    /// Create a throwaway email/password account and complete onboarding
    /// with it. Only available when the shortcut is configured.
    pub async fn developer_bypass_shortcut(&self) -> SubmitOutcome {
        let Some(shortcut) = self.config.dev_shortcut.clone() else {
            warn!("Developer shortcut invoked but not enabled");
            return SubmitOutcome::Failed {
                error: FlowError::ShortcutDisabled,
            };
        };

        if let Err(outcome) = self.begin_submission(|| Ok(())).await {
            return outcome;
        }

        let email = format!(
            "dev-bypass-{}@{}",
            chrono::Utc::now().timestamp_millis(),
            shortcut.email_domain
        );
        info!(%email, "Developer shortcut creating test account");
        self.events.notice(Notice::info(
            "Dev Bypass Activated!",
            "Creating a test user account...",
        ));

        let result = async {
            let identity = self
                .identity
                .create_with_email_password(&email, &shortcut.password)
                .await
                .map_err(|e| FlowError::from_provider(e, CredentialPath::Password))?;
            self.persist(
                identity,
                &shortcut.display_name,
                &email,
                &self.config.shortcut_phone_marker,
                true,
            )
            .await
        }
        .await;

        self.settle(result).await
    }

    /// Current snapshot for status endpoints.
    pub async fn status(&self) -> OnboardingStatus {
        let (state, verified) = {
            let inner = self.inner.read().await;
            (inner.state.clone(), inner.verified.is_some())
        };
        let mode = if self.bypass {
            Some(OnboardingMode::Bypass)
        } else if verified {
            Some(OnboardingMode::PhoneVerified)
        } else {
            None
        };
        let form = self.form.read().await;
        OnboardingStatus {
            error_message: state.error().map(FlowError::user_message),
            state,
            mode,
            full_name: form.full_name.clone(),
            email: form.email.clone(),
            password: form.rendered_password(),
            password_visible: form.password_visible(),
            requirements: form.requirements(),
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    fn set_state(&self, inner: &mut Inner, next: FlowState) {
        let from = inner.state.phase();
        let to = next.phase();
        if !from.can_transition_to(to) {
            warn!(%from, %to, "Unexpected onboarding transition");
        }
        debug!(%from, %to, "Onboarding transition");
        inner.state = next;
        self.events.emit(FlowEvent::StateChanged {
            state: inner.state.clone(),
        });
    }

    /// Move to `ReadyForProfileCompletion` from a waiting state. Returns
    /// whether the transition happened.
    fn enter_ready(&self, inner: &mut Inner) -> bool {
        match inner.state.phase() {
            FlowPhase::Loading | FlowPhase::AwaitingPhoneVerifiedIdentity => {
                self.set_state(inner, FlowState::ReadyForProfileCompletion);
                true
            }
            _ => false,
        }
    }

    /// Check-and-set the submission guard. Validation runs under the same
    /// lock; a failure moves to `Failed` without entering `Submitting`.
    async fn begin_submission<V>(&self, validate: V) -> Result<SubmissionContext, SubmitOutcome>
    where
        V: FnOnce() -> Result<(), ValidationError>,
    {
        let mut inner = self.inner.write().await;
        let phase = inner.state.phase();
        if !phase.accepts_submission() {
            debug!(%phase, "Submission ignored");
            return Err(SubmitOutcome::Ignored { phase });
        }

        if let Err(validation) = validate() {
            debug!(field = validation.field(), "Profile form failed validation");
            let error = FlowError::validation(validation);
            self.set_state(
                &mut inner,
                FlowState::Failed {
                    error: error.clone(),
                },
            );
            return Err(SubmitOutcome::Failed { error });
        }

        self.set_state(&mut inner, FlowState::Submitting);
        Ok(SubmissionContext {
            verified: inner.verified.clone(),
        })
    }

    async fn complete_with_password(
        &self,
        ctx: SubmissionContext,
        full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<ProfileRecord, FlowError> {
        let classify = |e: ProviderError| FlowError::from_provider(e, CredentialPath::Password);

        let (identity, phone_number) = if self.bypass {
            let identity = self
                .identity
                .create_with_email_password(email, password)
                .await
                .map_err(classify)?;
            (identity, self.config.bypass_phone_marker.clone())
        } else {
            let current = ctx.verified.ok_or(FlowError::MissingIdentity)?;
            let linked = self
                .identity
                .link_email_password(&current, email, password)
                .await
                .map_err(classify)?;
            let phone_number = current.phone_number.clone().unwrap_or_default();
            (linked, phone_number)
        };

        self.persist(identity, full_name, email, &phone_number, true)
            .await
    }

    async fn complete_with_federated(
        &self,
        ctx: SubmissionContext,
        provider: FederatedProvider,
    ) -> Result<ProfileRecord, FlowError> {
        let classify = |e: ProviderError| FlowError::from_provider(e, CredentialPath::Federated);

        let phone_number = ctx
            .verified
            .as_ref()
            .and_then(|i| i.phone_number.clone())
            .unwrap_or_else(|| self.config.bypass_phone_marker.clone());

        let identity = if self.bypass {
            self.identity
                .sign_in_federated(provider)
                .await
                .map_err(classify)?
        } else {
            let current = ctx.verified.ok_or(FlowError::MissingIdentity)?;
            self.identity
                .link_federated(&current, provider)
                .await
                .map_err(classify)?
        };

        let email = identity
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| FlowError::validation(ValidationError::MissingProviderEmail))?;
        let display_name = identity.display_name.clone().unwrap_or_default();

        self.persist(identity, &display_name, &email, &phone_number, false)
            .await
    }

    /// Optionally set the display name, then write the profile record.
    async fn persist(
        &self,
        identity: Identity,
        display_name: &str,
        email: &str,
        phone_number: &str,
        set_display_name: bool,
    ) -> Result<ProfileRecord, FlowError> {
        if set_display_name {
            self.identity
                .update_display_name(&identity.id, display_name)
                .await
                .map_err(|e| FlowError::from_provider(e, CredentialPath::Password))?;
        }

        let record = ProfileRecord::new(identity.id, display_name, email, phone_number);
        self.store
            .upsert_profile(&record)
            .await
            .map_err(FlowError::from_store)?;
        Ok(record)
    }

    /// Leave `Submitting`.
    async fn settle(&self, result: Result<ProfileRecord, FlowError>) -> SubmitOutcome {
        match result {
            Ok(profile) => {
                if self.bypass {
                    self.flags.clear_bypass();
                }
                {
                    let mut inner = self.inner.write().await;
                    self.set_state(
                        &mut inner,
                        FlowState::Completed {
                            profile: profile.clone(),
                        },
                    );
                }
                self.form.write().await.clear();
                info!(uid = %profile.uid, "Onboarding profile completed");
                self.events
                    .notice(Notice::info("Profile Created!", "Now let's secure your account."));
                self.events
                    .navigate(&self.config.security_setup_route, false);
                SubmitOutcome::Completed { profile }
            }
            Err(error) => {
                warn!(error = ?error, "Profile completion failed");
                let mut inner = self.inner.write().await;
                self.set_state(
                    &mut inner,
                    FlowState::Failed {
                        error: error.clone(),
                    },
                );
                SubmitOutcome::Failed { error }
            }
        }
    }
}
