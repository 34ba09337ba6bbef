//! End-to-end tests for the onboarding controller against the in-memory
//! identity provider, a live session subscription, and both profile stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::{Notify, Semaphore, broadcast};
use tokio::time::timeout;

use clarity_onboarding::config::{DevShortcutConfig, OnboardingConfig};
use clarity_onboarding::error::ProviderError;
use clarity_onboarding::identity::{
    FederatedProvider, Identity, IdentityProvider, InMemoryIdentityProvider, SessionStream,
};
use clarity_onboarding::onboarding::{
    FlowEvent, FlowPhase, FlowState, OnboardingController, ProfileRecord, SubmitOutcome,
};
use clarity_onboarding::session::{MemorySessionFlags, SessionFlags};
use clarity_onboarding::store::{LibSqlProfileStore, MemoryProfileStore, ProfileStore};

/// Maximum time any wait is allowed before we consider the test hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn secret(s: &str) -> SecretString {
    SecretString::from(s)
}

/// Poll until the controller reaches `phase`.
async fn wait_for_phase(controller: &OnboardingController, phase: FlowPhase) {
    timeout(TEST_TIMEOUT, async {
        while controller.phase().await != phase {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {phase}"));
}

fn drain(rx: &mut broadcast::Receiver<FlowEvent>) -> Vec<FlowEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn navigations(events: &[FlowEvent]) -> Vec<(String, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            FlowEvent::Navigate { route, replace } => Some((route.clone(), *replace)),
            _ => None,
        })
        .collect()
}

/// Wraps the in-memory provider and holds `create_with_email_password` and
/// `link_email_password` until the test releases them.
struct GatedProvider {
    inner: InMemoryIdentityProvider,
    gate: Semaphore,
    entered: Notify,
    link_calls: AtomicUsize,
}

impl GatedProvider {
    fn new() -> Self {
        Self {
            inner: InMemoryIdentityProvider::new(),
            gate: Semaphore::new(0),
            entered: Notify::new(),
            link_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for GatedProvider {
    fn name(&self) -> &str {
        "gated"
    }

    fn subscribe(&self) -> SessionStream {
        self.inner.subscribe()
    }

    async fn create_with_email_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        self.entered.notify_one();
        self.gate.acquire().await.unwrap().forget();
        self.inner.create_with_email_password(email, password).await
    }

    async fn link_email_password(
        &self,
        identity: &Identity,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.acquire().await.unwrap().forget();
        self.inner.link_email_password(identity, email, password).await
    }

    async fn sign_in_federated(
        &self,
        provider: FederatedProvider,
    ) -> Result<Identity, ProviderError> {
        self.inner.sign_in_federated(provider).await
    }

    async fn link_federated(
        &self,
        identity: &Identity,
        provider: FederatedProvider,
    ) -> Result<Identity, ProviderError> {
        self.inner.link_federated(identity, provider).await
    }

    async fn update_display_name(
        &self,
        identity_id: &str,
        display_name: &str,
    ) -> Result<(), ProviderError> {
        self.inner.update_display_name(identity_id, display_name).await
    }
}

#[tokio::test]
async fn second_submit_while_pending_is_a_no_op() {
    let provider = Arc::new(GatedProvider::new());
    let store = Arc::new(MemoryProfileStore::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        provider.clone(),
        store.clone(),
        Arc::new(MemorySessionFlags::new(false, false)),
    );
    let phone = provider.inner.sign_in_with_phone("+62811");
    controller.handle_session_change(Some(phone)).await;

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .submit_email_password_profile("Budi", "budi@example.com", &secret("Valid123!"))
                .await
        })
    };

    timeout(TEST_TIMEOUT, provider.entered.notified())
        .await
        .expect("first submission never reached the provider");
    assert_eq!(controller.phase().await, FlowPhase::Submitting);

    let second = controller
        .submit_email_password_profile("Budi", "budi@example.com", &secret("Valid123!"))
        .await;
    assert_eq!(
        second,
        SubmitOutcome::Ignored {
            phase: FlowPhase::Submitting
        }
    );
    assert_eq!(controller.phase().await, FlowPhase::Submitting);
    assert_eq!(provider.link_calls.load(Ordering::SeqCst), 1);

    provider.gate.add_permits(1);
    let first = timeout(TEST_TIMEOUT, first).await.unwrap().unwrap();
    assert!(matches!(first, SubmitOutcome::Completed { .. }));
    assert_eq!(provider.link_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.write_count().await, 1);
}

#[tokio::test]
async fn federated_submit_also_guarded() {
    let provider = Arc::new(GatedProvider::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        provider.clone(),
        Arc::new(MemoryProfileStore::new()),
        Arc::new(MemorySessionFlags::new(false, false)),
    );
    let phone = provider.inner.sign_in_with_phone("+62811");
    controller.handle_session_change(Some(phone)).await;

    let pending = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .submit_email_password_profile("Budi", "budi@example.com", &secret("Valid123!"))
                .await
        })
    };
    timeout(TEST_TIMEOUT, provider.entered.notified())
        .await
        .unwrap();

    let federated = controller
        .submit_federated_profile(FederatedProvider::Google)
        .await;
    assert_eq!(
        federated,
        SubmitOutcome::Ignored {
            phase: FlowPhase::Submitting
        }
    );

    provider.gate.add_permits(1);
    timeout(TEST_TIMEOUT, pending).await.unwrap().unwrap();
}

#[tokio::test]
async fn no_identity_and_no_bypass_redirects_once() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        Arc::new(MemoryProfileStore::new()),
        Arc::new(MemorySessionFlags::new(false, false)),
    );
    let mut rx = controller.events().subscribe();

    let _observer = controller.observe_identity().unwrap();
    wait_for_phase(&controller, FlowPhase::AwaitingPhoneVerifiedIdentity).await;

    // A second signed-out notification must not redirect again.
    identity.sign_out();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        navigations(&drain(&mut rx)),
        vec![("/signup".to_string(), true)]
    );
}

#[tokio::test]
async fn phone_verification_after_mount_makes_ready() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        Arc::new(MemoryProfileStore::new()),
        Arc::new(MemorySessionFlags::new(false, false)),
    );
    let _observer = controller.observe_identity().unwrap();
    wait_for_phase(&controller, FlowPhase::AwaitingPhoneVerifiedIdentity).await;

    identity.sign_in_with_phone("+62811");
    wait_for_phase(&controller, FlowPhase::ReadyForProfileCompletion).await;
}

#[tokio::test]
async fn bypass_never_reaches_awaiting() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        Arc::new(MemoryProfileStore::new()),
        Arc::new(MemorySessionFlags::new(true, false)),
    );
    let mut rx = controller.events().subscribe();

    let _observer = controller.observe_identity().unwrap();
    wait_for_phase(&controller, FlowPhase::ReadyForProfileCompletion).await;

    identity.sign_out();
    identity.sign_out();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = drain(&mut rx);
    assert!(navigations(&events).is_empty());
    assert!(!events.iter().any(|e| matches!(
        e,
        FlowEvent::StateChanged {
            state: FlowState::AwaitingPhoneVerifiedIdentity
        }
    )));
}

#[tokio::test]
async fn dropping_observer_unsubscribes() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        Arc::new(MemoryProfileStore::new()),
        Arc::new(MemorySessionFlags::new(false, false)),
    );

    let observer = controller.observe_identity().unwrap();
    wait_for_phase(&controller, FlowPhase::AwaitingPhoneVerifiedIdentity).await;
    observer.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;

    identity.sign_in_with_phone("+62811");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        controller.phase().await,
        FlowPhase::AwaitingPhoneVerifiedIdentity
    );
}

#[tokio::test]
async fn completed_flow_persists_values_verbatim() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let store = Arc::new(LibSqlProfileStore::new_memory().await.unwrap());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        store.clone(),
        Arc::new(MemorySessionFlags::new(false, false)),
    );
    let mut rx = controller.events().subscribe();
    let _observer = controller.observe_identity().unwrap();

    let phone = identity.sign_in_with_phone("+6281234567890");
    wait_for_phase(&controller, FlowPhase::ReadyForProfileCompletion).await;

    let outcome = controller
        .submit_email_password_profile("Budi Santoso", "budi@example.com", &secret("Valid123!"))
        .await;
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));

    let stored = store.get_profile(&phone.id).await.unwrap().unwrap();
    assert_eq!(
        stored.record,
        ProfileRecord::new(
            phone.id.clone(),
            "Budi Santoso",
            "budi@example.com",
            "+6281234567890"
        )
    );

    let events = drain(&mut rx);
    assert_eq!(
        navigations(&events),
        vec![("/setup-security".to_string(), false)]
    );
    let created = events
        .iter()
        .filter(|e| matches!(e, FlowEvent::Notice(n) if n.title == "Profile Created!"))
        .count();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn bypass_success_upserts_once_and_clears_flag() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let store = Arc::new(MemoryProfileStore::new());
    let flags = Arc::new(MemorySessionFlags::new(true, false));
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        store.clone(),
        flags.clone(),
    );
    let mut rx = controller.events().subscribe();
    let _observer = controller.observe_identity().unwrap();
    wait_for_phase(&controller, FlowPhase::ReadyForProfileCompletion).await;

    let outcome = controller
        .submit_email_password_profile("Budi Santoso", "budi@example.com", &secret("LongEnough1!"))
        .await;

    let SubmitOutcome::Completed { profile } = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(profile.phone_number, "dev-bypass");
    assert_eq!(store.write_count().await, 1);
    assert!(!flags.bypass_enabled());

    // The provider's sign-in notification arrives after completion and is ignored.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(controller.state().await, FlowState::Completed { .. }));
    assert_eq!(navigations(&drain(&mut rx)).len(), 1);
}

#[tokio::test]
async fn failed_validation_never_reaches_provider() {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let store = Arc::new(MemoryProfileStore::new());
    let controller = OnboardingController::mount(
        OnboardingConfig::default(),
        identity.clone(),
        store.clone(),
        Arc::new(MemorySessionFlags::new(true, false)),
    );
    controller.handle_session_change(None).await;

    for bad in ["short1!", "alllowercase1!", "NoDigitsHere!", "NoSymbols123", ""] {
        let outcome = controller
            .submit_email_password_profile("Budi", "budi@example.com", &secret(bad))
            .await;
        match outcome {
            SubmitOutcome::Failed { error } => assert!(error.is_validation(), "{bad}"),
            other => panic!("{bad}: expected validation failure, got {other:?}"),
        }
    }
    assert_eq!(identity.mutation_count(), 0);
    assert_eq!(store.write_count().await, 0);

    let outcome = controller
        .submit_email_password_profile("Budi", "budi@example.com", &secret("Valid123!"))
        .await;
    assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
}

#[tokio::test]
async fn shortcut_survives_observer_teardown() {
    let provider = Arc::new(GatedProvider::new());
    let store = Arc::new(MemoryProfileStore::new());
    let config = OnboardingConfig {
        dev_shortcut: Some(DevShortcutConfig::default()),
        ..OnboardingConfig::default()
    };
    let controller = OnboardingController::mount(
        config,
        provider.clone(),
        store.clone(),
        Arc::new(MemorySessionFlags::new(true, true)),
    );

    let observer = controller.observe_identity().unwrap();
    timeout(TEST_TIMEOUT, provider.entered.notified())
        .await
        .expect("shortcut never reached the provider");
    assert_eq!(controller.phase().await, FlowPhase::Submitting);

    drop(observer);
    provider.gate.add_permits(1);

    wait_for_phase(&controller, FlowPhase::Completed).await;
    assert_eq!(store.write_count().await, 1);

    let retry = controller
        .submit_email_password_profile("Budi", "budi@example.com", &secret("Valid123!"))
        .await;
    assert_eq!(
        retry,
        SubmitOutcome::Ignored {
            phase: FlowPhase::Completed
        }
    );
}
