//! Onboarding system: profile completion after phone verification.
//!
//! A visitor arrives with a phone-verified identity (or in bypass mode with
//! none). The controller attaches an email/password or federated credential,
//! sets the display name, persists a `ProfileRecord`, and hands off to the
//! security-setup step.

pub mod controller;
pub mod events;
pub mod failure;
pub mod form;
pub mod model;
pub mod password;
pub mod routes;
pub mod state;

pub use controller::{IdentityObserver, OnboardingController, OnboardingStatus, SubmitOutcome};
pub use events::{EventBus, FlowEvent, Notice};
pub use failure::{FlowError, ValidationError};
pub use form::PendingSession;
pub use model::{OnboardingMode, ProfileRecord, StoredProfile};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use state::{FlowPhase, FlowState};
