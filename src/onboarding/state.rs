//! Onboarding state machine: where the visitor is in profile completion.

use serde::Serialize;

use super::failure::FlowError;
use super::model::ProfileRecord;

/// Controller state.
///
/// `Loading` → `ReadyForProfileCompletion` | `AwaitingPhoneVerifiedIdentity`,
/// then `Ready`/`Failed` → `Submitting` → `Completed` | `Failed`.
/// Validation failures go straight from `Ready`/`Failed` to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Loading,
    AwaitingPhoneVerifiedIdentity,
    ReadyForProfileCompletion,
    Submitting,
    Completed { profile: ProfileRecord },
    Failed { error: FlowError },
}

/// Discriminant of `FlowState`, for transition checks and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Loading,
    AwaitingPhoneVerifiedIdentity,
    ReadyForProfileCompletion,
    Submitting,
    Completed,
    Failed,
}

impl FlowPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowPhase) -> bool {
        use FlowPhase::*;
        matches!(
            (self, target),
            (Loading, ReadyForProfileCompletion)
                | (Loading, AwaitingPhoneVerifiedIdentity)
                | (AwaitingPhoneVerifiedIdentity, ReadyForProfileCompletion)
                | (ReadyForProfileCompletion, AwaitingPhoneVerifiedIdentity)
                | (ReadyForProfileCompletion, Submitting)
                | (ReadyForProfileCompletion, Failed)
                | (Failed, Submitting)
                | (Failed, Failed)
                | (Failed, AwaitingPhoneVerifiedIdentity)
                | (Submitting, Completed)
                | (Submitting, Failed)
        )
    }

    /// Whether a submission may start from this phase.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, Self::ReadyForProfileCompletion | Self::Failed)
    }

    /// Whether session-change notifications are applied in this phase.
    pub fn observes_session(&self) -> bool {
        !matches!(self, Self::Submitting | Self::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Loading => "loading",
            Self::AwaitingPhoneVerifiedIdentity => "awaiting_phone_verified_identity",
            Self::ReadyForProfileCompletion => "ready_for_profile_completion",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl FlowState {
    pub fn phase(&self) -> FlowPhase {
        match self {
            Self::Loading => FlowPhase::Loading,
            Self::AwaitingPhoneVerifiedIdentity => FlowPhase::AwaitingPhoneVerifiedIdentity,
            Self::ReadyForProfileCompletion => FlowPhase::ReadyForProfileCompletion,
            Self::Submitting => FlowPhase::Submitting,
            Self::Completed { .. } => FlowPhase::Completed,
            Self::Failed { .. } => FlowPhase::Failed,
        }
    }

    /// The error currently shown to the user, if any.
    pub fn error(&self) -> Option<&FlowError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self::Loading
    }
}
