//! REST + WebSocket endpoints for the onboarding flow.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::controller::{OnboardingController, SubmitOutcome};
use super::events::FlowEvent;
use super::failure::FlowError;
use super::password;
use crate::identity::FederatedProvider;
use crate::store::ProfileStore;

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub controller: Arc<OnboardingController>,
    pub store: Arc<dyn ProfileStore>,
}

#[derive(Deserialize)]
struct PasswordCheckRequest {
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormUpdate {
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    password_visible: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRequest {
    full_name: String,
    email: String,
    password: String,
}

/// Build the onboarding routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/password/check", post(check_password))
        .route("/api/onboarding/form", patch(update_form))
        .route("/api/onboarding/form/submit", post(submit_form))
        .route("/api/onboarding/profile", post(submit_profile))
        .route("/api/onboarding/profile/{uid}", get(get_profile))
        .route("/api/onboarding/federated/{provider}", post(submit_federated))
        .route("/api/onboarding/dev-shortcut", post(dev_shortcut))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "clarity-onboarding"
    }))
}

/// GET /api/onboarding/status
async fn get_status(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    Json(state.controller.status().await)
}

/// POST /api/onboarding/password/check
///
/// Live requirement state for a candidate password. Stateless.
async fn check_password(Json(req): Json<PasswordCheckRequest>) -> impl IntoResponse {
    Json(password::evaluate(&req.password))
}

/// PATCH /api/onboarding/form
async fn update_form(
    State(state): State<OnboardingRouteState>,
    Json(update): Json<FormUpdate>,
) -> impl IntoResponse {
    let requirements = state
        .controller
        .edit_form(|form| {
            if let Some(full_name) = update.full_name {
                form.set_full_name(full_name);
            }
            if let Some(email) = update.email {
                form.set_email(email);
            }
            if let Some(password) = update.password {
                form.set_password(password);
            }
            if let Some(visible) = update.password_visible {
                form.set_password_visible(visible);
            }
        })
        .await;
    Json(requirements)
}

/// POST /api/onboarding/form/submit
async fn submit_form(State(state): State<OnboardingRouteState>) -> Response {
    outcome_response(state.controller.submit_form().await)
}

/// POST /api/onboarding/profile
async fn submit_profile(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<ProfileRequest>,
) -> Response {
    let password = SecretString::from(req.password);
    let outcome = state
        .controller
        .submit_email_password_profile(&req.full_name, &req.email, &password)
        .await;
    outcome_response(outcome)
}

/// POST /api/onboarding/federated/{provider}
async fn submit_federated(
    State(state): State<OnboardingRouteState>,
    Path(provider): Path<String>,
) -> Response {
    let provider: FederatedProvider = match provider.parse() {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };
    outcome_response(state.controller.submit_federated_profile(provider).await)
}

/// POST /api/onboarding/dev-shortcut
async fn dev_shortcut(State(state): State<OnboardingRouteState>) -> Response {
    outcome_response(state.controller.developer_bypass_shortcut().await)
}

/// GET /api/onboarding/profile/{uid}
async fn get_profile(
    State(state): State<OnboardingRouteState>,
    Path(uid): Path<String>,
) -> Response {
    match state.store.get_profile(&uid).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "No profile for this identity" })),
        )
            .into_response(),
        Err(e) => {
            warn!(%uid, error = %e, "Profile lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn outcome_status(outcome: &SubmitOutcome) -> StatusCode {
    match outcome {
        SubmitOutcome::Completed { .. } => StatusCode::OK,
        SubmitOutcome::Ignored { .. } => StatusCode::CONFLICT,
        SubmitOutcome::Failed { error } => match error {
            FlowError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FlowError::CredentialConflict { .. } => StatusCode::CONFLICT,
            FlowError::ShortcutDisabled => StatusCode::FORBIDDEN,
            FlowError::MissingIdentity => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

fn outcome_response(outcome: SubmitOutcome) -> Response {
    let status = outcome_status(&outcome);
    let mut body = serde_json::to_value(&outcome).unwrap_or_default();
    if let SubmitOutcome::Failed { error } = &outcome {
        body["message"] = serde_json::Value::String(error.user_message());
    }
    (status, Json(body)).into_response()
}

// ── WebSocket ───────────────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<OnboardingRouteState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state.controller))
}

/// Send the current state, then forward every flow event as JSON.
async fn handle_socket(mut socket: WebSocket, controller: Arc<OnboardingController>) {
    info!("Onboarding event client connected");

    let mut rx = controller.events().subscribe();

    let sync = FlowEvent::StateChanged {
        state: controller.state().await,
    };
    if !send_event(&mut socket, &sync).await {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "Event client lagged behind broadcast");
                        let sync = FlowEvent::StateChanged {
                            state: controller.state().await,
                        };
                        if !send_event(&mut socket, &sync).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Onboarding event client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &FlowEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize flow event");
            true
        }
    }
}
