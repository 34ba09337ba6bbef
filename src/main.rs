use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use clarity_onboarding::config::{OnboardingConfig, ServerConfig};
use clarity_onboarding::identity::{FederatedProvider, IdentityProvider, InMemoryIdentityProvider};
use clarity_onboarding::onboarding::{OnboardingController, OnboardingRouteState, onboarding_routes};
use clarity_onboarding::session::MemorySessionFlags;
use clarity_onboarding::store::{LibSqlProfileStore, ProfileStore};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhoneSignIn {
    phone_number: String,
}

/// Local stand-in for the hosted phone-verification step.
async fn phone_sign_in(
    State(identity): State<Arc<InMemoryIdentityProvider>>,
    Json(req): Json<PhoneSignIn>,
) -> Json<serde_json::Value> {
    let identity = identity.sign_in_with_phone(&req.phone_number);
    Json(serde_json::json!({ "uid": identity.id }))
}

#[tokio::main]
async fn main() -> clarity_onboarding::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OnboardingConfig::from_env()?;
    let server = ServerConfig::from_env()?;

    eprintln!("Clarity onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding/status", server.port);
    eprintln!("   Events: ws://0.0.0.0:{}/ws", server.port);
    eprintln!("   Profiles: {}", server.db_path.display());
    eprintln!(
        "   Bypass: {}, dev shortcut: {}",
        server.bypass,
        config.dev_shortcut.is_some()
    );

    // ── Collaborators ────────────────────────────────────────────────────
    let identity = Arc::new(
        InMemoryIdentityProvider::new()
            .with_federated_account(
                FederatedProvider::Google,
                Some("demo.google@example.com"),
                Some("Demo Google"),
            )
            .with_federated_account(FederatedProvider::Apple, None, Some("Demo Apple")),
    );
    let store: Arc<dyn ProfileStore> = Arc::new(LibSqlProfileStore::new_local(&server.db_path).await?);
    let flags = Arc::new(MemorySessionFlags::new(
        server.bypass,
        server.dev_shortcut_autorun,
    ));

    // ── Controller ───────────────────────────────────────────────────────
    let provider: Arc<dyn IdentityProvider> = identity.clone();
    let controller = OnboardingController::mount(config, provider, Arc::clone(&store), flags);
    let _observer = controller.observe_identity();

    let dev_routes = Router::new()
        .route("/api/dev/phone-sign-in", post(phone_sign_in))
        .with_state(identity);

    let app = onboarding_routes(OnboardingRouteState { controller, store })
        .merge(dev_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server.port)).await?;
    tracing::info!(port = server.port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}
