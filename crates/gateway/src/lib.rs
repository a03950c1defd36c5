//! HTTP USSD gateway for Shamba.
//!
//! Exposes the USSD callback that aggregators POST to, plus a health check
//! and the operator introspection endpoints in [`introspection`].
//!
//! Built on Axum. Every USSD round trip is bounded by a response deadline;
//! the dialogue step itself runs in its own task so that a slow request
//! never leaves a session half-updated.

pub mod introspection;

use axum::extract::DefaultBodyLimit;
use axum::{
    Form, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use shamba_config::AppConfig;
use shamba_core::{Directive, Registry, RegistryError};
use shamba_engine::{Dispatcher, UssdRequest, menus};
use shamba_store::{FileRegistry, InMemoryRegistry, SessionStore, spawn_sweeper};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
    pub response_deadline: Duration,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ussd", post(ussd_handler))
        .merge(introspection::introspection_router())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Pick the registry backend named in the configuration.
pub fn build_registry(config: &AppConfig) -> Result<Arc<dyn Registry>, RegistryError> {
    match config.registry.backend.as_str() {
        "file" => {
            let path = config.registry.file_path();
            info!(path = %path.display(), "Using file registry");
            Ok(Arc::new(FileRegistry::new(path)?))
        }
        _ => Ok(Arc::new(InMemoryRegistry::new())),
    }
}

/// Build the dispatcher (session store + registry + stage engine) from config.
pub fn build_dispatcher(config: &AppConfig) -> Result<Dispatcher, RegistryError> {
    Ok(Dispatcher::new(
        Arc::new(SessionStore::new()),
        build_registry(config)?,
        config.registry.timezone(),
    ))
}

/// Start the gateway HTTP server and the session sweeper.
///
/// Runs until Ctrl-C; the sweeper is stopped on the way out.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let dispatcher = Arc::new(build_dispatcher(&config)?);
    let sweeper = spawn_sweeper(
        dispatcher.store().clone(),
        config.session.sweep_interval(),
        config.session.timeout(),
    );

    let state = Arc::new(GatewayState {
        dispatcher,
        response_deadline: config.gateway.response_deadline(),
    });
    let app = build_router(state, config.gateway.max_body_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await?;

    sweeper.abort();
    Ok(())
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Form fields sent by the USSD aggregator.
#[derive(Debug, Deserialize)]
struct UssdForm {
    #[serde(rename = "sessionId")]
    session_id: String,

    #[serde(rename = "phoneNumber", alias = "endUserId", default)]
    phone_number: String,

    #[serde(default)]
    text: String,

    #[serde(rename = "serviceCode", default)]
    service_code: Option<String>,

    #[serde(rename = "networkCode", default)]
    network_code: Option<String>,
}

async fn ussd_handler(State(state): State<SharedState>, Form(form): Form<UssdForm>) -> Response {
    if form.session_id.trim().is_empty() || form.phone_number.trim().is_empty() {
        warn!(
            session_id = %form.session_id,
            has_phone = !form.phone_number.trim().is_empty(),
            "Rejecting USSD request without a session id or phone number"
        );
        return plain_text(StatusCode::BAD_REQUEST, &Directive::terminate(menus::system_error()));
    }

    info!(
        session_id = %form.session_id,
        service_code = ?form.service_code,
        network_code = ?form.network_code,
        text_len = form.text.len(),
        "USSD request received"
    );

    let request = UssdRequest {
        session_id: form.session_id,
        end_user_id: form.phone_number,
        text: form.text,
    };
    let session_id = request.session_id.clone();

    // Spawned so that hitting the deadline detaches the step instead of
    // cancelling it halfway through.
    let dispatcher = state.dispatcher.clone();
    let step = tokio::spawn(async move { dispatcher.dispatch(&request).await });

    let directive = match tokio::time::timeout(state.response_deadline, step).await {
        Ok(Ok(directive)) => directive,
        Ok(Err(e)) => {
            error!(session_id = %session_id, error = %e, "Dispatch task failed");
            Directive::terminate(menus::system_error())
        }
        Err(_) => {
            warn!(
                session_id = %session_id,
                deadline_ms = state.response_deadline.as_millis() as u64,
                "Response deadline exceeded"
            );
            Directive::proceed(menus::request_timeout())
        }
    };

    plain_text(StatusCode::OK, &directive)
}

/// Render a directive as the `CON …` / `END …` plain-text body.
fn plain_text(status: StatusCode, directive: &Directive) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        directive.render(),
    )
        .into_response()
}
