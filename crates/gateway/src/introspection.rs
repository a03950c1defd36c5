//! Operator endpoints: read-only views of live sessions and the registry.
//!
//! - `GET /sessions`: Live sessions, oldest first
//! - `GET /stats`: Session and registration counts
//! - `GET /registrations`: Completed registrations, newest first

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::Serialize;
use tracing::error;

use shamba_core::RegistrationRecord;
use shamba_engine::{DispatcherStats, SessionView};

use crate::SharedState;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn registry_failure(e: impl Into<shamba_core::Error>) -> ApiError {
    let e = e.into();
    error!(error = %e, "Registry read failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub fn introspection_router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions_handler))
        .route("/stats", get(stats_handler))
        .route("/registrations", get(list_registrations_handler))
}

async fn list_sessions_handler(State(state): State<SharedState>) -> Json<Vec<SessionView>> {
    Json(state.dispatcher.sessions())
}

async fn stats_handler(
    State(state): State<SharedState>,
) -> Result<Json<DispatcherStats>, ApiError> {
    state
        .dispatcher
        .stats()
        .await
        .map(Json)
        .map_err(registry_failure)
}

async fn list_registrations_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RegistrationRecord>>, ApiError> {
    let mut records = state
        .dispatcher
        .registry()
        .list()
        .await
        .map_err(registry_failure)?;
    records.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use shamba_config::AppConfig;
    use shamba_engine::{Dispatcher, UssdRequest};
    use shamba_store::{InMemoryRegistry, SessionStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let dispatcher = Dispatcher::new(
            Arc::new(SessionStore::new()),
            Arc::new(InMemoryRegistry::new()),
            AppConfig::default().registry.timezone(),
        );
        Arc::new(GatewayState {
            dispatcher: Arc::new(dispatcher),
            response_deadline: Duration::from_secs(5),
        })
    }

    async fn get_json(state: SharedState, uri: &str) -> serde_json::Value {
        let app = build_router(state, 1024);
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn step(state: &SharedState, session_id: &str, phone: &str, text: &str) {
        let request = UssdRequest {
            session_id: session_id.into(),
            end_user_id: phone.into(),
            text: text.into(),
        };
        state.dispatcher.dispatch(&request).await;
    }

    #[tokio::test]
    async fn sessions_lists_live_sessions() {
        let state = test_state();
        step(&state, "s1", "+254700000001", "").await;
        step(&state, "s1", "+254700000001", "1").await;

        let json = get_json(state, "/sessions").await;
        let sessions = json.as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["id"], "s1");
        assert_eq!(sessions[0]["stage"], "ENTER_NAME");
        assert!(sessions[0]["lastActivityAt"].is_string());
    }

    #[tokio::test]
    async fn stats_counts_sessions_and_registrations() {
        let state = test_state();
        for text in ["", "1", "1*Akinyi", "1*Akinyi*6", "1*Akinyi*6*2", "1*Akinyi*6*2*4", "1*Akinyi*6*2*4*1"] {
            step(&state, "s1", "+254700000002", text).await;
        }
        step(&state, "s2", "+254700000003", "").await;

        let json = get_json(state, "/stats").await;
        assert_eq!(json["sessions"], 1);
        assert_eq!(json["registrations"], 1);
    }

    #[tokio::test]
    async fn registrations_returns_stored_records() {
        let state = test_state();
        for text in ["", "1", "1*Akinyi", "1*Akinyi*6", "1*Akinyi*6*2", "1*Akinyi*6*2*4", "1*Akinyi*6*2*4*1"] {
            step(&state, "s1", "+254700000002", text).await;
        }

        let json = get_json(state, "/registrations").await;
        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "Akinyi");
        assert_eq!(records[0]["county"], "Kisumu");
        assert_eq!(records[0]["crop"], "Wheat");
        assert_eq!(records[0]["endUserId"], "+254700000002");
    }
}
