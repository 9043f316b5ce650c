use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::{error, warn};

use dossier_common::{DossierError, ProfileRequest};
use dossier_profiler::Orchestrator;

pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Bound on one profiling request. Dropping the future abandons every in-flight call.
    pub request_timeout: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/profiling", post(create_profile))
        .route("/profiling/", post(create_profile))
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "name": "dossier",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /profiling/": "Build a profile from {first_name, last_name, company?}",
            "GET /": "This message",
        },
    }))
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileRequest>,
) -> Response {
    let person = request.full_name();
    let outcome = tokio::time::timeout(
        state.request_timeout,
        state.orchestrator.create_profile(request),
    )
    .await;

    match outcome {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(DossierError::Validation(message))) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": message})),
        )
            .into_response(),
        Ok(Err(err)) => {
            error!(person = %person, error = %err, "Profiling failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
        Err(_) => {
            warn!(
                person = %person,
                timeout_secs = state.request_timeout.as_secs_f64(),
                "Profiling request timed out"
            );
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({
                    "error": format!(
                        "profiling did not finish within {:.0}s",
                        state.request_timeout.as_secs_f64()
                    )
                })),
            )
                .into_response()
        }
    }
}
