use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::state::AppState;
use crate::error::PipelineError;
use crate::request::{IterateRequest, LessonRequest, SummarizeRequest};

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
        if status.is_client_error() && !matches!(self, PipelineError::UpstreamUnavailable { .. }) {
            debug!(
                code = self.code().as_str(),
                status = status.as_u16(),
                "rejected request"
            );
        } else {
            warn!(
                code = self.code().as_str(),
                status = status.as_u16(),
                error = %self,
                "request failed"
            );
        }
        (status, Json(self.to_body())).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/compose", post(compose_handler))
        .route("/api/iterate", post(iterate_handler))
        .route("/api/summarize", post(summarize_handler))
        .route("/api/health", get(health_handler))
        .route("/api/ping", get(ping_handler))
        .route("/api/debug-upstream", get(debug_upstream_handler))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn compose_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match LessonRequest::from_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match state.pipeline.compose(&request).await {
        Ok(lesson) => Json(lesson).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn iterate_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match IterateRequest::from_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match state.pipeline.iterate(&request).await {
        Ok(addon) => Json(addon).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn summarize_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match SummarizeRequest::from_body(&body) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };
    match state.pipeline.summarize(&request).await {
        Ok(wrapup) => Json(json!({ "wrapup": wrapup })).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let api_key = if state.model().has_credentials() {
        "present"
    } else {
        "missing"
    };
    Json(json!({ "ok": true, "env": { "OPENAI_API_KEY": api_key } }))
}

async fn ping_handler() -> Json<Value> {
    Json(json!({
        "ok": true,
        "message": "pong",
        "ts": chrono::Utc::now().timestamp_millis(),
    }))
}

/// Passes the probe's upstream status and body straight through.
async fn debug_upstream_handler(State(state): State<AppState>) -> Response {
    match state.model().probe().await {
        Ok(reply) => {
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                reply.body,
            )
                .into_response()
        }
        Err(err) => {
            warn!(error = %err, "upstream probe failed");
            PipelineError::from(err).into_response()
        }
    }
}
