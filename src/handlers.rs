//! HTTP surface.
//!
//! Thin axum handlers over the security gateway. Error mapping lives on
//! `PaymentError`; handlers only translate success shapes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::PaymentError;
use crate::models::{CancelResponse, CardDetails, CreateSessionRequest};
use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    active_sessions: usize,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .route("/payment_sessions", post(create_session_handler))
        .route("/payment_sessions/:session_id", get(get_session_handler))
        .route(
            "/payment_sessions/:session_id/complete",
            post(complete_session_handler),
        )
        .route(
            "/payment_sessions/:session_id/cancel",
            post(cancel_session_handler),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root_handler() -> &'static str {
    "Payment Sessions API"
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.store.len(),
    })
}

async fn create_session_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, PaymentError> {
    let session = state.gateway.create_session(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, PaymentError> {
    let session = state.gateway.session_snapshot(&session_id)?;
    Ok(Json(session))
}

async fn complete_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(card): Json<CardDetails>,
) -> Result<impl IntoResponse, PaymentError> {
    let receipt = state.gateway.submit_payment(&session_id, card).await?;
    Ok(Json(receipt))
}

async fn cancel_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, PaymentError> {
    let cancelled = state.gateway.cancel_session(&session_id).await?;
    Ok(Json(CancelResponse { cancelled }))
}
