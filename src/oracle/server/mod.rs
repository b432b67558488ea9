// SPDX-License-Identifier: MIT

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::OracleError;
use crate::oracle::agent::{ChatEvent, ChatRequest, ChatResponse, OracleAgent};

/// Routes of the oracle service
pub fn router(agent: Arc<OracleAgent>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(agent)
}

pub async fn serve(
    addr: &str,
    agent: Arc<OracleAgent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(agent)).await?;
    Ok(())
}

/// Failed turn, reported as a 500 with `{"error": ...}`
pub struct ApiError(OracleError);

impl From<OracleError> for ApiError {
    fn from(e: OracleError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("Chat request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(agent): State<Arc<OracleAgent>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    Ok(Json(agent.chat(payload).await?))
}

async fn chat_stream(
    State(agent): State<Arc<OracleAgent>>,
    Json(payload): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        // The error has already been sent as an event
        if let Err(e) = agent.chat_stream(payload, tx).await {
            log::error!("Streaming chat failed: {}", e);
        }
    });

    let stream = ReceiverStream::new(rx).map(|event: ChatEvent| {
        Ok(Event::default().json_data(&event).unwrap_or_else(|e| {
            Event::default()
                .event("error")
                .data(format!("failed to encode event: {}", e))
        }))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}
