//! API routes
//!
//! `POST /api/openai` relays one prompt to the upstream provider and streams
//! the generated text back as raw UTF-8, one write per upstream delta.

use std::convert::Infallible;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::conversation::Message;
use crate::providers::{CompletionStream, ProviderError};
use crate::AppState;

pub const RELAY_PATH: &str = "/api/openai";

/// Fragments buffered between the upstream task and the response body
const RELAY_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// Failures reported before the response stream is committed
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing query")]
    MissingQuery,

    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] ProviderError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingQuery => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Missing query" })),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "Relay request failed before streaming");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Something went wrong" })),
                )
                    .into_response()
            }
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn relay(State(state): State<AppState>, body: Bytes) -> Result<Response, RelayError> {
    let request: RelayRequest = serde_json::from_slice(&body)?;
    let query = request
        .query
        .filter(|q| !q.is_empty())
        .ok_or(RelayError::MissingQuery)?;

    let span = tracing::info_span!(
        "relay",
        request_id = %Uuid::new_v4(),
        provider = state.provider.name(),
        model = %state.config.model,
    );

    // Single-turn: nothing from earlier exchanges is forwarded
    let messages = [Message::user(query)];
    let mut upstream = state
        .provider
        .stream_chat(&state.config.model, &messages)
        .instrument(span.clone())
        .await?;

    // Nothing is committed until upstream produced text, so a failure before
    // the first fragment is still reported as a 500.
    let first = first_fragment(&mut upstream)
        .instrument(span.clone())
        .await?;
    let upstream: CompletionStream = Box::pin(
        futures::stream::iter(first.map(Ok::<_, ProviderError>)).chain(upstream),
    );

    let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    tokio::spawn(forward(upstream, tx).instrument(span));

    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response())
}

/// Wait for the first non-empty delta. `None` means upstream finished
/// without producing any text.
async fn first_fragment(upstream: &mut CompletionStream) -> Result<Option<String>, ProviderError> {
    while let Some(item) = upstream.next().await {
        let text = item?;
        if !text.is_empty() {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// Pump upstream deltas into the response channel until either side ends.
///
/// An upstream error after the response has started only closes the stream;
/// the client keeps whatever text already arrived.
async fn forward(mut upstream: CompletionStream, tx: mpsc::Sender<Result<Bytes, Infallible>>) {
    let mut fragments = 0usize;
    let mut bytes = 0usize;

    while let Some(item) = upstream.next().await {
        match item {
            Ok(text) if text.is_empty() => continue,
            Ok(text) => {
                fragments += 1;
                bytes += text.len();
                if tx.send(Ok(Bytes::from(text))).await.is_err() {
                    tracing::debug!(fragments, "Client went away, abandoning upstream stream");
                    return;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, fragments, bytes, "Upstream failed mid-stream, closing response");
                return;
            }
        }
    }

    tracing::info!(fragments, bytes, "Relay stream complete");
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(RELAY_PATH, post(relay))
}

/// Full application: routes, CORS and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
