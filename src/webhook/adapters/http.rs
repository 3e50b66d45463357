//! `axum` surface for the webhook pipeline.

use crate::propagation::ports::TrackingService;
use crate::webhook::{
    domain::{SIGNATURE_HEADER, WebhookResponse},
    services::{WebhookRequest, WebhookService},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use mockable::Clock;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Liveness response body.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Builds the HTTP router for `service`.
///
/// `GET /healthz` answers liveness; every other path is routed to the webhook
/// pipeline by its last segment and only accepts `POST`.
#[must_use]
pub fn router<T, C>(service: WebhookService<T, C>) -> Router
where
    T: TrackingService + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/healthz", get(health))
        .fallback(webhook::<T, C>)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(service))
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn webhook<T, C>(
    State(service): State<Arc<WebhookService<T, C>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    T: TrackingService + 'static,
    C: Clock + Send + Sync + 'static,
{
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "method_not_allowed", "message": "webhooks must be POSTed" })),
        )
            .into_response();
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let request = WebhookRequest::new(uri.path(), signature, body.to_vec());
    into_http(service.respond(&request).await)
}

fn into_http(response: WebhookResponse) -> Response {
    let (status, body) = response.into_parts();
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, Json(body)).into_response()
}
