//! Webhook endpoint handlers.

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::normalize::{normalize, AttachmentFetcher, InboundPayload, NormalizedRecord};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: AttachmentFetcher,
}

impl AppState {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            fetcher: AttachmentFetcher::from_config(client, config),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Mailgun Webhook
// =============================================================================

/// Webhook response.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<NormalizedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    fn failed(status: &'static str, error: String) -> Self {
        Self {
            status,
            record: None,
            error: Some(error),
        }
    }
}

/// Mailgun inbound webhook endpoint.
///
/// Mailgun posts form-encoded data. Payload problems answer 406, which
/// Mailgun treats as final; attachment download failures answer 502 so
/// Mailgun redelivers the webhook later.
pub async fn mailgun_webhook(
    State(state): State<AppState>,
    Form(payload): Form<InboundPayload>,
) -> impl IntoResponse {
    info!(
        recipient = payload.get("recipient").unwrap_or_default(),
        param_count = payload.len(),
        "mailgun_webhook_received"
    );

    match normalize(&payload, &state.fetcher).await {
        Ok(record) => {
            info!(
                to = ?record.to,
                attachment_count = record.attachments.len(),
                "mailgun_normalized"
            );
            (
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "normalized",
                    record: Some(record),
                    error: None,
                }),
            )
        }
        Err(e) if e.is_caller_error() => {
            warn!(error = %e, "mailgun_payload_rejected");
            (
                StatusCode::NOT_ACCEPTABLE,
                Json(WebhookResponse::failed("rejected", e.to_string())),
            )
        }
        Err(e) => {
            error!(error = %e, "mailgun_attachment_failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(WebhookResponse::failed("error", e.to_string())),
            )
        }
    }
}
