//! Request and response types for the HTTP API.
//!
//! Browser-facing bodies use camelCase field names. Request fields are
//! defaulted rather than required so a missing field surfaces as a 400
//! validation error instead of a deserialization failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/submit-phone`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmitPhoneRequest {
    pub phone_number: String,
    pub country: String,
}

/// Body of `POST /api/verify-code`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyCodeRequest {
    pub phone_number: String,
    pub verification_code: String,
}

/// Body of `POST /api/check-approval`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckApprovalRequest {
    pub poll_id: String,
}

/// Response to a successful phone submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitPhoneResponse {
    pub success: bool,
}

/// Outcome of a verification or approval check.
///
/// Renders as 200 `{"approved": ...}` once decided, 202
/// `{"status": "pending"}` (with the poll id when one was just opened)
/// while the operator has not answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalResponse {
    Decided { approved: bool },
    Pending { poll_id: Option<String> },
}

#[derive(Serialize)]
struct DecisionBody {
    approved: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_id: Option<String>,
}

impl IntoResponse for ApprovalResponse {
    fn into_response(self) -> Response {
        match self {
            ApprovalResponse::Decided { approved } => {
                (StatusCode::OK, Json(DecisionBody { approved })).into_response()
            }
            ApprovalResponse::Pending { poll_id } => (
                StatusCode::ACCEPTED,
                Json(PendingBody {
                    status: "pending",
                    poll_id,
                }),
            )
                .into_response(),
        }
    }
}

/// Acknowledgement body for webhook deliveries. Serializes to `{}`.
#[derive(Debug, Serialize)]
pub struct WebhookAck {}

/// Response to `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pending_polls: usize,
    pub decided_polls: usize,
    pub telegram_api_healthy: bool,
}
