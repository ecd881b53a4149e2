//! HTTP API for the approval gateway.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::error::GatewayError;
use crate::ledger::{ApprovalLedger, Store};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use telegram_client::TelegramClient;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
///
/// The bot client and chat id are optional: the service starts without
/// them and the handlers that need them answer with a configuration
/// error until they are provided.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<ApprovalLedger>>,
    pub store: Arc<Store>,
    pub telegram: Option<Arc<TelegramClient>>,
    pub chat_id: Option<String>,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(
        ledger: ApprovalLedger,
        store: Store,
        telegram: Option<TelegramClient>,
        chat_id: Option<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            store: Arc::new(store),
            telegram: telegram.map(Arc::new),
            chat_id,
            webhook_secret,
        }
    }

    /// Bot client and operator chat id, or a configuration error when
    /// either is missing.
    pub(crate) fn telegram(&self) -> Result<(&TelegramClient, &str), GatewayError> {
        match (self.telegram.as_deref(), self.chat_id.as_deref()) {
            (Some(client), Some(chat_id)) => Ok((client, chat_id)),
            _ => Err(GatewayError::Configuration),
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(60))
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/submit-phone", post(handlers::submit_phone))
        .route("/api/verify-code", post(handlers::verify_code))
        .route("/api/check-approval", post(handlers::check_approval))
        .route("/telegram/webhook", post(handlers::telegram_webhook))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
