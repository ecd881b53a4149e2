//! Approval gateway - entry point.

use approval_gateway::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::Config,
    ledger::{self, ApprovalLedger, Store},
    poller,
};
use std::net::SocketAddr;
use telegram_client::TelegramClient;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting approval gateway");

    // Initialize storage
    let store = if config.ledger.persist {
        info!("Ledger file: {}", config.ledger.path.display());
        Store::file(config.ledger.path.clone())
    } else {
        info!("Persistence disabled, using in-memory ledger");
        Store::memory()
    };

    // Load existing ledger
    let ledger = match store.load().await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to load ledger: {}", e);
            info!("Starting with empty ledger");
            ApprovalLedger::new()
        }
    };

    // Initialize bot client when credentials are configured
    let telegram = match (&config.telegram.bot_token, &config.telegram.chat_id) {
        (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
            match TelegramClient::new(&config.telegram.api_url, token, config.telegram.timeout) {
                Ok(c) => Some(c),
                Err(e) => {
                    error!("Failed to create Telegram client: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ => {
            warn!(
                "TELEGRAM__BOT_TOKEN or TELEGRAM__CHAT_ID not set; \
                 submission and verification endpoints will answer 500 until configured"
            );
            None
        }
    };

    // Health check
    if let Some(client) = &telegram {
        if client.health_check().await {
            info!("Telegram bot API reachable");
        } else {
            warn!("Telegram bot API health check failed - continuing anyway");
        }
    }

    // Create application state
    let state = AppState::new(
        ledger,
        store,
        telegram,
        config.telegram.chat_id.clone(),
        config.webhook.secret_token.clone(),
    );

    // One ingestion path at a time: Telegram rejects getUpdates while a
    // webhook is registered.
    if let Some(public_url) = &config.webhook.public_url {
        let webhook_url = format!("{}/telegram/webhook", public_url.trim_end_matches('/'));
        match &state.telegram {
            Some(client) => match client
                .set_webhook(&webhook_url, config.webhook.secret_token.as_deref())
                .await
            {
                Ok(()) => info!(url = %webhook_url, "Webhook registered"),
                Err(e) => {
                    error!("Failed to register webhook: {}", e);
                    std::process::exit(1);
                }
            },
            None => {
                warn!("WEBHOOK__PUBLIC_URL set but bot credentials are missing, webhook not registered");
            }
        }
    } else if config.poller.enabled {
        match &state.telegram {
            Some(client) => {
                poller::spawn(
                    client.clone(),
                    state.ledger.clone(),
                    state.store.clone(),
                    config.poller.interval,
                    config.poller.long_poll_timeout,
                );
            }
            None => {
                warn!("Poller enabled but bot credentials are missing, poll answers will not be ingested");
            }
        }
    } else {
        warn!("No webhook configured and poller disabled, poll answers will not be ingested");
    }

    // Prune expired poll records in the background
    ledger::spawn_pruner(state.ledger.clone(), state.store.clone(), config.ledger.ttl);

    // Create rate limiter from config
    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);

    // Create router with rate limiting
    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
