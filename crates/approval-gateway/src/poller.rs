//! Background ingestion of poll answers via `getUpdates` long polling.
//!
//! Used when no webhook URL is configured. Telegram rejects `getUpdates`
//! while a webhook is active, so exactly one of the two ingestion paths
//! runs at a time.

use crate::approval;
use crate::ledger::{ApprovalLedger, Store};
use async_stream::stream;
use std::sync::Arc;
use std::time::Duration;
use telegram_client::{TelegramClient, Update};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Long-polling consumer of the bot's update feed.
pub struct UpdatePoller {
    telegram: Arc<TelegramClient>,
    interval: Duration,
    long_poll_timeout: Duration,
}

impl UpdatePoller {
    pub fn new(
        telegram: Arc<TelegramClient>,
        interval: Duration,
        long_poll_timeout: Duration,
    ) -> Self {
        Self {
            telegram,
            interval,
            long_poll_timeout,
        }
    }

    /// Stream of non-empty update batches.
    ///
    /// Tracks the acknowledgement offset (`max(update_id) + 1`) so each
    /// update is delivered once; polling errors are logged and retried
    /// after a short backoff.
    pub fn stream(self) -> impl Stream<Item = Vec<Update>> {
        stream! {
            let mut offset: Option<i64> = None;
            loop {
                match self
                    .telegram
                    .get_updates(offset, self.long_poll_timeout.as_secs(), &["poll_answer"])
                    .await
                {
                    Ok(updates) => {
                        if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
                            offset = Some(max_id + 1);
                        }
                        if !updates.is_empty() {
                            yield updates;
                        }
                    }
                    Err(e) => {
                        error!("Failed to poll updates: {}", e);
                        sleep(ERROR_BACKOFF).await;
                        continue;
                    }
                }
                sleep(self.interval).await;
            }
        }
    }
}

/// Spawn the polling loop: every batch is folded into the ledger and
/// persisted when it changed anything.
pub fn spawn(
    telegram: Arc<TelegramClient>,
    ledger: Arc<RwLock<ApprovalLedger>>,
    store: Arc<Store>,
    interval: Duration,
    long_poll_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("Update poller started");

        let stream = UpdatePoller::new(telegram, interval, long_poll_timeout).stream();
        tokio::pin!(stream);

        while let Some(updates) = stream.next().await {
            let mut guard = ledger.write().await;
            let applied = approval::apply_updates(&mut guard, &updates);
            if applied > 0 {
                if let Err(e) = store.save(&guard).await {
                    error!("Failed to persist ledger after update batch: {}", e);
                }
            }
        }
    })
}
