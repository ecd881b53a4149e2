//! Ledger persistence backends.

use crate::error::GatewayError;
use crate::ledger::ApprovalLedger;
use std::path::PathBuf;
use tracing::{debug, info};

/// Storage backend for the approval ledger.
///
/// File-backed in production so decisions survive a restart; in-memory
/// for tests and for deployments that explicitly opt out of persistence.
#[derive(Debug)]
pub enum Store {
    File(FileStore),
    Memory(MemoryStore),
}

impl Store {
    /// Create a file-backed store.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Store::File(FileStore { path: path.into() })
    }

    /// Create an in-memory store. Saves are no-ops and loads return an
    /// empty ledger.
    pub fn memory() -> Self {
        Store::Memory(MemoryStore)
    }

    /// Persist the ledger.
    pub async fn save(&self, ledger: &ApprovalLedger) -> Result<(), GatewayError> {
        match self {
            Store::File(store) => store.save(ledger).await,
            Store::Memory(_) => Ok(()),
        }
    }

    /// Load the ledger. A missing file is not an error: the service may
    /// simply never have persisted anything yet.
    pub async fn load(&self) -> Result<ApprovalLedger, GatewayError> {
        match self {
            Store::File(store) => store.load().await,
            Store::Memory(_) => Ok(ApprovalLedger::new()),
        }
    }
}

/// File-backed store writing the ledger as JSON.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    async fn save(&self, ledger: &ApprovalLedger) -> Result<(), GatewayError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(ledger)?;

        // Write to a temp file and rename so a crash mid-write never
        // leaves a truncated ledger behind.
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Persisted {} poll records to {:?}", ledger.count(), self.path);
        Ok(())
    }

    async fn load(&self) -> Result<ApprovalLedger, GatewayError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => {
                let ledger: ApprovalLedger = serde_json::from_str(&json)?;
                info!(
                    "Loaded {} poll records from {:?}",
                    ledger.count(),
                    self.path
                );
                Ok(ledger)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No ledger file at {:?}, starting empty", self.path);
                Ok(ApprovalLedger::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store. Holds nothing; the ledger itself lives in the
/// shared application state.
#[derive(Debug)]
pub struct MemoryStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Verdict;
    use chrono::Utc;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approvals.json");
        let store = Store::file(&path);

        let mut ledger = ApprovalLedger::new();
        ledger.open_poll("poll-1", Some("+14155551234".into()));
        ledger.record_answer("poll-1", 42, Verdict::Approved, Utc::now());

        store.save(&ledger).await.unwrap();
        let restored = store.load().await.unwrap();

        assert_eq!(restored.verdict("poll-1"), Some(Verdict::Approved));
        assert_eq!(restored.get("poll-1").unwrap().decided_update_id, Some(42));
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::file(dir.path().join("does-not-exist.json"));

        let ledger = store.load().await.unwrap();
        assert_eq!(ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/approvals.json");
        let store = Store::file(&path);

        store.save(&ApprovalLedger::new()).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_memory_store_is_ephemeral() {
        let store = Store::memory();

        let mut ledger = ApprovalLedger::new();
        ledger.open_poll("poll-1", None);

        store.save(&ledger).await.unwrap();
        let restored = store.load().await.unwrap();
        assert_eq!(restored.count(), 0);
    }
}
