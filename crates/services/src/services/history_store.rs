//! Document store for generated-code history, with live collection snapshots.

use async_trait::async_trait;
use db::{
    DBService,
    models::{
        collection_path::CollectionPath,
        generated_code::{CreateHistoryRecord, HistoryRecord},
    },
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::subscription::{Callback, Subscription};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryStoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for HistoryStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.to_string())
    }
}

pub type Snapshot = Result<Vec<HistoryRecord>, HistoryStoreError>;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Write one record into `path`. The store assigns id and timestamp.
    async fn add(
        &self,
        path: &CollectionPath,
        record: CreateHistoryRecord,
    ) -> Result<HistoryRecord, HistoryStoreError>;

    /// Deliver the full contents of `path` now and after every change to it.
    /// Snapshots are unordered.
    fn subscribe(&self, path: CollectionPath, on_snapshot: Callback<Snapshot>) -> Subscription;
}

/// SQLite-backed store. Writes go through [`HistoryStore::add`], which
/// announces the touched collection to every live subscription.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    db: DBService,
    changes: broadcast::Sender<CollectionPath>,
}

impl SqliteHistoryStore {
    const CHANGE_FEED_CAPACITY: usize = 64;

    pub fn new(db: DBService) -> Self {
        let (changes, _) = broadcast::channel(Self::CHANGE_FEED_CAPACITY);
        Self { db, changes }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn add(
        &self,
        path: &CollectionPath,
        record: CreateHistoryRecord,
    ) -> Result<HistoryRecord, HistoryStoreError> {
        if record.user_id != path.user_id() {
            warn!(
                path = %path,
                record_user = %record.user_id,
                "Rejected history write outside the owner's collection"
            );
            return Err(HistoryStoreError::PermissionDenied(format!(
                "user {} cannot write to {}",
                record.user_id, path
            )));
        }

        let created = HistoryRecord::create(&self.db.pool, path, &record).await?;
        info!(path = %path, record_id = %created.id, "History record written");

        // No receivers simply means nobody is listening.
        let _ = self.changes.send(path.clone());
        Ok(created)
    }

    fn subscribe(&self, path: CollectionPath, on_snapshot: Callback<Snapshot>) -> Subscription {
        // Subscribe to the feed before the first read so no write is missed.
        let mut changes = self.changes.subscribe();
        let pool = self.db.pool.clone();
        let label = format!("history:{path}");

        Subscription::spawn(label, move |token| async move {
            let load = |pool: sqlx::SqlitePool, path: CollectionPath| async move {
                HistoryRecord::find_by_collection(&pool, &path)
                    .await
                    .map_err(|e| {
                        error!(path = %path, error = %e, "Failed to load history snapshot");
                        HistoryStoreError::from(e)
                    })
            };

            tokio::select! {
                _ = token.cancelled() => return,
                snapshot = load(pool.clone(), path.clone()) => on_snapshot(snapshot),
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(changed) if changed == path => {
                            let snapshot = load(pool.clone(), path.clone()).await;
                            if token.is_cancelled() {
                                break;
                            }
                            on_snapshot(snapshot);
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(path = %path, skipped, "Change feed lagged, reloading");
                            let snapshot = load(pool.clone(), path.clone()).await;
                            if token.is_cancelled() {
                                break;
                            }
                            on_snapshot(snapshot);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::mpsc;

    use super::*;

    fn new_record(user_id: &str, code: &str) -> CreateHistoryRecord {
        CreateHistoryRecord {
            component: "LED".to_string(),
            description: "blink".to_string(),
            code: code.to_string(),
            user_id: user_id.to_string(),
        }
    }

    async fn store() -> SqliteHistoryStore {
        SqliteHistoryStore::new(DBService::new_in_memory().await.unwrap())
    }

    fn collect() -> (Callback<Snapshot>, mpsc::UnboundedReceiver<Snapshot>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: Callback<Snapshot> = Arc::new(move |snapshot| {
            let _ = tx.send(snapshot);
        });
        (callback, rx)
    }

    #[tokio::test]
    async fn subscription_delivers_initial_and_updated_snapshots() {
        let store = store().await;
        let path = CollectionPath::generated_code("app", "alice").unwrap();
        store.add(&path, new_record("alice", "first")).await.unwrap();

        let (callback, mut rx) = collect();
        let _subscription = store.subscribe(path.clone(), callback);

        let initial = rx.recv().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        store.add(&path, new_record("alice", "second")).await.unwrap();
        let updated = rx.recv().await.unwrap().unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().any(|r| r.code == "second"));
    }

    #[tokio::test]
    async fn writes_to_other_collections_do_not_notify() {
        let store = store().await;
        let alice = CollectionPath::generated_code("app", "alice").unwrap();
        let bob = CollectionPath::generated_code("app", "bob").unwrap();

        let (callback, mut rx) = collect();
        let _subscription = store.subscribe(alice, callback);
        assert!(rx.recv().await.unwrap().unwrap().is_empty());

        store.add(&bob, new_record("bob", "b")).await.unwrap();
        let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(next.is_err(), "alice's listener saw bob's write");
    }

    #[tokio::test]
    async fn rejects_writes_into_another_users_collection() {
        let store = store().await;
        let alice = CollectionPath::generated_code("app", "alice").unwrap();

        let err = store.add(&alice, new_record("mallory", "x")).await.unwrap_err();
        assert!(matches!(err, HistoryStoreError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn closed_subscription_stops_delivering() {
        let store = store().await;
        let path = CollectionPath::generated_code("app", "alice").unwrap();

        let (callback, mut rx) = collect();
        let mut subscription = store.subscribe(path.clone(), callback);
        rx.recv().await.unwrap().unwrap();

        subscription.close();
        store.add(&path, new_record("alice", "late")).await.unwrap();

        let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(matches!(next, Ok(None) | Err(_)));
    }
}
