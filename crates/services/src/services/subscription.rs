//! Explicit handles for live listeners (auth state, collection snapshots).

use std::{future::Future, sync::Arc};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Single delivery callback shared between a subscription's task and its owner.
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A running listener. Delivery stops once the subscription is closed or
/// dropped; nothing is delivered after `close` returns except a value that was
/// already being handed to the callback.
pub struct Subscription {
    label: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the listener task. `run` receives the cancellation token and must
    /// return once it fires.
    pub fn spawn<F, Fut>(label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let label = label.into();
        let token = CancellationToken::new();
        let task = tokio::spawn(run(token.clone()));
        debug!(subscription = %label, "Subscription opened");
        Self {
            label,
            token,
            task: Some(task),
        }
    }

    pub fn is_open(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn close(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(subscription = %self.label, "Subscription closed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("open", &self.is_open())
            .finish()
    }
}
