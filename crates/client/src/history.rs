//! The signed-in user's history list and the live subscription feeding it.

use std::cmp::Reverse;

use db::models::generated_code::HistoryRecord;
use services::services::{
    history_store::{HistoryStoreError, Snapshot},
    subscription::Subscription,
};
use tracing::{debug, error};

use crate::messages;

/// Newest first; records without a timestamp go last. Stable for ties.
pub fn sort_newest_first(records: &mut [HistoryRecord]) {
    // `None < Some(_)`, so reversing puts undated records at the end.
    records.sort_by_key(|r| Reverse(r.timestamp));
}

#[derive(Debug, Default)]
pub struct HistoryPanel {
    records: Vec<HistoryRecord>,
    subscription: Option<Subscription>,
    /// Bumped on every open/close; snapshots tagged with an older epoch are
    /// from a closed subscription and are dropped.
    epoch: u64,
    subscribed_user: Option<String>,
    loaded: bool,
    load_error: Option<String>,
}

impl HistoryPanel {
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// At least one snapshot (or error) arrived since the subscription opened.
    pub fn has_snapshot(&self) -> bool {
        self.loaded
    }

    pub fn is_subscribed_to(&self, user_id: &str) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_open)
            && self.subscribed_user.as_deref() == Some(user_id)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace any current subscription. `open` receives the new epoch and
    /// must return the subscription that tags its snapshots with it.
    pub fn attach<F>(&mut self, user_id: &str, open: F)
    where
        F: FnOnce(u64) -> Subscription,
    {
        self.close();
        self.epoch += 1;
        self.subscribed_user = Some(user_id.to_string());
        self.subscription = Some(open(self.epoch));
    }

    /// Tear down the subscription and clear the list immediately.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
            self.epoch += 1;
        }
        self.subscribed_user = None;
        self.loaded = false;
        self.records.clear();
        self.load_error = None;
    }

    /// Apply a pushed snapshot. Returns false when it was stale and ignored.
    pub fn apply(&mut self, epoch: u64, snapshot: Snapshot) -> bool {
        if epoch != self.epoch || self.subscription.is_none() {
            debug!(epoch, current = self.epoch, "Dropping stale history snapshot");
            return false;
        }

        self.loaded = true;
        match snapshot {
            Ok(mut records) => {
                sort_newest_first(&mut records);
                self.records = records;
                self.load_error = None;
            }
            Err(e) => {
                error!(error = %e, "History subscription failed");
                self.load_error = Some(load_failure_message(&e));
            }
        }
        true
    }
}

fn load_failure_message(e: &HistoryStoreError) -> String {
    format!("{} {}", messages::HISTORY_LOAD_FAILED, e)
}
