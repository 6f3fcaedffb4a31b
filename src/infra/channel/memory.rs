//! In-memory delivery channel with a hard quota.
//!
//! Behaves like a platform notification queue: entries are keyed by
//! identifier, re-adding an identifier replaces it, cancelling an unknown
//! identifier is a no-op, and adds beyond the quota are rejected. Failure
//! and latency injection make it usable for exercising the scheduler's
//! error paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{ChannelError, DateMatch, DeliveryChannel, EntryContent, ScheduledEntry, Trigger};

#[derive(Default)]
struct ChannelInner {
    entries: BTreeMap<String, ScheduledEntry>,
    failing_adds: HashSet<String>,
    fail_list: bool,
    fail_cancel: bool,
    latency: Option<Duration>,
    add_calls: usize,
}

/// Quota-limited in-memory channel. Clones share the same queue.
#[derive(Clone)]
pub struct InMemoryChannel {
    max_total: usize,
    inner: Arc<Mutex<ChannelInner>>,
}

impl InMemoryChannel {
    /// Create an empty channel holding at most `max_total` entries.
    #[must_use]
    pub fn new(max_total: usize) -> Self {
        Self {
            max_total,
            inner: Arc::new(Mutex::new(ChannelInner::default())),
        }
    }

    /// Seed an entry belonging to another producer.
    pub fn insert_foreign(&self, identifier: impl Into<String>, category: impl Into<String>) {
        let identifier = identifier.into();
        let entry = ScheduledEntry {
            identifier: identifier.clone(),
            category: category.into(),
            trigger: Trigger {
                matching: DateMatch {
                    weekday: None,
                    hour: 12,
                    minute: 0,
                },
                repeats: false,
            },
            content: EntryContent {
                title: identifier.clone(),
                body: String::new(),
                alarm_id: String::new(),
                weekday: None,
            },
        };
        self.inner.lock().entries.insert(identifier, entry);
    }

    /// Make every future `add` of `identifier` fail.
    pub fn fail_add_for(&self, identifier: impl Into<String>) {
        self.inner.lock().failing_adds.insert(identifier.into());
    }

    /// Clear all injected add failures.
    pub fn clear_add_failures(&self) {
        self.inner.lock().failing_adds.clear();
    }

    /// Make `pending` fail while set.
    pub fn set_list_failure(&self, fail: bool) {
        self.inner.lock().fail_list = fail;
    }

    /// Make `cancel` fail while set.
    pub fn set_cancel_failure(&self, fail: bool) {
        self.inner.lock().fail_cancel = fail;
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().latency = latency;
    }

    /// Snapshot of pending entries, ordered by identifier.
    #[must_use]
    pub fn entries(&self) -> Vec<ScheduledEntry> {
        self.inner.lock().entries.values().cloned().collect()
    }

    /// Whether `identifier` is pending.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.inner.lock().entries.contains_key(identifier)
    }

    /// Pending entries registered for `alarm_id`.
    #[must_use]
    pub fn entries_for(&self, alarm_id: &str) -> Vec<ScheduledEntry> {
        let ids = crate::util::serde::all_entry_identifiers(alarm_id);
        self.inner
            .lock()
            .entries
            .values()
            .filter(|e| e.is_alarm() && ids.contains(&e.identifier))
            .cloned()
            .collect()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total `add` calls received, successful or not.
    #[must_use]
    pub fn add_calls(&self) -> usize {
        self.inner.lock().add_calls
    }

    async fn delay(&self) {
        let latency = self.inner.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl DeliveryChannel for InMemoryChannel {
    /// Lists in identifier order.
    async fn pending(&self) -> Result<Vec<ScheduledEntry>, ChannelError> {
        self.delay().await;
        let inner = self.inner.lock();
        if inner.fail_list {
            return Err(ChannelError::Rejected("list unavailable".into()));
        }
        Ok(inner.entries.values().cloned().collect())
    }

    async fn add(&self, entry: ScheduledEntry) -> Result<(), ChannelError> {
        self.delay().await;
        let mut inner = self.inner.lock();
        inner.add_calls += 1;
        if inner.failing_adds.contains(&entry.identifier) {
            return Err(ChannelError::Rejected(format!(
                "add {} refused",
                entry.identifier
            )));
        }
        if !inner.entries.contains_key(&entry.identifier) && inner.entries.len() >= self.max_total
        {
            return Err(ChannelError::Full(inner.entries.len()));
        }
        inner.entries.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    async fn cancel(&self, identifiers: &[String]) -> Result<(), ChannelError> {
        self.delay().await;
        let mut inner = self.inner.lock();
        if inner.fail_cancel {
            return Err(ChannelError::Rejected("cancel unavailable".into()));
        }
        for identifier in identifiers {
            inner.entries.remove(identifier);
        }
        Ok(())
    }
}
