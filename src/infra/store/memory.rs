//! In-memory alarm store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::core::{Alarm, AlarmStore, SchedulerError};
use crate::util::clock::WallClock;

/// Alarm store backed by a map keyed on alarm id.
pub struct InMemoryAlarmStore {
    alarms: Mutex<BTreeMap<String, Alarm>>,
    clock: Arc<dyn WallClock>,
    fail_reads: AtomicBool,
}

impl InMemoryAlarmStore {
    /// Empty store resolving occurrences against `clock`.
    pub fn new(clock: Arc<dyn WallClock>) -> Self {
        Self {
            alarms: Mutex::new(BTreeMap::new()),
            clock,
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Store pre-filled with `alarms`.
    pub fn with_alarms(clock: Arc<dyn WallClock>, alarms: impl IntoIterator<Item = Alarm>) -> Self {
        let store = Self::new(clock);
        for alarm in alarms {
            store.upsert(alarm);
        }
        store
    }

    /// Insert or replace an alarm.
    pub fn upsert(&self, alarm: Alarm) {
        self.alarms.lock().insert(alarm.id.clone(), alarm);
    }

    /// Remove an alarm, returning it if present.
    pub fn delete(&self, id: &str) -> Option<Alarm> {
        self.alarms.lock().remove(id)
    }

    /// Toggle an alarm. Returns `false` if the id is unknown.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        self.alarms.lock().get_mut(id).is_some_and(|alarm| {
            alarm.is_enabled = enabled;
            true
        })
    }

    /// Look up one alarm.
    pub fn get(&self, id: &str) -> Option<Alarm> {
        self.alarms.lock().get(id).cloned()
    }

    /// Every alarm, enabled or not.
    pub fn all(&self) -> Vec<Alarm> {
        self.alarms.lock().values().cloned().collect()
    }

    /// Make `list_enabled` fail while set.
    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }
}

#[async_trait]
impl AlarmStore for InMemoryAlarmStore {
    async fn list_enabled(&self) -> Result<Vec<Alarm>, SchedulerError> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(SchedulerError::StoreUnavailable("alarm store offline".into()));
        }
        Ok(self
            .alarms
            .lock()
            .values()
            .filter(|alarm| alarm.is_enabled)
            .cloned()
            .collect())
    }

    fn next_occurrence(&self, alarm: &Alarm) -> NaiveDateTime {
        alarm.next_occurrence_after(self.clock.now())
    }
}
