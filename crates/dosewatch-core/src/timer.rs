//! Timer facility abstraction.
//!
//! The engine registers timers through [`TimerFacility`] and reacts to
//! firings through [`AlarmHandler`]; neither side owns a thread pool.
//! Registrations do not survive a process restart -- callers re-register
//! via `AlarmScheduler::reschedule_all` on boot.
//!
//! Two implementations ship here: [`QueueTimer`], a scheduled-task queue
//! the caller drains against an explicit clock (tests, simulation), and
//! [`TokioTimer`], which sleeps a task per registration for live use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ident::AlarmKind;

/// The payload carried from registration to firing: which timer kind for
/// which patient/medication/schedule triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmIntent {
    pub kind: AlarmKind,
    pub patient_id: String,
    pub medication_id: String,
    pub schedule_id: String,
}

impl AlarmIntent {
    pub fn new(kind: AlarmKind, patient_id: &str, medication_id: &str, schedule_id: &str) -> Self {
        Self {
            kind,
            patient_id: patient_id.to_string(),
            medication_id: medication_id.to_string(),
            schedule_id: schedule_id.to_string(),
        }
    }
}

/// Platform timer registration surface.
///
/// Registering an id that is already outstanding replaces the previous
/// registration; cancelling an unknown id is a no-op. Both follow from
/// the at-most-one-timer-per-id invariant the scheduler relies on.
pub trait TimerFacility: Send + Sync {
    fn register_at(&self, id: i32, at_ms: i64, intent: AlarmIntent);
    fn cancel(&self, id: i32);
}

/// Receives timer firings. Implemented by `AlarmDispatcher`.
#[async_trait]
pub trait AlarmHandler: Send + Sync {
    async fn on_alarm(&self, intent: AlarmIntent);
}

#[derive(Debug, Clone)]
struct QueueEntry {
    at_ms: i64,
    intent: AlarmIntent,
}

/// In-process scheduled-task queue.
///
/// Holds registrations until the caller drains the due ones against an
/// explicit `now`. This is the timer for hosts without a wall-clock alarm
/// service, and the backbone of the offline simulator and the test suite.
#[derive(Debug, Default)]
pub struct QueueTimer {
    entries: Mutex<HashMap<i32, QueueEntry>>,
}

impl QueueTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every intent due at or before `now_ms`, in
    /// firing order.
    pub fn drain_due(&self, now_ms: i64) -> Vec<AlarmIntent> {
        let mut entries = self.entries.lock().unwrap();
        let mut due: Vec<(i32, i64)> = entries
            .iter()
            .filter(|(_, e)| e.at_ms <= now_ms)
            .map(|(id, e)| (*id, e.at_ms))
            .collect();
        due.sort_by_key(|&(id, at)| (at, id));
        due.into_iter()
            .filter_map(|(id, _)| entries.remove(&id).map(|e| e.intent))
            .collect()
    }

    /// Instant of the earliest outstanding registration.
    pub fn next_due(&self) -> Option<i64> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .map(|e| e.at_ms)
            .min()
    }

    pub fn outstanding(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_registered(&self, id: i32) -> bool {
        self.entries.lock().unwrap().contains_key(&id)
    }
}

impl TimerFacility for QueueTimer {
    fn register_at(&self, id: i32, at_ms: i64, intent: AlarmIntent) {
        self.entries
            .lock()
            .unwrap()
            .insert(id, QueueEntry { at_ms, intent });
    }

    fn cancel(&self, id: i32) {
        self.entries.lock().unwrap().remove(&id);
    }
}

/// Live timer: one sleeping tokio task per registration.
///
/// The handler is held weakly so the dispatcher -> scheduler -> timer
/// reference chain does not cycle; the embedding application keeps the
/// dispatcher alive.
#[derive(Default)]
pub struct TokioTimer {
    handler: Mutex<Option<Weak<dyn AlarmHandler>>>,
    tasks: Arc<Mutex<HashMap<i32, JoinHandle<()>>>>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the dispatch entry point. Must be called before any timer
    /// fires; firings with no live handler are dropped with a log line.
    pub fn set_handler(&self, handler: Arc<dyn AlarmHandler>) {
        *self.handler.lock().unwrap() = Some(Arc::downgrade(&handler));
    }
}

impl TimerFacility for TokioTimer {
    fn register_at(&self, id: i32, at_ms: i64, intent: AlarmIntent) {
        let handler = self.handler.lock().unwrap().clone();
        let task = tokio::spawn(async move {
            let delay_ms = (at_ms - Utc::now().timestamp_millis()).max(0) as u64;
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            // Spent entries stay in the map until replaced or cancelled;
            // aborting a finished task is a no-op.
            match handler.as_ref().and_then(Weak::upgrade) {
                Some(handler) => handler.on_alarm(intent).await,
                None => debug!(id, "timer fired with no live handler; dropping"),
            }
        });
        if let Some(previous) = self.tasks.lock().unwrap().insert(id, task) {
            previous.abort();
        }
    }

    fn cancel(&self, id: i32) {
        if let Some(task) = self.tasks.lock().unwrap().remove(&id) {
            task.abort();
        }
    }
}
