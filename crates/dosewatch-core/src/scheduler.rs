//! Alarm registration for medication schedules.
//!
//! For each active schedule the scheduler keeps at most three outstanding
//! timers: an advance reminder 30 minutes ahead of the dose, the exact
//! reminder at the dose instant, and a missed-dose check 30 minutes after
//! it. Timer ids are deterministic per pair so cancellation always finds
//! the right registration.
//!
//! Validation failures return `false` with no side effects; store errors
//! are logged and abandon the cycle -- the next naturally scheduled
//! occurrence self-corrects.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::ident::{alarm_id, is_valid_patient_id, AlarmKind};
use crate::medication::{Medication, Schedule};
use crate::recurrence::{next_trigger, today_at};
use crate::store::MedicationStore;
use crate::timer::{AlarmIntent, TimerFacility};

/// Lead time for the advance reminder.
const ADVANCE_LEAD_MINUTES: i64 = 30;

/// Grace period after the dose instant before a dose counts as missed.
const MISSED_CHECK_GRACE_MINUTES: i64 = 30;

const MINUTE_MS: i64 = 60_000;

pub struct AlarmScheduler {
    timer: Arc<dyn TimerFacility>,
    store: Arc<dyn MedicationStore>,
    clock: Arc<dyn Clock>,
}

impl AlarmScheduler {
    pub fn new(
        timer: Arc<dyn TimerFacility>,
        store: Arc<dyn MedicationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            timer,
            store,
            clock,
        }
    }

    /// Register the exact reminder for a schedule, rolling `next_scheduled`
    /// forward (and persisting it) if it already passed. On success the
    /// advance reminder is registered as well.
    ///
    /// Returns `false` with no side effects on validation failure, and
    /// `false` after logging when persisting the rolled instant fails.
    pub async fn schedule_reminder(
        &self,
        patient_id: &str,
        medication: &Medication,
        schedule: &Schedule,
    ) -> bool {
        if !is_valid_patient_id(patient_id) {
            warn!(patient_id, "refusing to schedule reminder: invalid patient id");
            return false;
        }
        if !schedule.active {
            debug!(schedule_id = %schedule.id, "schedule inactive; nothing to register");
            return false;
        }

        let now = self.clock.now_ms();
        let mut schedule = schedule.clone();
        if schedule.next_scheduled <= now {
            let next = next_trigger(&schedule, now);
            debug!(
                schedule_id = %schedule.id,
                next_scheduled = next,
                "scheduled instant already passed; rolling forward"
            );
            schedule.begin_cycle(next);

            let mut updated = medication.clone();
            match updated.schedule_mut(&schedule.id) {
                Some(slot) => *slot = schedule.clone(),
                None => {
                    error!(
                        medication_id = %medication.id,
                        schedule_id = %schedule.id,
                        "schedule does not belong to this medication"
                    );
                    return false;
                }
            }
            if let Err(e) = self.store.update_medication(patient_id, &updated).await {
                error!(error = %e, schedule_id = %schedule.id, "failed to persist rolled schedule");
                return false;
            }
        }

        self.timer.register_at(
            alarm_id(AlarmKind::Exact, &medication.id, &schedule.id),
            schedule.next_scheduled,
            AlarmIntent::new(AlarmKind::Exact, patient_id, &medication.id, &schedule.id),
        );
        debug!(
            medication = %medication.name,
            schedule_id = %schedule.id,
            at = schedule.next_scheduled,
            "exact reminder registered"
        );

        self.schedule_advance_reminder(patient_id, medication, &schedule);
        true
    }

    /// Register the advance reminder 30 minutes ahead of `next_scheduled`.
    /// Skipped (returns `false`, not an error) when that instant already
    /// passed; the exact reminder is unaffected.
    pub fn schedule_advance_reminder(
        &self,
        patient_id: &str,
        medication: &Medication,
        schedule: &Schedule,
    ) -> bool {
        if !is_valid_patient_id(patient_id) || !schedule.active {
            return false;
        }
        let at = schedule.next_scheduled - ADVANCE_LEAD_MINUTES * MINUTE_MS;
        if at <= self.clock.now_ms() {
            debug!(
                schedule_id = %schedule.id,
                "advance reminder window already passed; skipping"
            );
            return false;
        }
        self.timer.register_at(
            alarm_id(AlarmKind::Advance, &medication.id, &schedule.id),
            at,
            AlarmIntent::new(AlarmKind::Advance, patient_id, &medication.id, &schedule.id),
        );
        true
    }

    /// Register the missed-dose check at the schedule's time of day plus
    /// the grace period. No-op when the schedule is inactive or the check
    /// instant already passed.
    pub fn schedule_missed_check(
        &self,
        patient_id: &str,
        medication: &Medication,
        schedule: &Schedule,
    ) {
        if !is_valid_patient_id(patient_id) || !schedule.active {
            return;
        }
        let now = self.clock.now_ms();
        let at = today_at(now, schedule.hour, schedule.minute)
            + MISSED_CHECK_GRACE_MINUTES * MINUTE_MS;
        if at <= now {
            debug!(
                schedule_id = %schedule.id,
                "missed-check instant already passed; skipping"
            );
            return;
        }
        self.timer.register_at(
            alarm_id(AlarmKind::MissedCheck, &medication.id, &schedule.id),
            at,
            AlarmIntent::new(
                AlarmKind::MissedCheck,
                patient_id,
                &medication.id,
                &schedule.id,
            ),
        );
        debug!(medication = %medication.name, at, "missed-dose check registered");
    }

    /// Cancel the advance and exact reminders plus any pending missed
    /// check for the pair. Safe to call when nothing is outstanding.
    pub fn cancel_reminders(&self, medication_id: &str, schedule_id: &str) {
        for kind in [AlarmKind::Advance, AlarmKind::Exact, AlarmKind::MissedCheck] {
            self.timer.cancel(alarm_id(kind, medication_id, schedule_id));
        }
        debug!(medication_id, schedule_id, "reminders cancelled");
    }

    /// Restore timer state from persisted data after a process restart:
    /// active schedules get registered, inactive ones get cancelled.
    pub async fn reschedule_all(&self, patient_id: &str, medications: &[Medication]) {
        if medications.is_empty() {
            return;
        }
        info!(count = medications.len(), "rescheduling medication reminders");
        for medication in medications {
            for schedule in &medication.schedules {
                if schedule.active {
                    self.schedule_reminder(patient_id, medication, schedule).await;
                } else {
                    self.cancel_reminders(&medication.id, &schedule.id);
                }
            }
        }
    }
}
