//! Timer-firing dispatch.
//!
//! One entry point, [`AlarmDispatcher::on_alarm`], invoked by the timer
//! facility at a scheduled wall-clock instant. Each invocation runs to
//! completion inside a bounded wake-hold and never lets an error escape
//! back across the timer boundary: invalid input and store failures are
//! logged and abandon the current step only.
//!
//! Persistence writes issued from a handler are fire-and-forget: the
//! handler returns (and releases its wake-hold) once the calls are
//! issued, and the spawned completions tolerate running afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::ident::{is_valid_patient_id, reminder_notification_id, AlarmKind};
use crate::medication::{Medication, Schedule};
use crate::notify::NotificationPresenter;
use crate::scheduler::AlarmScheduler;
use crate::store::MedicationStore;
use crate::timer::{AlarmHandler, AlarmIntent};
use crate::wake::{WakeSource, DISPATCH_HOLD_MAX};

pub struct AlarmDispatcher {
    store: Arc<dyn MedicationStore>,
    presenter: Arc<dyn NotificationPresenter>,
    scheduler: Arc<AlarmScheduler>,
    wake: Arc<dyn WakeSource>,
}

impl AlarmDispatcher {
    pub fn new(
        store: Arc<dyn MedicationStore>,
        presenter: Arc<dyn NotificationPresenter>,
        scheduler: Arc<AlarmScheduler>,
        wake: Arc<dyn WakeSource>,
    ) -> Self {
        Self {
            store,
            presenter,
            scheduler,
            wake,
        }
    }

    fn valid(intent: &AlarmIntent) -> bool {
        if intent.medication_id.is_empty() || intent.schedule_id.is_empty() {
            warn!("alarm fired with missing medication/schedule id; dropping");
            return false;
        }
        if !is_valid_patient_id(&intent.patient_id) {
            warn!(patient_id = %intent.patient_id, "alarm fired with invalid patient id; dropping");
            return false;
        }
        true
    }

    /// Fetch the medication and the addressed schedule, skipping firings
    /// whose schedule was deleted or deactivated since registration.
    async fn load(&self, intent: &AlarmIntent) -> Option<(Medication, Schedule)> {
        let medication = match self
            .store
            .medication(&intent.patient_id, &intent.medication_id)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, medication_id = %intent.medication_id, "failed to load medication");
                return None;
            }
        };
        let Some(schedule) = medication.schedule(&intent.schedule_id).cloned() else {
            error!(schedule_id = %intent.schedule_id, "schedule no longer exists");
            return None;
        };
        if !schedule.active {
            debug!(schedule_id = %schedule.id, "schedule deactivated since registration; dropping");
            return None;
        }
        Some((medication, schedule))
    }

    /// Advance reminder: heads-up 30 minutes ahead. Presentation only --
    /// no dispensation and no missed-check bookkeeping.
    async fn handle_advance(&self, intent: &AlarmIntent) {
        let Some((medication, _schedule)) = self.load(intent).await else {
            return;
        };
        let message = if medication.name.is_empty() {
            "Your next dose is due in 30 minutes.".to_string()
        } else {
            format!("{} is due in 30 minutes.", medication.name)
        };
        self.presenter.show_reminder(
            "Upcoming medication",
            &message,
            reminder_notification_id(&medication.id),
        );
    }

    /// Exact reminder: notify, attempt automatic dispensation, schedule
    /// the missed-dose check, and rotate the schedule to its next
    /// occurrence.
    async fn handle_exact(&self, intent: &AlarmIntent) {
        let Some((medication, schedule)) = self.load(intent).await else {
            return;
        };

        let message = if medication.name.is_empty() {
            "It's time for your scheduled dose.".to_string()
        } else {
            format!(
                "Take {} unit(s) of {} now.",
                medication.pills_per_dose, medication.name
            )
        };
        self.presenter.show_reminder(
            "Time to take your medication",
            &message,
            reminder_notification_id(&medication.id),
        );

        let mut updated = medication.clone();
        let mut rolled = schedule.clone();
        if updated.dispense_dose() {
            // The rotation write below carries the decremented stock and
            // the dispensed flag; mark_dispensed is issued fire-and-forget
            // on top and tolerates landing in either order.
            rolled.dispensed = true;
            let store = Arc::clone(&self.store);
            let intent = intent.clone();
            tokio::spawn(async move {
                if let Err(e) = store
                    .mark_dispensed(&intent.patient_id, &intent.medication_id, &intent.schedule_id)
                    .await
                {
                    warn!(error = %e, schedule_id = %intent.schedule_id, "failed to mark schedule dispensed");
                }
            });
        } else {
            debug!(
                medication = %medication.name,
                remaining = medication.pills_remaining,
                "insufficient stock for automatic dispensation"
            );
            self.presenter.show_low_supply_alert(&medication);
        }

        // Regardless of dispensation outcome, the dose must be confirmed
        // within the grace period.
        self.scheduler
            .schedule_missed_check(&intent.patient_id, &medication, &schedule);

        // Rotate: the fired occurrence is consumed, so this roll computes
        // the next instant, persists it together with the dispensation
        // bookkeeping, and re-registers both reminders.
        self.scheduler
            .schedule_reminder(&intent.patient_id, &updated, &rolled)
            .await;
    }

    /// Missed-dose check: read-verify-act. Never writes `next_scheduled`
    /// and never reschedules; that belongs to the exact-fire cycle.
    async fn handle_missed_check(&self, intent: &AlarmIntent) {
        let status = match self
            .store
            .check_taken(&intent.patient_id, &intent.medication_id, &intent.schedule_id)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, medication_id = %intent.medication_id, "failed to check confirmation state");
                return;
            }
        };

        if status.taken {
            debug!(
                medication_id = %intent.medication_id,
                "dose confirmed inside grace period; no alert"
            );
            return;
        }

        self.presenter
            .show_missed_alert(&status.medication, &status.schedule);

        // Fire-and-forget: a failed history write is logged, not retried.
        let store = Arc::clone(&self.store);
        let intent = intent.clone();
        tokio::spawn(async move {
            match store
                .record_missed(&intent.patient_id, &intent.medication_id, &intent.schedule_id)
                .await
            {
                Ok(()) => debug!(medication_id = %intent.medication_id, "missed dose recorded"),
                Err(e) => warn!(error = %e, medication_id = %intent.medication_id, "failed to record missed dose"),
            }
        });
    }
}

#[async_trait]
impl AlarmHandler for AlarmDispatcher {
    async fn on_alarm(&self, intent: AlarmIntent) {
        // Held for the whole invocation; released on every exit path.
        let _hold = self.wake.hold("dosewatch:alarm", DISPATCH_HOLD_MAX);
        debug!(kind = ?intent.kind, medication_id = %intent.medication_id, "alarm fired");

        if !Self::valid(&intent) {
            return;
        }
        match intent.kind {
            AlarmKind::Advance => self.handle_advance(&intent).await,
            AlarmKind::Exact => self.handle_exact(&intent).await,
            AlarmKind::MissedCheck => self.handle_missed_check(&intent).await,
        }
    }
}
