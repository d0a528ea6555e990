//! Notification presenter collaborator contract.
//!
//! The engine's only user-visible output goes through this trait; store
//! and timer failures go to the log, never to the user. Rendering belongs
//! to the embedding application.

use tracing::info;

use crate::ident::missed_notification_id;
use crate::medication::{Medication, Schedule};

pub trait NotificationPresenter: Send + Sync {
    /// Present a dose reminder (advance or exact).
    fn show_reminder(&self, title: &str, message: &str, notification_id: i32);

    /// Present a missed-dose alert to the caregiver.
    fn show_missed_alert(&self, medication: &Medication, schedule: &Schedule);

    /// Present a low-supply alert when the compartment cannot cover a dose.
    fn show_low_supply_alert(&self, medication: &Medication);
}

/// Presenter that writes to the tracing log. Default for headless hosts.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl NotificationPresenter for LogPresenter {
    fn show_reminder(&self, title: &str, message: &str, notification_id: i32) {
        info!(notification_id, "{title}: {message}");
    }

    fn show_missed_alert(&self, medication: &Medication, schedule: &Schedule) {
        info!(
            notification_id = missed_notification_id(&medication.id),
            medication = %medication.name,
            schedule_id = %schedule.id,
            "missed dose alert"
        );
    }

    fn show_low_supply_alert(&self, medication: &Medication) {
        info!(
            medication = %medication.name,
            remaining = medication.pills_remaining,
            per_dose = medication.pills_per_dose,
            "low supply alert"
        );
    }
}
