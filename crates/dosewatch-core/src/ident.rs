//! Shared id and validation utilities.
//!
//! Alarm ids are deterministic per `(medication, schedule, kind)` so that a
//! cancellation always finds the timer a previous registration created.
//! Collisions between different pairs falling into the same bucket are an
//! accepted trade-off; the contract is stability, not global uniqueness.

use serde::{Deserialize, Serialize};

/// Placeholder patient id written by the pairing flow before a real
/// patient is linked. Never identifies a real patient.
pub const SENTINEL_PATIENT_ID: &str = "current_user_id";

/// Alarm ids are bucketed into this many slots per kind.
const ALARM_ID_BUCKETS: i32 = 10_000;

/// Notification ids share a smaller bucket space per channel.
const NOTIFICATION_ID_BUCKETS: i32 = 1_000;

/// Base notification id for dose reminders (advance and exact).
pub const REMINDER_NOTIFICATION_ID_BASE: i32 = 1_000;

/// Base notification id for missed-dose alerts.
pub const MISSED_NOTIFICATION_ID_BASE: i32 = 2_000;

/// The three timer kinds the engine registers per schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    /// Fires at the literal dose time.
    Exact,
    /// Fires 30 minutes ahead of the dose time.
    Advance,
    /// Fires after the grace period to detect an unconfirmed dose.
    MissedCheck,
}

impl AlarmKind {
    /// Per-kind id base, keeping the three timer families in disjoint
    /// ranges so one pair can hold all three at once.
    pub fn id_base(self) -> i32 {
        match self {
            AlarmKind::Exact => 10_000,
            AlarmKind::Advance => 20_000,
            AlarmKind::MissedCheck => 30_000,
        }
    }
}

/// `true` when the id can identify a real patient: non-empty and not the
/// provisioning sentinel.
pub fn is_valid_patient_id(patient_id: &str) -> bool {
    !patient_id.is_empty() && patient_id != SENTINEL_PATIENT_ID
}

/// Polynomial string hash (`h = h * 31 + byte`, wrapping). Deterministic
/// across processes, unlike the std hasher.
fn str_hash(s: &str) -> i32 {
    s.bytes()
        .fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(b as i32))
}

/// Deterministic timer id for a `(medication, schedule)` pair and kind.
pub fn alarm_id(kind: AlarmKind, medication_id: &str, schedule_id: &str) -> i32 {
    let combined = str_hash(medication_id)
        .wrapping_mul(31)
        .wrapping_add(str_hash(schedule_id));
    kind.id_base() + combined.rem_euclid(ALARM_ID_BUCKETS)
}

/// Notification id for dose reminders, stable per medication.
pub fn reminder_notification_id(medication_id: &str) -> i32 {
    REMINDER_NOTIFICATION_ID_BASE + str_hash(medication_id).rem_euclid(NOTIFICATION_ID_BUCKETS)
}

/// Notification id for missed-dose alerts, stable per medication.
pub fn missed_notification_id(medication_id: &str) -> i32 {
    MISSED_NOTIFICATION_ID_BASE + str_hash(medication_id).rem_euclid(NOTIFICATION_ID_BUCKETS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_sentinel_patient_ids_are_invalid() {
        assert!(!is_valid_patient_id(""));
        assert!(!is_valid_patient_id(SENTINEL_PATIENT_ID));
        assert!(is_valid_patient_id("patient-42"));
    }

    #[test]
    fn alarm_id_is_stable_per_pair() {
        let a = alarm_id(AlarmKind::Exact, "med-1", "sched-1");
        let b = alarm_id(AlarmKind::Exact, "med-1", "sched-1");
        assert_eq!(a, b);
    }

    #[test]
    fn alarm_kinds_occupy_disjoint_ranges() {
        let exact = alarm_id(AlarmKind::Exact, "med-1", "sched-1");
        let advance = alarm_id(AlarmKind::Advance, "med-1", "sched-1");
        let missed = alarm_id(AlarmKind::MissedCheck, "med-1", "sched-1");
        assert!((10_000..20_000).contains(&exact));
        assert!((20_000..30_000).contains(&advance));
        assert!((30_000..40_000).contains(&missed));
    }

    #[test]
    fn alarm_id_never_panics_on_extreme_hashes() {
        // Long ids drive the wrapping hash through negative territory;
        // rem_euclid must keep the bucket non-negative.
        let id = alarm_id(AlarmKind::Exact, &"z".repeat(512), &"y".repeat(512));
        assert!((10_000..20_000).contains(&id));
    }

    #[test]
    fn notification_ids_fit_their_channel_range() {
        let reminder = reminder_notification_id("med-xyz");
        let missed = missed_notification_id("med-xyz");
        assert!((1_000..2_000).contains(&reminder));
        assert!((2_000..3_000).contains(&missed));
    }
}
