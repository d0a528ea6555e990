//! Medication and schedule value types.
//!
//! These carry no behavior beyond their own invariants; the persistent
//! store is the source of truth and all mutation flows back through it.
//! Timestamps are epoch milliseconds throughout.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Days of the week a weekly schedule fires on, Monday-first.
pub type DoseDays = [bool; 7];

/// A medication tracked by the dispenser, owning its schedules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    /// Units dispensed per dose. Always positive.
    pub pills_per_dose: u32,
    /// Units left in the dispenser compartment.
    pub pills_remaining: u32,
    /// Dispenser compartment slot (1-6 on the reference hardware).
    #[serde(default)]
    pub compartment: u8,
    #[serde(default)]
    pub notes: String,
    pub schedules: Vec<Schedule>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Medication {
    pub fn new(id: impl Into<String>, name: impl Into<String>, pills_per_dose: u32) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            name: name.into(),
            pills_per_dose: pills_per_dose.max(1),
            pills_remaining: 0,
            compartment: 0,
            notes: String::new(),
            schedules: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up an owned schedule by id.
    pub fn schedule(&self, schedule_id: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == schedule_id)
    }

    pub fn schedule_mut(&mut self, schedule_id: &str) -> Option<&mut Schedule> {
        self.schedules.iter_mut().find(|s| s.id == schedule_id)
    }

    /// Take one dose out of the compartment.
    ///
    /// Succeeds only when enough units remain; on failure the state is
    /// left untouched so a low-supply alert can be raised instead.
    pub fn dispense_dose(&mut self) -> bool {
        if self.pills_remaining >= self.pills_per_dose {
            self.pills_remaining -= self.pills_per_dose;
            self.updated_at = Utc::now().timestamp_millis();
            true
        } else {
            false
        }
    }
}

/// A recurring trigger specification for one medication dose.
///
/// Either interval-based (`every interval_hours`, phase-anchored at
/// `hour:minute`) or weekly (`hour:minute` on flagged weekdays).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    /// Back-reference to the owning medication; non-owning.
    pub medication_id: String,
    pub active: bool,
    pub interval_mode: bool,
    /// Hours between doses. Read only in interval mode; always positive.
    pub interval_hours: u32,
    /// Wall-clock hour of day, 0-23.
    pub hour: u32,
    /// Wall-clock minute, 0-59.
    pub minute: u32,
    /// Monday-first weekday flags. Read only in weekly mode.
    pub days_of_week: DoseDays,
    /// Next trigger instant, epoch milliseconds.
    pub next_scheduled: i64,
    /// Whether the current dose was confirmed as taken.
    pub taking_confirmed: bool,
    pub last_taken: Option<i64>,
    /// Whether the device dispensed the current dose.
    pub dispensed: bool,
    /// Whether the drop sensor saw the dose leave the chute.
    pub detected_by_sensor: bool,
    pub dispensed_at: Option<i64>,
    pub detected_at: Option<i64>,
}

impl Schedule {
    /// Weekly schedule at `hour:minute` on the flagged days.
    pub fn weekly(
        medication_id: impl Into<String>,
        hour: u32,
        minute: u32,
        days_of_week: DoseDays,
    ) -> Result<Self, ValidationError> {
        validate_time_of_day(hour, minute)?;
        Ok(Self::raw(medication_id.into(), false, 0, hour, minute, days_of_week))
    }

    /// Interval schedule firing every `interval_hours`, anchored at
    /// `hour:minute` as the daily baseline.
    pub fn interval(
        medication_id: impl Into<String>,
        hour: u32,
        minute: u32,
        interval_hours: u32,
    ) -> Result<Self, ValidationError> {
        validate_time_of_day(hour, minute)?;
        if interval_hours == 0 {
            return Err(ValidationError::InvalidValue {
                field: "interval_hours".into(),
                message: "must be positive".into(),
            });
        }
        Ok(Self::raw(
            medication_id.into(),
            true,
            interval_hours,
            hour,
            minute,
            [false; 7],
        ))
    }

    fn raw(
        medication_id: String,
        interval_mode: bool,
        interval_hours: u32,
        hour: u32,
        minute: u32,
        days_of_week: DoseDays,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            medication_id,
            active: true,
            interval_mode,
            interval_hours,
            hour,
            minute,
            days_of_week,
            next_scheduled: 0,
            taking_confirmed: false,
            last_taken: None,
            dispensed: false,
            detected_by_sensor: false,
            dispensed_at: None,
            detected_at: None,
        }
    }

    /// Reset per-cycle confirmation state when rolling to the next
    /// occurrence: the new dose starts unconfirmed.
    pub fn begin_cycle(&mut self, next_scheduled: i64) {
        self.next_scheduled = next_scheduled;
        self.taking_confirmed = false;
    }
}

fn validate_time_of_day(hour: u32, minute: u32) -> Result<(), ValidationError> {
    if hour > 23 {
        return Err(ValidationError::InvalidValue {
            field: "hour".into(),
            message: format!("{hour} is out of range 0-23"),
        });
    }
    if minute > 59 {
        return Err(ValidationError::InvalidValue {
            field: "minute".into(),
            message: format!("{minute} is out of range 0-59"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn med_with_stock(remaining: u32, per_dose: u32) -> Medication {
        let mut med = Medication::new("med-1", "Aspirin", per_dose);
        med.pills_remaining = remaining;
        med
    }

    #[test]
    fn dispense_succeeds_at_exact_boundary() {
        let mut med = med_with_stock(2, 2);
        assert!(med.dispense_dose());
        assert_eq!(med.pills_remaining, 0);
    }

    #[test]
    fn dispense_fails_below_boundary_and_leaves_state() {
        let mut med = med_with_stock(1, 2);
        assert!(!med.dispense_dose());
        assert_eq!(med.pills_remaining, 1);
    }

    #[test]
    fn dispense_decrements_by_dose_size() {
        let mut med = med_with_stock(10, 3);
        assert!(med.dispense_dose());
        assert_eq!(med.pills_remaining, 7);
    }

    #[test]
    fn weekly_constructor_rejects_bad_time() {
        assert!(Schedule::weekly("med-1", 24, 0, [true; 7]).is_err());
        assert!(Schedule::weekly("med-1", 8, 60, [true; 7]).is_err());
    }

    #[test]
    fn interval_constructor_rejects_zero_interval() {
        assert!(Schedule::interval("med-1", 8, 0, 0).is_err());
        assert!(Schedule::interval("med-1", 8, 0, 8).is_ok());
    }

    #[test]
    fn begin_cycle_resets_confirmation() {
        let mut sched = Schedule::weekly("med-1", 8, 30, [true; 7]).unwrap();
        sched.taking_confirmed = true;
        sched.begin_cycle(1_000);
        assert_eq!(sched.next_scheduled, 1_000);
        assert!(!sched.taking_confirmed);
    }
}
