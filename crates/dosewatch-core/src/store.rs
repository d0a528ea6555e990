//! Persistent store collaborator contract.
//!
//! The store is the source of truth for medication and schedule state; the
//! engine never keeps an authoritative in-memory copy. Implementations are
//! externally synchronized per medication/schedule key -- last-write-wins
//! is acceptable for this domain, and the engine never assumes
//! compare-and-swap semantics.
//!
//! [`MemoryStore`] is the reference implementation backing the test suite
//! and the offline simulator; real transports live outside this crate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::medication::{Medication, Schedule};

/// Answer to a missed-dose query: confirmation state plus the current
/// medication and schedule snapshots the alert paths need.
#[derive(Debug, Clone)]
pub struct TakenStatus {
    pub taken: bool,
    pub medication: Medication,
    pub schedule: Schedule,
}

/// A recorded missed-dose event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissedDoseEvent {
    pub patient_id: String,
    pub medication_id: String,
    pub schedule_id: String,
    pub at: i64,
}

/// Persistence operations the engine depends on.
#[async_trait]
pub trait MedicationStore: Send + Sync {
    /// Fetch one medication with its schedules.
    async fn medication(
        &self,
        patient_id: &str,
        medication_id: &str,
    ) -> Result<Medication, StoreError>;

    /// Replace the stored medication (schedules included).
    async fn update_medication(
        &self,
        patient_id: &str,
        medication: &Medication,
    ) -> Result<(), StoreError>;

    /// Mark the schedule's current dose as dispensed by the device.
    async fn mark_dispensed(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<(), StoreError>;

    /// Read the confirmation state of the schedule's current dose.
    async fn check_taken(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<TakenStatus, StoreError>;

    /// Append a missed-dose event to the patient's history.
    async fn record_missed(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<(), StoreError>;

    /// Every medication registered for the patient.
    async fn all_medications(&self, patient_id: &str) -> Result<Vec<Medication>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    /// patient id -> medications (each owning its schedules).
    medications: HashMap<String, Vec<Medication>>,
    missed: Vec<MissedDoseEvent>,
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a medication for a patient (test/simulation setup).
    pub async fn insert_medication(&self, patient_id: &str, medication: Medication) {
        let mut state = self.state.write().await;
        state
            .medications
            .entry(patient_id.to_string())
            .or_default()
            .push(medication);
    }

    /// Confirm the current dose as taken (what the companion app or the
    /// drop sensor would report).
    pub async fn confirm_taken(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_millis();
        let mut state = self.state.write().await;
        let schedule = find_schedule_mut(&mut state, patient_id, medication_id, schedule_id)?;
        schedule.taking_confirmed = true;
        schedule.last_taken = Some(now);
        Ok(())
    }

    /// Recorded missed-dose events, oldest first.
    pub async fn missed_events(&self) -> Vec<MissedDoseEvent> {
        self.state.read().await.missed.clone()
    }
}

fn find_medication<'a>(
    state: &'a MemoryState,
    patient_id: &str,
    medication_id: &str,
) -> Result<&'a Medication, StoreError> {
    state
        .medications
        .get(patient_id)
        .and_then(|meds| meds.iter().find(|m| m.id == medication_id))
        .ok_or_else(|| StoreError::MedicationNotFound {
            patient_id: patient_id.to_string(),
            medication_id: medication_id.to_string(),
        })
}

fn find_schedule_mut<'a>(
    state: &'a mut MemoryState,
    patient_id: &str,
    medication_id: &str,
    schedule_id: &str,
) -> Result<&'a mut Schedule, StoreError> {
    let medication = state
        .medications
        .get_mut(patient_id)
        .and_then(|meds| meds.iter_mut().find(|m| m.id == medication_id))
        .ok_or_else(|| StoreError::MedicationNotFound {
            patient_id: patient_id.to_string(),
            medication_id: medication_id.to_string(),
        })?;
    medication
        .schedule_mut(schedule_id)
        .ok_or_else(|| StoreError::ScheduleNotFound {
            medication_id: medication_id.to_string(),
            schedule_id: schedule_id.to_string(),
        })
}

#[async_trait]
impl MedicationStore for MemoryStore {
    async fn medication(
        &self,
        patient_id: &str,
        medication_id: &str,
    ) -> Result<Medication, StoreError> {
        let state = self.state.read().await;
        find_medication(&state, patient_id, medication_id).map(Clone::clone)
    }

    async fn update_medication(
        &self,
        patient_id: &str,
        medication: &Medication,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let meds = state.medications.get_mut(patient_id).ok_or_else(|| {
            StoreError::MedicationNotFound {
                patient_id: patient_id.to_string(),
                medication_id: medication.id.clone(),
            }
        })?;
        let slot = meds.iter_mut().find(|m| m.id == medication.id).ok_or_else(|| {
            StoreError::MedicationNotFound {
                patient_id: patient_id.to_string(),
                medication_id: medication.id.clone(),
            }
        })?;
        *slot = medication.clone();
        Ok(())
    }

    async fn mark_dispensed(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().timestamp_millis();
        let mut state = self.state.write().await;
        let schedule = find_schedule_mut(&mut state, patient_id, medication_id, schedule_id)?;
        schedule.dispensed = true;
        schedule.dispensed_at = Some(now);
        Ok(())
    }

    async fn check_taken(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<TakenStatus, StoreError> {
        let state = self.state.read().await;
        let medication = find_medication(&state, patient_id, medication_id)?;
        let schedule =
            medication
                .schedule(schedule_id)
                .ok_or_else(|| StoreError::ScheduleNotFound {
                    medication_id: medication_id.to_string(),
                    schedule_id: schedule_id.to_string(),
                })?;
        Ok(TakenStatus {
            taken: schedule.taking_confirmed,
            medication: medication.clone(),
            schedule: schedule.clone(),
        })
    }

    async fn record_missed(
        &self,
        patient_id: &str,
        medication_id: &str,
        schedule_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.missed.push(MissedDoseEvent {
            patient_id: patient_id.to_string(),
            medication_id: medication_id.to_string(),
            schedule_id: schedule_id.to_string(),
            at: Utc::now().timestamp_millis(),
        });
        Ok(())
    }

    async fn all_medications(&self, patient_id: &str) -> Result<Vec<Medication>, StoreError> {
        let state = self.state.read().await;
        Ok(state.medications.get(patient_id).cloned().unwrap_or_default())
    }
}
