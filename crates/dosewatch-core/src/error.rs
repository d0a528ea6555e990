//! Core error types for dosewatch-core.
//!
//! Engine-boundary operations (`AlarmScheduler`, `AlarmDispatcher`) never
//! surface these across the timer boundary -- they log and return failure
//! values instead. The `Result`-based hierarchy here covers everything
//! behind that boundary: store access, value construction, CLI plumbing.

use thiserror::Error;

/// Core error type for dosewatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors reported by a [`MedicationStore`](crate::store::MedicationStore)
/// implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No medication under this patient/medication key
    #[error("Medication '{medication_id}' not found for patient '{patient_id}'")]
    MedicationNotFound {
        patient_id: String,
        medication_id: String,
    },

    /// Medication exists but carries no schedule with this id
    #[error("Schedule '{schedule_id}' not found on medication '{medication_id}'")]
    ScheduleNotFound {
        medication_id: String,
        schedule_id: String,
    },

    /// Transient backend failure (I/O, auth, transport)
    #[error("Store backend failure: {0}")]
    Backend(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Patient id is empty or a known placeholder sentinel
    #[error("Invalid patient id: '{0}'")]
    InvalidPatientId(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
