//! # Dosewatch Core Library
//!
//! Core engine for Dosewatch, a caregiver-facing medication dispenser
//! companion: recurrence computation, timed-alarm scheduling, and
//! missed-dose detection. All user interface, the persistence
//! transport, and the dispenser hardware protocol live outside this
//! crate, behind the collaborator traits defined here.
//!
//! ## Architecture
//!
//! - **Recurrence**: pure next-trigger computation for interval and
//!   weekly schedules
//! - **Scheduler**: registers the advance reminder, exact reminder, and
//!   missed-dose check against a pluggable timer facility
//! - **Dispatcher**: reacts to timer firings -- notify, auto-dispense,
//!   detect missed doses -- inside a bounded wake-hold
//! - **Collaborators**: [`MedicationStore`] (source of truth) and
//!   [`NotificationPresenter`] (only user-visible output), injected at
//!   construction; no process-wide singletons
//!
//! ## Key Components
//!
//! - [`AlarmScheduler`]: timer registration and boot-time restore
//! - [`AlarmDispatcher`]: the firing-side state machine
//! - [`next_trigger`]: recurrence calculator
//! - [`MemoryStore`]: reference store for tests and simulation

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod ident;
pub mod medication;
pub mod notify;
pub mod recurrence;
pub mod scheduler;
pub mod store;
pub mod timer;
pub mod wake;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::AlarmDispatcher;
pub use error::{CoreError, Result, StoreError, ValidationError};
pub use ident::{alarm_id, is_valid_patient_id, AlarmKind, SENTINEL_PATIENT_ID};
pub use medication::{DoseDays, Medication, Schedule};
pub use notify::{LogPresenter, NotificationPresenter};
pub use recurrence::next_trigger;
pub use scheduler::AlarmScheduler;
pub use store::{MedicationStore, MemoryStore, MissedDoseEvent, TakenStatus};
pub use timer::{AlarmHandler, AlarmIntent, QueueTimer, TimerFacility, TokioTimer};
pub use wake::{CountingWake, NoopWake, WakeHold, WakeSource};
