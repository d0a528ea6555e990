//! Offline day simulation of the alarm engine.
//!
//! Seeds an in-memory store with two medications, restores timers the way
//! the boot hook would, then steps a manual clock through the day firing
//! due alarms. The first medication gets its doses confirmed shortly
//! after each exact reminder (standing in for the dispenser's drop
//! sensor); the second is never confirmed and walks into the missed-dose
//! path.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use clap::Args;

use dosewatch_core::{
    AlarmDispatcher, AlarmHandler, AlarmKind, AlarmScheduler, Clock, CoreError, ManualClock,
    Medication, MedicationStore, MemoryStore, NoopWake, NotificationPresenter, QueueTimer,
    Schedule, TimerFacility, WakeSource,
};

const PATIENT: &str = "patient-demo";
const MINUTE_MS: i64 = 60_000;

#[derive(Args)]
pub struct SimulateArgs {
    /// Length of the simulated window in hours
    #[arg(long, default_value_t = 24)]
    hours: i64,

    /// Start instant (RFC 3339); defaults to now
    #[arg(long)]
    start: Option<DateTime<Utc>>,
}

/// Presenter that timestamps every notification against the simulated
/// clock.
struct ConsolePresenter {
    clock: Arc<ManualClock>,
}

impl ConsolePresenter {
    fn stamp(&self) -> String {
        DateTime::from_timestamp_millis(self.clock.now_ms())
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| "??:??".into())
    }
}

impl NotificationPresenter for ConsolePresenter {
    fn show_reminder(&self, title: &str, message: &str, _notification_id: i32) {
        println!("[{}] {title}: {message}", self.stamp());
    }

    fn show_missed_alert(&self, medication: &Medication, _schedule: &Schedule) {
        println!("[{}] MISSED DOSE: {}", self.stamp(), medication.name);
    }

    fn show_low_supply_alert(&self, medication: &Medication) {
        println!(
            "[{}] LOW SUPPLY: {} ({} left, {} per dose)",
            self.stamp(),
            medication.name,
            medication.pills_remaining,
            medication.pills_per_dose
        );
    }
}

pub async fn run(args: SimulateArgs) -> Result<(), CoreError> {
    let start = args.start.unwrap_or_else(Utc::now);
    let start_ms = start.timestamp_millis();
    let end_ms = start_ms + args.hours * 60 * MINUTE_MS;

    let timer = Arc::new(QueueTimer::new());
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(start_ms));
    let presenter = Arc::new(ConsolePresenter {
        clock: Arc::clone(&clock),
    });
    let scheduler = Arc::new(AlarmScheduler::new(
        Arc::clone(&timer) as Arc<dyn TimerFacility>,
        Arc::clone(&store) as Arc<dyn MedicationStore>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    let dispatcher = Arc::new(AlarmDispatcher::new(
        Arc::clone(&store) as Arc<dyn MedicationStore>,
        Arc::clone(&presenter) as Arc<dyn NotificationPresenter>,
        Arc::clone(&scheduler),
        Arc::new(NoopWake) as Arc<dyn WakeSource>,
    ));

    seed(&store, start).await?;

    // Boot hook: restore timers from persisted state.
    let medications = store.all_medications(PATIENT).await?;
    scheduler.reschedule_all(PATIENT, &medications).await;

    println!(
        "simulating {} hours from {}",
        args.hours,
        start.format("%Y-%m-%d %H:%M")
    );

    // Pending confirmations the "drop sensor" will report: (at_ms, schedule).
    let mut confirmations: Vec<(i64, String)> = Vec::new();

    loop {
        let next_alarm = timer.next_due();
        let next_confirm = confirmations.iter().map(|(at, _)| *at).min();
        let Some(next) = [next_alarm, next_confirm].into_iter().flatten().min() else {
            break;
        };
        if next > end_ms {
            break;
        }
        clock.set(next);

        let (due, later): (Vec<_>, Vec<_>) =
            confirmations.into_iter().partition(|(at, _)| *at <= next);
        confirmations = later;
        for (_, schedule_id) in due {
            store.confirm_taken(PATIENT, "aspirin", &schedule_id).await?;
            println!(
                "[{}] sensor confirmed Aspirin dose",
                DateTime::from_timestamp_millis(next)
                    .map(|dt| dt.format("%H:%M").to_string())
                    .unwrap_or_default()
            );
        }

        for intent in timer.drain_due(next) {
            let confirmed_later =
                intent.kind == AlarmKind::Exact && intent.medication_id == "aspirin";
            let schedule_id = intent.schedule_id.clone();
            dispatcher.on_alarm(intent).await;
            if confirmed_later {
                confirmations.push((next + 10 * MINUTE_MS, schedule_id));
            }
        }
    }

    // Let fire-and-forget persistence writes land before reading back.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    println!("--- summary ---");
    for medication in store.all_medications(PATIENT).await? {
        println!(
            "{}: {} unit(s) remaining",
            medication.name, medication.pills_remaining
        );
    }
    let missed = store.missed_events().await;
    println!("missed doses recorded: {}", missed.len());
    Ok(())
}

/// Two demo medications: Aspirin (confirmed each cycle) and Vitamin D
/// (never confirmed), first doses two and three hours into the window.
async fn seed(store: &MemoryStore, start: DateTime<Utc>) -> Result<(), CoreError> {
    let first = start + Duration::hours(2);
    let mut aspirin = Medication::new("aspirin", "Aspirin", 1);
    aspirin.pills_remaining = 3;
    aspirin
        .schedules
        .push(Schedule::interval("aspirin", first.hour(), first.minute(), 8)?);
    store.insert_medication(PATIENT, aspirin).await;

    let second = start + Duration::hours(3);
    let mut vitamin = Medication::new("vitamin-d", "Vitamin D", 2);
    vitamin.pills_remaining = 4;
    vitamin.schedules.push(Schedule::interval(
        "vitamin-d",
        second.hour(),
        second.minute(),
        12,
    )?);
    store.insert_medication(PATIENT, vitamin).await;
    Ok(())
}
