//! Print upcoming trigger instants for a schedule specification.

use chrono::{DateTime, Utc};
use clap::Args;

use dosewatch_core::{next_trigger, CoreError, Schedule};

use super::{parse_days, parse_time_of_day};

#[derive(Args)]
pub struct NextArgs {
    /// Wall-clock time of day, HH:MM (UTC)
    #[arg(long)]
    at: String,

    /// Interval mode: hours between doses
    #[arg(long, conflicts_with = "days")]
    every: Option<u32>,

    /// Weekly mode: comma-separated weekdays (mon,wed,fri)
    #[arg(long)]
    days: Option<String>,

    /// How many occurrences to print
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Compute from this instant instead of now (RFC 3339)
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Emit JSON instead of plain lines
    #[arg(long)]
    json: bool,
}

pub fn run(args: NextArgs) -> Result<(), CoreError> {
    let (hour, minute) = parse_time_of_day(&args.at)?;

    let schedule = match (&args.every, &args.days) {
        (Some(every), None) => Schedule::interval("preview", hour, minute, *every)?,
        (None, Some(days)) => Schedule::weekly("preview", hour, minute, parse_days(days)?)?,
        _ => {
            return Err(CoreError::Custom(
                "exactly one of --every and --days is required".into(),
            ))
        }
    };

    let mut cursor = args.from.unwrap_or_else(Utc::now).timestamp_millis();
    let mut occurrences = Vec::with_capacity(args.count);
    for _ in 0..args.count {
        cursor = next_trigger(&schedule, cursor);
        occurrences.push(cursor);
    }

    if args.json {
        let instants: Vec<String> = occurrences
            .iter()
            .filter_map(|ms| DateTime::from_timestamp_millis(*ms))
            .map(|dt| dt.to_rfc3339())
            .collect();
        println!("{}", serde_json::to_string_pretty(&instants)?);
    } else {
        for ms in occurrences {
            if let Some(dt) = DateTime::from_timestamp_millis(ms) {
                println!("{}", dt.format("%Y-%m-%d %H:%M %a"));
            }
        }
    }
    Ok(())
}
