pub mod next;
pub mod simulate;

use dosewatch_core::ValidationError;

/// Parse a `HH:MM` wall-clock time.
pub fn parse_time_of_day(s: &str) -> Result<(u32, u32), ValidationError> {
    let invalid = || ValidationError::InvalidValue {
        field: "at".into(),
        message: format!("'{s}' is not a HH:MM time"),
    };
    let (h, m) = s.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// Parse a comma-separated weekday list (`mon,wed,fri`) into Monday-first
/// flags.
pub fn parse_days(s: &str) -> Result<[bool; 7], ValidationError> {
    let mut days = [false; 7];
    for part in s.split(',') {
        let idx = match part.trim().to_lowercase().as_str() {
            "mon" | "monday" => 0,
            "tue" | "tuesday" => 1,
            "wed" | "wednesday" => 2,
            "thu" | "thursday" => 3,
            "fri" | "friday" => 4,
            "sat" | "saturday" => 5,
            "sun" | "sunday" => 6,
            other => {
                return Err(ValidationError::InvalidValue {
                    field: "days".into(),
                    message: format!("unknown weekday '{other}'"),
                })
            }
        };
        days[idx] = true;
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times() {
        assert_eq!(parse_time_of_day("08:30").unwrap(), (8, 30));
        assert_eq!(parse_time_of_day("23:59").unwrap(), (23, 59));
    }

    #[test]
    fn rejects_malformed_times() {
        assert!(parse_time_of_day("8").is_err());
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("12:60").is_err());
        assert!(parse_time_of_day("noon").is_err());
    }

    #[test]
    fn parses_weekday_lists() {
        let days = parse_days("mon,wed,friday").unwrap();
        assert_eq!(days, [true, false, true, false, true, false, false]);
        assert!(parse_days("blursday").is_err());
    }
}
