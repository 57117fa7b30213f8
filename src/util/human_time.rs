//! Human-readable duration formatting, ported from the original tool's
//! `presentation.seconds_to_human` / `human_time` - including its exact
//! rounding order (seconds first, then minutes, then hours), which is
//! not the same as a naive `seconds / 3600` breakdown.

/// Splits a duration into `(hours, minutes, seconds)`, each rounded the
/// same way the original does it: round the minutes count before
/// deriving hours from it, so a minutes remainder of e.g. 59.6 rounds up
/// to 60 and carries into an extra hour.
pub fn seconds_to_hms(seconds: f64) -> (u64, u64, u64) {
    let mut hours = 0u64;
    let mut minutes = 0u64;
    let mut seconds = seconds;

    if seconds >= 60.0 {
        let remaining = seconds % 60.0;
        minutes = ((seconds - remaining) / 60.0).round() as u64;
        seconds = remaining;
    }
    if minutes >= 60 {
        let remaining = minutes % 60;
        hours = ((minutes - remaining) as f64 / 60.0).round() as u64;
        minutes = remaining;
    }
    (hours, minutes, seconds.round() as u64)
}

/// Formats a duration the way the original tool logs elapsed/remaining
/// time: only the non-zero larger units are shown.
pub fn human_time(seconds: f64) -> String {
    let (hours, minutes, seconds) = seconds_to_hms(seconds);
    if hours > 0 {
        format!("{} hours, {} minutes, {} seconds", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{} minutes, {} seconds", minutes, seconds)
    } else {
        format!("{} seconds", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_a_minute_shows_seconds_only() {
        assert_eq!(seconds_to_hms(45.0), (0, 0, 45));
        assert_eq!(human_time(45.0), "45 seconds");
    }

    #[test]
    fn exactly_one_minute_carries_into_minutes() {
        assert_eq!(seconds_to_hms(60.0), (0, 1, 0));
        assert_eq!(human_time(60.0), "1 minutes, 0 seconds");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(seconds_to_hms(715.0), (0, 11, 55));
    }

    #[test]
    fn carries_into_hours() {
        assert_eq!(seconds_to_hms(52812.0), (14, 40, 12));
    }
}
