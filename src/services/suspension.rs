use std::time::Duration;

/// Renders the time left on a suspension window as a human-relative phrase.
/// Rounds up to whole minutes; above 60 minutes switches to hour
/// granularity (also rounded up).
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.as_secs().div_ceil(60).max(1);

    if minutes > 60 {
        // Ceiling of anything above 60 minutes is at least 2 hours, so the
        // plural form always applies here.
        let hours = minutes.div_ceil(60);
        format!("in {hours} hours")
    } else if minutes == 1 {
        "in 1 minute".to_string()
    } else {
        format!("in {minutes} minutes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_up_to_whole_minutes() {
        assert_eq!(format_remaining(Duration::from_secs(61)), "in 2 minutes");
        assert_eq!(format_remaining(Duration::from_secs(120)), "in 2 minutes");
        assert_eq!(format_remaining(Duration::from_secs(29 * 60 + 1)), "in 30 minutes");
    }

    #[test]
    fn test_sub_minute_reports_one_minute() {
        assert_eq!(format_remaining(Duration::from_secs(1)), "in 1 minute");
        assert_eq!(format_remaining(Duration::from_secs(59)), "in 1 minute");
        assert_eq!(format_remaining(Duration::ZERO), "in 1 minute");
    }

    #[test]
    fn test_hour_granularity_above_sixty_minutes() {
        assert_eq!(format_remaining(Duration::from_secs(60 * 60)), "in 60 minutes");
        // Anything past the hour mark rounds up to two hours
        assert_eq!(format_remaining(Duration::from_secs(60 * 60 + 1)), "in 2 hours");
        assert_eq!(format_remaining(Duration::from_secs(61 * 60)), "in 2 hours");
        assert_eq!(format_remaining(Duration::from_secs(3 * 60 * 60)), "in 3 hours");
    }
}
