use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Convert decimal odds to an implied probability in percent
pub fn implied_probability(coefficient: f64) -> f64 {
    100.0 / coefficient
}

/// Convert a probability fraction back to decimal odds
pub fn probability_to_odds(probability: f64) -> f64 {
    if probability <= 0.0 {
        return 1000.0; // Very high odds for impossible events
    }
    1.0 / probability
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round a percentage to the nearest integer.
///
/// Values are first snapped to six decimals so that products like
/// `50.0 * 1.15` (stored as 57.4999...) round up the way they read.
pub fn round_percent(value: f64) -> f64 {
    ((value * 1_000_000.0).round() / 1_000_000.0).round()
}

/// Clamp a raw confidence to the published [0, 95] range
pub fn clamp_confidence(value: f64) -> u8 {
    round_percent(value).clamp(0.0, 95.0) as u8
}

/// Integer percentage of `part` over `whole`, rounded; zero when `whole` is zero
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    round_percent(part as f64 / whole as f64 * 100.0) as u32
}

/// Lowercased, trimmed team name used for lookups and cache keys
pub fn normalize_team_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Validate team name format
pub fn validate_team_name(name: &str) -> bool {
    !name.trim().is_empty() && name.len() <= 100
}

/// Format a score as "H-A"
pub fn format_score(home_goals: u32, away_goals: u32) -> String {
    format!("{}-{}", home_goals, away_goals)
}

/// Parse the loosely formatted match date-times accepted from users:
/// RFC 3339, "YYYY-MM-DD HH:MM[:SS]", "YYYY-MM-DDTHH:MM[:SS]" or a bare date.
pub fn parse_match_datetime(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_implied_probability() {
        assert_eq!(implied_probability(2.0), 50.0);
        assert_eq!(implied_probability(4.0), 25.0);
        assert!((implied_probability(3.0) - 33.333).abs() < 0.001);
    }

    #[test]
    fn test_probability_to_odds() {
        assert_eq!(probability_to_odds(0.5), 2.0);
        assert_eq!(probability_to_odds(0.25), 4.0);
        assert!(probability_to_odds(0.0) > 100.0);
    }

    #[test]
    fn test_round_percent_handles_float_noise() {
        assert_eq!(round_percent(50.0 * 1.15), 58.0);
        assert_eq!(round_percent(57.4), 57.0);
        assert_eq!(round1(33.333), 33.3);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(120.0), 95);
        assert_eq!(clamp_confidence(-3.0), 0);
        assert_eq!(clamp_confidence(42.4), 42);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn test_parse_match_datetime() {
        let dt = parse_match_datetime("2024-01-15 15:00").unwrap();
        assert_eq!(dt.hour(), 15);
        assert!(parse_match_datetime("2024-01-15T15:00:00Z").is_some());
        assert!(parse_match_datetime("2024-01-15").is_some());
        assert!(parse_match_datetime("tomorrow").is_none());
    }
}
