//! Human-readable durations for `--ttl`.
//!
//! Accepts one or more `<number><unit>` groups with units `s`, `m`, `h` and
//! `d`, e.g. `90s`, `15m`, `1h30m`, `2d`.

use chrono::Duration;
use thiserror::Error;

// Largest whole-second value a chrono Duration can hold.
const MAX_SECS: i64 = i64::MAX / 1_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,

    #[error("invalid duration {0:?} (expected e.g. 90s, 15m, 1h30m)")]
    Invalid(String),

    #[error("unknown duration unit {unit:?} in {input:?}")]
    UnknownUnit { input: String, unit: char },

    #[error("duration {0:?} is too large")]
    TooLarge(String),

    #[error("duration must be greater than zero")]
    Zero,
}

/// Parse a TTL. Zero is rejected.
pub fn parse_ttl(input: &str) -> Result<Duration, DurationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DurationError::Empty);
    }

    let too_large = || DurationError::TooLarge(input.to_string());
    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return Err(DurationError::Invalid(input.to_string()));
        }
        let scale = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            unit => {
                return Err(DurationError::UnknownUnit {
                    input: input.to_string(),
                    unit,
                })
            }
        };
        let value: i64 = digits.parse().map_err(|_| too_large())?;
        total = value
            .checked_mul(scale)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(too_large)?;
        digits.clear();
    }
    if !digits.is_empty() {
        // a trailing bare number has no unit
        return Err(DurationError::Invalid(input.to_string()));
    }

    if total == 0 {
        return Err(DurationError::Zero);
    }
    if total > MAX_SECS {
        return Err(too_large());
    }
    Ok(Duration::seconds(total))
}

/// Render whole seconds compactly, e.g. `1h30m`.
pub fn format_secs(secs: u64) -> String {
    if secs == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    let mut rest = secs;
    for (unit, scale) in [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)] {
        let count = rest / scale;
        if count > 0 {
            out.push_str(&format!("{count}{unit}"));
            rest %= scale;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_ttl("90s").unwrap(), Duration::seconds(90));
        assert_eq!(parse_ttl("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_ttl(" 2h ").unwrap(), Duration::hours(2));
        assert_eq!(parse_ttl("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_ttl("1h30m").unwrap(), Duration::minutes(90));
        assert_eq!(parse_ttl("1m1s").unwrap(), Duration::seconds(61));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_ttl(""), Err(DurationError::Empty));
        assert!(matches!(parse_ttl("15"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_ttl("m"), Err(DurationError::Invalid(_))));
        assert!(matches!(parse_ttl("-5m"), Err(DurationError::Invalid(_))));
        assert!(matches!(
            parse_ttl("5w"),
            Err(DurationError::UnknownUnit { unit: 'w', .. })
        ));
    }

    #[test]
    fn test_parse_rejects_zero_and_overflow() {
        assert_eq!(parse_ttl("0m"), Err(DurationError::Zero));
        assert!(matches!(
            parse_ttl("99999999999999999999d"),
            Err(DurationError::TooLarge(_))
        ));
        assert!(matches!(
            parse_ttl("9223372036854775807s"),
            Err(DurationError::TooLarge(_))
        ));
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(900), "15m");
        assert_eq!(format_secs(5400), "1h30m");
        assert_eq!(format_secs(90061), "1d1h1m1s");
        assert_eq!(format_secs(0), "0s");
    }
}
