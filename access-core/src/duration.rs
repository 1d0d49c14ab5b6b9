//! Duration strings used by access policies.
//!
//! Accepted input is a sequence of `<number><unit>` components such as
//! `"72h"`, `"1h30m"` or `"1.5d"`. Units are `ns`, `us`, `ms`, `s`, `m`, `h`
//! and a single optional day component `d`.

use std::time::Duration;

use thiserror::Error;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("duration is empty")]
    Empty,
    #[error("invalid duration {input:?}")]
    InvalidNumber { input: String },
    #[error("missing unit in duration {input:?}")]
    MissingUnit { input: String },
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("invalid day duration: {input}")]
    MultipleDays { input: String },
    #[error("duration {input:?} is too large")]
    Overflow { input: String },
}

/// Render a whole number of hours, e.g. `72h`.
pub fn format_hours(hours: i64) -> String {
    format!("{hours}h")
}

/// Parse a duration string, allowing one day component.
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    if input.is_empty() {
        return Err(DurationParseError::Empty);
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = input;
    let mut total_nanos = 0f64;
    let mut day_components = 0;

    while !rest.is_empty() {
        let (value, after_number) = split_number(rest, input)?;
        let (unit, after_unit) = split_unit(after_number, input)?;

        if unit == Unit::Day {
            day_components += 1;
            if day_components > 1 {
                return Err(DurationParseError::MultipleDays {
                    input: input.to_string(),
                });
            }
        }

        total_nanos += value * unit.nanos();
        rest = after_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(DurationParseError::Overflow {
            input: input.to_string(),
        });
    }

    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
}

impl Unit {
    // Two-character units first so `ms` is not read as `m`.
    const SUFFIXES: [(&'static str, Unit); 10] = [
        ("ns", Unit::Nanosecond),
        ("us", Unit::Microsecond),
        ("µs", Unit::Microsecond),
        ("μs", Unit::Microsecond),
        ("ms", Unit::Millisecond),
        ("s", Unit::Second),
        ("m", Unit::Minute),
        ("h", Unit::Hour),
        ("d", Unit::Day),
        ("D", Unit::Day),
    ];

    fn nanos(self) -> f64 {
        match self {
            Unit::Nanosecond => 1.0,
            Unit::Microsecond => 1_000.0,
            Unit::Millisecond => 1_000_000.0,
            Unit::Second => NANOS_PER_SECOND,
            Unit::Minute => SECONDS_PER_MINUTE as f64 * NANOS_PER_SECOND,
            Unit::Hour => SECONDS_PER_HOUR as f64 * NANOS_PER_SECOND,
            Unit::Day => SECONDS_PER_DAY as f64 * NANOS_PER_SECOND,
        }
    }
}

fn split_number<'a>(rest: &'a str, input: &str) -> Result<(f64, &'a str), DurationParseError> {
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let number = &rest[..end];

    let invalid = || DurationParseError::InvalidNumber {
        input: input.to_string(),
    };
    if !number.bytes().any(|b| b.is_ascii_digit()) || number.matches('.').count() > 1 {
        return Err(invalid());
    }

    let value = number.parse::<f64>().map_err(|_| invalid())?;
    Ok((value, &rest[end..]))
}

fn split_unit<'a>(rest: &'a str, input: &str) -> Result<(Unit, &'a str), DurationParseError> {
    // Whitespace is only tolerated between a number and its day unit.
    let trimmed = rest.trim_start();
    if trimmed.len() != rest.len() && !trimmed.starts_with(['d', 'D']) {
        return Err(DurationParseError::InvalidNumber {
            input: input.to_string(),
        });
    }

    if trimmed.is_empty() {
        return Err(DurationParseError::MissingUnit {
            input: input.to_string(),
        });
    }

    for (suffix, unit) in Unit::SUFFIXES {
        if let Some(after) = trimmed.strip_prefix(suffix) {
            return Ok((unit, after));
        }
    }

    let unit: String = trimmed
        .chars()
        .take_while(|c| !(c.is_ascii_digit() || *c == '.'))
        .collect();
    Err(DurationParseError::UnknownUnit {
        unit,
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn hours(count: u64) -> Duration {
        Duration::from_secs(count * SECONDS_PER_HOUR)
    }

    #[test]
    fn parses_plain_units() {
        assert_eq!(parse_duration("72h"), Ok(hours(72)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn parses_day_component() {
        assert_eq!(parse_duration("2d3h"), Ok(hours(51)));
        assert_eq!(parse_duration("1.5d"), Ok(hours(36)));
        assert_eq!(parse_duration(".5d"), Ok(hours(12)));
        assert_eq!(parse_duration("1D12h"), Ok(hours(36)));
        assert_eq!(parse_duration("2 d"), Ok(hours(48)));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), Err(DurationParseError::Empty));
        assert_eq!(
            parse_duration("1d1d"),
            Err(DurationParseError::MultipleDays {
                input: "1d1d".to_string()
            })
        );
        assert_eq!(
            parse_duration("5"),
            Err(DurationParseError::MissingUnit {
                input: "5".to_string()
            })
        );
        assert_eq!(
            parse_duration("3w"),
            Err(DurationParseError::UnknownUnit {
                unit: "w".to_string(),
                input: "3w".to_string()
            })
        );
        assert!(matches!(
            parse_duration("h"),
            Err(DurationParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_duration("1 h"),
            Err(DurationParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn format_hours_uses_hour_unit() {
        assert_eq!(format_hours(72), "72h");
        assert_eq!(format_hours(0), "0h");
    }
}
