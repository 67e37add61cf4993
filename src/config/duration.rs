//! Delay parsing and human-readable rendering.
//!
//! Delays are written as humantime strings (`"5ms"`, `"1h"`, `"7 days"`) or
//! as bare millisecond counts. A leading `-` marks a negative delay, which
//! suppresses scheduling.

use std::time::Duration;

use thiserror::Error;

use super::policy::Delay;

const SECOND_MS: f64 = 1000.0;
const MINUTE_MS: f64 = SECOND_MS * 60.0;
const HOUR_MS: f64 = MINUTE_MS * 60.0;
const DAY_MS: f64 = HOUR_MS * 24.0;

/// A delay string that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid duration {input:?}: {reason}")]
pub struct DurationError {
    pub input: String,
    pub reason: String,
}

/// Parses a delay string.
///
/// Whitespace is ignored, so `"5 ms"` and `"5ms"` are equivalent.
pub fn parse_delay(input: &str) -> Result<Delay, DurationError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let (negative, magnitude) = match compact.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };

    if magnitude.is_empty() {
        return Err(DurationError {
            input: input.to_string(),
            reason: "empty duration".to_string(),
        });
    }

    let duration = if magnitude.chars().all(|c| c.is_ascii_digit()) {
        let millis = magnitude.parse::<u64>().map_err(|e| DurationError {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Duration::from_millis(millis)
    } else {
        humantime::parse_duration(magnitude).map_err(|e| DurationError {
            input: input.to_string(),
            reason: e.to_string(),
        })?
    };

    Ok(if negative {
        Delay::Suppressed
    } else {
        Delay::After(duration)
    })
}

/// Converts a millisecond count (as written as a YAML number) into a delay.
pub fn delay_from_millis(millis: i64) -> Delay {
    match u64::try_from(millis) {
        Ok(ms) => Delay::After(Duration::from_millis(ms)),
        Err(_) => Delay::Suppressed,
    }
}

/// Renders a duration in long form: `5 ms`, `1 second`, `2 hours`, `7 days`.
///
/// The value is rounded to the largest whole unit; the unit is pluralised once
/// the value reaches one and a half units.
pub fn format_long(duration: Duration) -> String {
    let ms = duration.as_millis() as f64;

    if ms >= DAY_MS {
        return plural(ms, DAY_MS, "day");
    }
    if ms >= HOUR_MS {
        return plural(ms, HOUR_MS, "hour");
    }
    if ms >= MINUTE_MS {
        return plural(ms, MINUTE_MS, "minute");
    }
    if ms >= SECOND_MS {
        return plural(ms, SECOND_MS, "second");
    }
    format!("{} ms", duration.as_millis())
}

fn plural(ms: f64, unit: f64, name: &str) -> String {
    let count = (ms / unit).round() as u64;
    let suffix = if ms >= unit * 1.5 { "s" } else { "" };
    format!("{} {}{}", count, name, suffix)
}
