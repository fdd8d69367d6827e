//! Human-entered duration tokens: `10s`, `5m`, `1.5h`.

use std::time::Duration;

use thiserror::Error;

/// Why a duration token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDurationError {
    /// The numeric portion is missing, malformed, negative or not finite.
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    /// The trailing unit is missing or not one of `s`, `m`, `h`.
    #[error("invalid time unit: {0:?}")]
    InvalidUnit(String),
    /// The value does not fit in a `Duration`.
    #[error("duration too large: {0:?}")]
    DurationTooLarge(String),
}

/// Parse a `<number><unit>` token into a duration.
///
/// The unit is case-sensitive and must be `s`, `m` or `h`. The number may
/// carry a decimal fraction. Surrounding whitespace is ignored.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let input = input.trim();

    let Some(unit) = input.chars().next_back() else {
        return Err(ParseDurationError::InvalidUnit(String::new()));
    };
    let scale = match unit {
        's' => 1.0,
        'm' => 60.0,
        'h' => 3600.0,
        other => return Err(ParseDurationError::InvalidUnit(other.to_string())),
    };

    let number = &input[..input.len() - unit.len_utf8()];
    let amount: f64 = number
        .parse()
        .map_err(|_| ParseDurationError::InvalidNumber(number.to_string()))?;
    if !amount.is_finite() || amount.is_sign_negative() {
        return Err(ParseDurationError::InvalidNumber(number.to_string()));
    }

    Duration::try_from_secs_f64(amount * scale)
        .map_err(|_| ParseDurationError::DurationTooLarge(input.to_string()))
}

/// Render a duration for people: `1h 30m`, `45s`, `2d 3h`, `0s`.
pub fn humanize(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let millis = duration.subsec_millis();

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if millis > 0 {
        let fraction = format!("{millis:03}");
        parts.push(format!("{seconds}.{}s", fraction.trim_end_matches('0')));
    } else if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}
