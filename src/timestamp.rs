// Cover timestamps: `"5"`, `"5.5"`, `"0:05"`, `"00:00:05"`.

use crate::error::{PublishError, Result};

/// Convert a human timestamp into milliseconds, truncated toward zero.
///
/// Accepts a bare number of seconds or `MM:SS` / `HH:MM:SS`, where only the
/// seconds component may carry a fraction.
pub fn parse_timestamp_ms(ts: &str) -> Result<u64> {
    let invalid = || PublishError::input(format!("invalid timestamp format: {ts:?}"));
    let ts = ts.trim();

    let parts: Vec<&str> = ts.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [s] => ("0", "0", *s),
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };

    let hours: u64 = parse_whole(hours).ok_or_else(invalid)?;
    let minutes: u64 = parse_whole(minutes).ok_or_else(invalid)?;
    let seconds = parse_seconds(seconds).ok_or_else(invalid)?;

    let whole = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .ok_or_else(invalid)?;
    let ms = (whole as f64 + seconds) * 1000.0;
    if !ms.is_finite() || ms >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(ms as u64)
}

fn parse_whole(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_seconds(s: &str) -> Option<f64> {
    // Rejects "inf", "nan", exponents and signs that f64::from_str accepts.
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
