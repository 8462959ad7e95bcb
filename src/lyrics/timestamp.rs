//! Timestamp normalisation for LRC output
//!
//! Timed text uses several clock encodings (`HH:MM:SS.mmm`, `MM:SS.mmm`, ...).
//! LRC wants `mm:ss.cc`, where the minute field may grow past two digits:
//!
//! `01:02:03.450` -> `62:03.45`

/// Timestamp used when a timing attribute is missing or empty.
pub const ZERO: &str = "00:00.00";

/// Convert a raw clock value into LRC `mm:ss.cc` form.
///
/// Fields may be padded with whitespace. Shapes other than `H:M:S[.frac]` and
/// `M:S[.frac]`, fields that do not parse as numbers, and minute totals that
/// overflow are returned unchanged.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return ZERO.to_string();
    }

    let parts: Vec<&str> = raw.split(':').collect();
    let parsed = match parts.as_slice() {
        [h, m, s] => parse_hms(h, m, s),
        [m, s] => parse_ms(m, s),
        _ => None,
    };

    match parsed {
        Some((minutes, seconds)) => format!("{minutes:02}:{seconds:05.2}"),
        None => raw.to_string(),
    }
}

fn parse_hms(h: &str, m: &str, s: &str) -> Option<(i64, f64)> {
    let hours: i64 = h.trim().parse().ok()?;
    let (minutes, seconds) = parse_ms(m, s)?;
    let total = hours.checked_mul(60)?.checked_add(minutes)?;
    Some((total, seconds))
}

fn parse_ms(m: &str, s: &str) -> Option<(i64, f64)> {
    let minutes: i64 = m.trim().parse().ok()?;
    let seconds: f64 = s.trim().parse().ok()?;
    seconds.is_finite().then_some((minutes, seconds))
}
