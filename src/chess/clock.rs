//! Clock annotations: `{[%clk H:MM:SS(.s)]}` scanning, conversion to seconds
//! and per-side time-spent tracking.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Side;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]*)\}").expect("valid comment regex"));

pub(crate) static CLK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[%clk\s+([^\]]+)\]").expect("valid clk tag regex"));

/// Clock values of every clock-bearing `{...}` comment, in order of appearance.
///
/// The `[%clk ...]` tag may sit anywhere inside the comment; comments without
/// one are not counted.
pub fn scan_clock_comments(pgn: &str) -> Vec<String> {
    COMMENT_RE
        .captures_iter(pgn)
        .filter_map(|comment| {
            let body = comment.get(1)?.as_str();
            let clock = CLK_TAG_RE.captures(body)?.get(1)?;
            Some(clock.as_str().trim().to_string())
        })
        .collect()
}

/// Parse `H:MM:SS` or `H:MM:SS.s` into seconds.
///
/// Minutes and seconds are not range checked: `0:75:00` is 4500 seconds.
/// Returns `None` for empty or malformed text.
pub fn parse_clock(clock: &str) -> Option<f64> {
    let mut parts = clock.trim().split(':');
    let (hours, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    if !is_digits(hours) || !is_digits(minutes) || !is_decimal(seconds) {
        return None;
    }

    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Seconds on the clock; empty or malformed text counts as `0`.
pub fn clock_to_seconds(clock: &str) -> f64 {
    parse_clock(clock).unwrap_or(0.0)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    match s.split_once('.') {
        Some((whole, frac)) => is_digits(whole) && is_digits(frac),
        None => is_digits(s),
    }
}

/// Last clock reading seen for each side within one game.
#[derive(Debug, Default, Clone)]
pub struct ClockTracker {
    white: Option<f64>,
    black: Option<f64>,
}

impl ClockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `side`'s clock and return the time spent since its previous reading.
    ///
    /// A ply without a readable clock returns `None` and leaves the previous
    /// reading in place. Negative results (increment) are kept as-is.
    pub fn record(&mut self, side: Side, clock: &str) -> Option<f64> {
        let current = parse_clock(clock)?;
        let slot = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        slot.replace(current).map(|previous| previous - current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_to_seconds_basic() {
        assert_eq!(clock_to_seconds("0:15:00"), 900.0);
        assert_eq!(clock_to_seconds("1:00:00.5"), 3600.5);
        assert_eq!(clock_to_seconds(""), 0.0);
    }

    #[test]
    fn test_clock_to_seconds_multi_digit_hours() {
        assert_eq!(clock_to_seconds("12:34:56"), 45296.0);
        assert_eq!(clock_to_seconds("120:00:00"), 432000.0);
    }

    #[test]
    fn test_clock_to_seconds_out_of_range_is_arithmetic() {
        assert_eq!(clock_to_seconds("0:75:00"), 4500.0);
        assert_eq!(clock_to_seconds("0:00:90"), 90.0);
    }

    #[test]
    fn test_parse_clock_rejects_malformed() {
        assert_eq!(parse_clock(""), None);
        assert_eq!(parse_clock("abc"), None);
        assert_eq!(parse_clock("15:00"), None);
        assert_eq!(parse_clock("1:2:3:4"), None);
        assert_eq!(parse_clock("0:1x:00"), None);
        assert_eq!(parse_clock("0:15:"), None);
        assert_eq!(parse_clock("0:15:00."), None);
        assert_eq!(clock_to_seconds("garbage"), 0.0);
    }

    #[test]
    fn test_scan_clock_comments_in_order() {
        let pgn = "1. e4 {[%clk 0:15:00]} 1... e5 {[%clk 0:14:58.3]} 2. Nf3 {[%clk 0:14:50]}";
        assert_eq!(
            scan_clock_comments(pgn),
            vec!["0:15:00", "0:14:58.3", "0:14:50"]
        );
    }

    #[test]
    fn test_scan_clock_comments_with_other_annotations() {
        let pgn = "1. d4 { [%eval 0.25] [%clk 1:30:43] } Nf6 { [%clk 1:30:42] [%eval 0.22] }";
        assert_eq!(scan_clock_comments(pgn), vec!["1:30:43", "1:30:42"]);
    }

    #[test]
    fn test_scan_clock_comments_skips_plain_comments_and_headers() {
        let pgn = r#"[Event "Live Chess"]
[TimeControl "600"]

{ opening book } 1. e4 {[%clk 0:10:00]} { good move } e5 {[%clk 0:09:59]}"#;
        assert_eq!(scan_clock_comments(pgn), vec!["0:10:00", "0:09:59"]);
    }

    #[test]
    fn test_tracker_first_reading_has_no_time_spent() {
        let mut tracker = ClockTracker::new();
        assert_eq!(tracker.record(Side::White, "0:15:00"), None);
        assert_eq!(tracker.record(Side::Black, "0:15:00"), None);
        assert_eq!(tracker.record(Side::White, "0:14:50"), Some(10.0));
        assert_eq!(tracker.record(Side::Black, "0:14:30"), Some(30.0));
    }

    #[test]
    fn test_tracker_increment_can_go_negative() {
        let mut tracker = ClockTracker::new();
        tracker.record(Side::White, "0:03:00");
        assert_eq!(tracker.record(Side::White, "0:03:02"), Some(-2.0));
    }

    #[test]
    fn test_tracker_missing_clock_keeps_previous_reading() {
        let mut tracker = ClockTracker::new();
        tracker.record(Side::White, "0:05:00");
        assert_eq!(tracker.record(Side::White, ""), None);
        assert_eq!(tracker.record(Side::White, "0:04:40"), Some(20.0));
    }
}
