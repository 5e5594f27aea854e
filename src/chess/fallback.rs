//! Pattern-based move extraction for movetext the rules engine rejects.
//!
//! Matches full-move units of the shape
//! `N. <white> {...} [N... ]<black> {...}` directly over the raw text and
//! reads the `[%clk ...]` tag from anywhere inside each comment. No legality
//! checking is done.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::clock::{CLK_TAG_RE, ClockTracker};
use super::types::{Side, TimedHalfMove};

static FULL_MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let san = r"[\w+#=\-!?]+";
    let comment = r"\{([^}]*)\}";
    Regex::new(&format!(
        r"(\d+)\.\s+({san})\s+{comment}(?:\s+(?:\d+\.{{3}}\s+)?({san})\s+{comment})?"
    ))
    .expect("valid full-move regex")
});

pub fn extract_fallback(pgn: &str) -> Vec<TimedHalfMove> {
    let mut tracker = ClockTracker::new();
    let mut moves = Vec::new();

    for caps in FULL_MOVE_RE.captures_iter(pgn) {
        let Some(move_number) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            continue;
        };

        if let Some(white) = half_move(&caps, 2, 3, Side::White, move_number, &mut tracker) {
            moves.push(white);
        }
        if let Some(black) = half_move(&caps, 4, 5, Side::Black, move_number, &mut tracker) {
            moves.push(black);
        }
    }

    moves
}

fn half_move(
    caps: &Captures<'_>,
    san_group: usize,
    comment_group: usize,
    side: Side,
    move_number: u32,
    tracker: &mut ClockTracker,
) -> Option<TimedHalfMove> {
    let algebraic = caps.get(san_group)?.as_str().to_string();
    let clock_remaining = caps
        .get(comment_group)
        .and_then(|body| CLK_TAG_RE.captures(body.as_str()))
        .and_then(|clk| clk.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let time_spent = tracker.record(side, &clock_remaining);

    Some(TimedHalfMove {
        algebraic,
        side,
        move_number,
        clock_remaining,
        time_spent,
    })
}
