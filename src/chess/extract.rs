use rayon::prelude::*;
use serde_json::{Value, json};

use super::clock::{ClockTracker, scan_clock_comments};
use super::error::{ErrorAccumulator, ExtractError};
use super::fallback::extract_fallback;
use super::headers::extract_metadata;
use super::log;
use super::types::{ExtractionPath, ParsedGame, TimedHalfMove};
use super::visitor::replay_mainline;

/// Move list together with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveExtraction {
    Structured(Vec<TimedHalfMove>),
    Fallback(Vec<TimedHalfMove>),
    Empty,
}

impl MoveExtraction {
    pub fn path(&self) -> ExtractionPath {
        match self {
            Self::Structured(_) => ExtractionPath::Structured,
            Self::Fallback(_) => ExtractionPath::Fallback,
            Self::Empty => ExtractionPath::Empty,
        }
    }

    pub fn into_moves(self) -> Vec<TimedHalfMove> {
        match self {
            Self::Structured(moves) | Self::Fallback(moves) => moves,
            Self::Empty => Vec::new(),
        }
    }
}

/// Rules-aware extraction: replay the mainline, then attach clock comments
/// to plies by position.
pub fn extract_structured(pgn: &str) -> Result<Vec<TimedHalfMove>, ExtractError> {
    let history = replay_mainline(pgn)?;
    let clocks = scan_clock_comments(pgn);
    let mut tracker = ClockTracker::new();

    let moves = history
        .into_iter()
        .enumerate()
        .map(|(i, replayed)| {
            let clock_remaining = clocks.get(i).cloned().unwrap_or_default();
            let time_spent = tracker.record(replayed.side, &clock_remaining);
            TimedHalfMove {
                algebraic: replayed.algebraic,
                side: replayed.side,
                move_number: replayed.move_number,
                clock_remaining,
                time_spent,
            }
        })
        .collect();

    Ok(moves)
}

/// Structured extraction first, pattern fallback second. Failures are
/// recorded in `diagnostics`, never returned.
pub fn extract_moves(pgn: &str, diagnostics: &mut ErrorAccumulator) -> MoveExtraction {
    match extract_structured(pgn) {
        Ok(moves) if !moves.is_empty() => return MoveExtraction::Structured(moves),
        Ok(_) => {
            diagnostics.push("no moves in movetext");
            return MoveExtraction::Empty;
        }
        Err(err) => {
            log::warn(format!(
                "Structured PGN parse failed, using pattern fallback: {}",
                err
            ));
            diagnostics.push(&format!("Structured parse failed: {}", err));
        }
    }

    let moves = extract_fallback(pgn);
    if moves.is_empty() {
        log::debug("Pattern fallback matched no moves");
        diagnostics.push("Fallback matched no moves");
        MoveExtraction::Empty
    } else {
        MoveExtraction::Fallback(moves)
    }
}

/// Extract metadata and timed moves from one PGN game. Never fails: the
/// worst case is the header map with an empty move list.
pub fn extract(pgn: &str) -> ParsedGame {
    let metadata = extract_metadata(pgn);
    let mut diagnostics = ErrorAccumulator::default();
    let extraction = extract_moves(pgn, &mut diagnostics);

    ParsedGame {
        metadata,
        path: extraction.path(),
        moves: extraction.into_moves(),
        parse_error: diagnostics.take(),
    }
}

/// Extract many independent games on the rayon pool; output order follows input.
pub fn extract_batch<S>(pgns: &[S]) -> Vec<ParsedGame>
where
    S: AsRef<str> + Sync,
{
    pgns.par_iter().map(|pgn| extract(pgn.as_ref())).collect()
}

pub fn moves_to_json(moves: &[TimedHalfMove]) -> String {
    let rows: Vec<Value> = moves
        .iter()
        .enumerate()
        .map(|(i, m)| {
            json!({
                "ply": i + 1,
                "move_number": m.move_number,
                "side": m.side.as_str(),
                "algebraic": m.algebraic,
                "clock_remaining": m.clock_remaining,
                "time_spent": m.time_spent,
            })
        })
        .collect();

    serde_json::to_string(&rows).unwrap_or_else(|e| {
        log::error(format!("Failed to serialize timed moves: {}", e));
        "[]".to_string()
    })
}
