use super::error::ExtractError;
use super::types::Side;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{CastlingMode, Chess, Color, Position, fen::Fen};
use smallvec::SmallVec;
use std::ops::ControlFlow;

/// A mainline ply accepted by the rules engine, before clocks are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReplayedMove {
    pub algebraic: String,
    pub side: Side,
    pub move_number: u32,
}

pub(crate) type MoveHistory = SmallVec<[ReplayedMove; 128]>;

/// Full-move number of the ply at absolute index `ply_index` (0 = white's first move).
///
/// Computed in `u64`: a FEN full-move counter near `u32::MAX` pushes the
/// index past `u32` range.
pub(crate) fn move_number_for_ply(ply_index: u64, side: Side) -> u64 {
    match side {
        Side::White => (ply_index + 1).div_ceil(2),
        Side::Black => (ply_index + 1) / 2,
    }
}

#[derive(Default)]
pub(crate) struct StartTags {
    fen: Option<Vec<u8>>,
    chess960: bool,
}

impl StartTags {
    fn start_position(&self) -> Result<Chess, ExtractError> {
        let Some(fen) = self.fen.as_deref() else {
            return Ok(Chess::default());
        };

        let mode = if self.chess960 {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        };
        let fen = Fen::from_ascii(fen).map_err(|e| ExtractError::InvalidFen(e.to_string()))?;
        fen.into_position(mode)
            .map_err(|e| ExtractError::InvalidFen(e.to_string()))
    }
}

pub(crate) struct Replay {
    pos: Chess,
    /// Absolute ply index of the first move, non-zero for FEN starts.
    ply_offset: u64,
    history: MoveHistory,
}

/// Replays the mainline through shakmaty, rejecting the whole game on the
/// first move that is not legal in the current position.
pub(crate) struct TimingVisitor;

impl Visitor for TimingVisitor {
    type Tags = StartTags;
    type Movetext = Replay;
    type Output = Result<MoveHistory, ExtractError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(StartTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        if key.eq_ignore_ascii_case(b"FEN") {
            tags.fen = Some(value.as_bytes().to_vec());
        } else if key.eq_ignore_ascii_case(b"Variant") {
            tags.chess960 = String::from_utf8_lossy(value.as_bytes())
                .trim()
                .eq_ignore_ascii_case("chess960");
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let pos = match tags.start_position() {
            Ok(pos) => pos,
            Err(err) => return ControlFlow::Break(Err(err)),
        };

        let ply_offset = 2 * (u64::from(pos.fullmoves().get()) - 1)
            + u64::from(pos.turn() == Color::Black);

        ControlFlow::Continue(Replay {
            pos,
            ply_offset,
            history: MoveHistory::new(),
        })
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        let ply = movetext.history.len();

        match san_plus.san.to_move(&movetext.pos) {
            Ok(m) => {
                let side = Side::from(movetext.pos.turn());
                let ply_index = movetext.ply_offset + ply as u64;
                let Ok(move_number) = u32::try_from(move_number_for_ply(ply_index, side)) else {
                    return ControlFlow::Break(Err(ExtractError::InvalidFen(format!(
                        "full-move number overflows at ply {}",
                        ply + 1
                    ))));
                };
                // Engine SAN: check/mate suffixes and disambiguation are normalized.
                let canonical = SanPlus::from_move_and_play_unchecked(&mut movetext.pos, m);
                movetext.history.push(ReplayedMove {
                    algebraic: canonical.to_string(),
                    side,
                    move_number,
                });
                ControlFlow::Continue(())
            }
            Err(err) => ControlFlow::Break(Err(ExtractError::IllegalMove {
                ply: ply + 1,
                san: san_plus.to_string(),
                reason: err.to_string(),
            })),
        }
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        Ok(movetext.history)
    }
}

/// Replay the first game in `pgn`. Any failure discards the partial history.
pub(crate) fn replay_mainline(pgn: &str) -> Result<MoveHistory, ExtractError> {
    if pgn.trim().is_empty() {
        return Err(ExtractError::NoGame);
    }

    let mut reader = Reader::new(pgn.as_bytes());
    match reader.read_game(&mut TimingVisitor) {
        Ok(Some(result)) => result,
        Ok(None) => Err(ExtractError::NoGame),
        Err(err) => Err(ExtractError::Reader(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sans(history: &MoveHistory) -> Vec<&str> {
        history.iter().map(|m| m.algebraic.as_str()).collect()
    }

    #[test]
    fn test_move_number_for_ply() {
        let sides = [Side::White, Side::Black];
        let numbers: Vec<u64> = (0..6)
            .map(|i| move_number_for_ply(i, sides[i as usize % 2]))
            .collect();
        assert_eq!(numbers, vec![1, 1, 2, 2, 3, 3]);
        assert_eq!(
            move_number_for_ply(2 * u64::from(u32::MAX), Side::White),
            u64::from(u32::MAX) + 1
        );
    }

    #[test]
    fn test_replay_basic_game() {
        let pgn = r#"[Event "Test Game"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 1-0"#;
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(sans(&history), vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
        assert_eq!(history[0].side, Side::White);
        assert_eq!(history[1].side, Side::Black);
        assert_eq!(history[5].move_number, 3);
    }

    #[test]
    fn test_replay_keeps_check_suffix_and_castling() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Nf6 4. O-O Bc5 5. Bxf7+ Kxf7";
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(history[6].algebraic, "O-O");
        assert_eq!(history[8].algebraic, "Bxf7+");
        assert_eq!(history[9].move_number, 5);
    }

    #[test]
    fn test_replay_normalizes_san() {
        let pgn = "1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7";
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(history[6].algebraic, "Qxf7#");

        let pgn = "1. e4 e5 2. Ngf3 f6 3. Nxe5 fxe5 4. Qh5";
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(history[2].algebraic, "Nf3");
        assert_eq!(history[6].algebraic, "Qh5+");
    }

    #[test]
    fn test_replay_huge_fen_move_counter() {
        let pgn = r#"[FEN "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 4294967295"]

1. e4 e5"#;
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.move_number == u32::MAX));

        let pgn = r#"[FEN "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 4294967295"]

1. e4 e5 2. Nf3"#;
        assert!(matches!(
            replay_mainline(pgn),
            Err(ExtractError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_replay_skips_variations() {
        let pgn = "1. e4 (1. d4 d5) e5 {[%clk 0:01:00]} 2. Nf3";
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(sans(&history), vec!["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let pgn = "1. e4 e5 2. Ke3 Nc6";
        match replay_mainline(pgn) {
            Err(ExtractError::IllegalMove { ply, san, .. }) => {
                assert_eq!(ply, 3);
                assert_eq!(san, "Ke3");
            }
            other => panic!("expected illegal move, got {:?}", other),
        }
    }

    #[test]
    fn test_replay_empty_input_is_no_game() {
        assert_eq!(replay_mainline(""), Err(ExtractError::NoGame));
        assert_eq!(replay_mainline("  \n\t"), Err(ExtractError::NoGame));
    }

    #[test]
    fn test_replay_from_fen_with_black_to_move() {
        // Position after 1.e4 e5 2.Nf3 Nc6 3.Bb5
        let pgn = r#"[FEN "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3"]

3... a6 4. Ba4 Nf6 1-0"#;
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(sans(&history), vec!["a6", "Ba4", "Nf6"]);
        assert_eq!(history[0].side, Side::Black);
        assert_eq!(history[0].move_number, 3);
        assert_eq!(history[1].move_number, 4);
        assert_eq!(history[2].move_number, 4);
    }

    #[test]
    fn test_replay_invalid_fen() {
        let pgn = r#"[FEN "invalid fen string"]

1. e4 e5 1-0"#;
        assert!(matches!(
            replay_mainline(pgn),
            Err(ExtractError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_replay_chess960_variant() {
        let pgn = r#"[Variant "Chess960"]
[FEN "brkrqnnb/pppppppp/8/8/8/8/PPPPPPPP/BRKRQNNB w KQkq - 0 1"]

1. g3 d5 2. d4 g6 1-0"#;
        let history = replay_mainline(pgn).unwrap();
        assert_eq!(history.len(), 4);
    }
}
