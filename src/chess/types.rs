use std::collections::BTreeMap;
use std::fmt;

use shakmaty::Color;

/// PGN header tag name -> literal value. Last occurrence of a tag wins.
pub type GameMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ply of the game with its clock annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedHalfMove {
    /// Canonical SAN from the rules engine; the raw token on the fallback path.
    pub algebraic: String,
    pub side: Side,
    /// Full-move number; both plies of move N share N.
    pub move_number: u32,
    /// Verbatim `[%clk ...]` value, empty when the ply carries no clock.
    pub clock_remaining: String,
    /// Seconds since this side's previous clock reading.
    pub time_spent: Option<f64>,
}

/// Which extraction path produced the move list of a [`ParsedGame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPath {
    Structured,
    Fallback,
    Empty,
}

impl ExtractionPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Fallback => "fallback",
            Self::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGame {
    pub metadata: GameMetadata,
    pub moves: Vec<TimedHalfMove>,
    pub path: ExtractionPath,
    /// Diagnostics collected while extracting. Informational only.
    pub parse_error: Option<String>,
}

impl ParsedGame {
    /// Unique game identifier as published by game archives: `Link`, else `Site`.
    pub fn game_link(&self) -> Option<&str> {
        self.metadata
            .get("Link")
            .or_else(|| self.metadata.get("Site"))
            .map(String::as_str)
            .filter(|link| !link.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_with(tags: &[(&str, &str)]) -> ParsedGame {
        ParsedGame {
            metadata: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            moves: Vec::new(),
            path: ExtractionPath::Empty,
            parse_error: None,
        }
    }

    #[test]
    fn test_side_from_color() {
        assert_eq!(Side::from(Color::White), Side::White);
        assert_eq!(Side::from(Color::Black), Side::Black);
        assert_eq!(Side::White.opposite(), Side::Black);
        assert_eq!(Side::Black.to_string(), "black");
    }

    #[test]
    fn test_game_link_prefers_link_header() {
        let game = game_with(&[
            ("Site", "Chess.com"),
            ("Link", "https://www.chess.com/game/live/1"),
        ]);
        assert_eq!(game.game_link(), Some("https://www.chess.com/game/live/1"));
    }

    #[test]
    fn test_game_link_falls_back_to_site() {
        let game = game_with(&[("Site", "https://lichess.org/abcd1234")]);
        assert_eq!(game.game_link(), Some("https://lichess.org/abcd1234"));
        assert_eq!(game_with(&[]).game_link(), None);
    }
}
