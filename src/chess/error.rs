use std::fmt;

/// Joins diagnostics for one game into a single `"; "`-separated message.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Reasons the rules-aware replay of a movetext gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    Reader(String),
    NoGame,
    InvalidFen(String),
    IllegalMove {
        ply: usize,
        san: String,
        reason: String,
    },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(err) => write!(f, "PGN reader error: {}", err),
            Self::NoGame => f.write_str("no game found in PGN"),
            Self::InvalidFen(err) => write!(f, "invalid FEN: {}", err),
            Self::IllegalMove { ply, san, reason } => {
                write!(f, "illegal move '{}' at ply {}: {}", san, ply, reason)
            }
        }
    }
}

impl std::error::Error for ExtractError {}
