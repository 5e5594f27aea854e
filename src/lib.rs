//! Timed move lists from PGN transcripts with `[%clk ...]` annotations,
//! as a Rust library and as a DuckDB extension.

pub mod chess;

pub use chess::{
    ExtractError, ExtractionPath, GameMetadata, ParsedGame, Side, TimedHalfMove, extract,
    extract_batch,
};
