pub mod clock;
mod duckdb_impl;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod headers;
mod log;
mod reader;
mod scalars;
pub mod types;
mod visitor;

pub use error::ExtractError;
pub use extract::{extract, extract_batch, extract_moves, extract_structured, moves_to_json};
pub use types::{ExtractionPath, GameMetadata, ParsedGame, Side, TimedHalfMove};

use duckdb::{Connection, Result};
use duckdb_ext_macros::duckdb_extension;
use reader::ReadPgnClocksVTab;
use scalars::{ChessClockSecondsScalar, ChessPgnHeadersJsonScalar, ChessTimedMovesJsonScalar};
use std::error::Error;

#[duckdb_extension(name = "chess_clock", api_version = "v1.0.0")]
pub unsafe fn extension_entrypoint(con: Connection) -> Result<(), Box<dyn Error>> {
    // Table functions
    con.register_table_function::<ReadPgnClocksVTab>("read_pgn_clocks")?;

    // Scalar functions
    con.register_scalar_function::<ChessTimedMovesJsonScalar>("chess_timed_moves_json")?;
    con.register_scalar_function::<ChessPgnHeadersJsonScalar>("chess_pgn_headers_json")?;
    con.register_scalar_function::<ChessClockSecondsScalar>("chess_clock_seconds")?;

    Ok(())
}
