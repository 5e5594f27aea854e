use std::error::Error;

use duckdb::{
    Result,
    core::{DataChunkHandle, LogicalTypeHandle, LogicalTypeId},
    vscalar::{ScalarFunctionSignature, VScalar},
    vtab::arrow::WritableVector,
};

use super::clock::parse_clock;
use super::duckdb_impl::scalar::{
    VarcharOutput, invoke_unary_varchar_to_f64_nullable, invoke_unary_varchar_to_varchar,
};
use super::extract::{extract, moves_to_json};
use super::headers::{extract_metadata, metadata_to_json};

/// `chess_timed_moves_json(pgn)`: timed half-moves as a JSON array.
pub struct ChessTimedMovesJsonScalar;

impl VScalar for ChessTimedMovesJsonScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, |pgn| {
            VarcharOutput::Value(moves_to_json(&extract(pgn).moves))
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )]
    }
}

/// `chess_pgn_headers_json(pgn)`: header tags as a JSON object.
pub struct ChessPgnHeadersJsonScalar;

impl VScalar for ChessPgnHeadersJsonScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_varchar(input, output, |pgn| {
            VarcharOutput::Value(metadata_to_json(&extract_metadata(pgn)))
        })
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )]
    }
}

/// `chess_clock_seconds(clock)`: `H:MM:SS(.s)` as seconds.
pub struct ChessClockSecondsScalar;

impl VScalar for ChessClockSecondsScalar {
    type State = ();

    unsafe fn invoke(
        _state: &Self::State,
        input: &mut DataChunkHandle,
        output: &mut dyn WritableVector,
    ) -> Result<(), Box<dyn Error>> {
        invoke_unary_varchar_to_f64_nullable(input, output, clock_seconds)
    }

    fn signatures() -> Vec<ScalarFunctionSignature> {
        vec![ScalarFunctionSignature::exact(
            vec![LogicalTypeHandle::from(LogicalTypeId::Varchar)],
            LogicalTypeHandle::from(LogicalTypeId::Double),
        )]
    }
}

/// Empty text is a zero clock; malformed text has no value.
fn clock_seconds(clock: &str) -> Option<f64> {
    if clock.trim().is_empty() {
        Some(0.0)
    } else {
        parse_clock(clock)
    }
}
