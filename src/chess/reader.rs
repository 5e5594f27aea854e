//! `read_pgn_clocks(path, compression := ...)`: one row per timed half-move
//! for every game in every matched PGN file.

use super::{
    clock::parse_clock,
    duckdb_impl::{
        bind_info::{NamedVarchar, named_varchar},
        scalar::to_cstring,
    },
    error::ErrorAccumulator,
    extract::extract,
    log,
    types::{ExtractionPath, ParsedGame, TimedHalfMove},
};
use duckdb::{
    core::{DataChunkHandle, Inserter, LogicalTypeHandle, LogicalTypeId},
    vtab::{BindInfo, InitInfo, TableFunctionInfo, VTab},
};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use zstd::stream::read::Decoder as ZstdDecoder;

#[repr(C)]
pub struct ReadPgnClocksBindData {
    paths: Vec<PathBuf>,
    sources: Vec<String>,
    compression: CompressionMode,
}

#[repr(C)]
pub struct ReadPgnClocksInitData {
    state: Mutex<SharedState>,
}

pub struct ReadPgnClocksVTab;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CompressionMode {
    Plain,
    Zstd,
}

const PATH_PATTERN_PARAM_INDEX: u64 = 0;
const ROWS_PER_CHUNK: usize = 2048;
const READ_PGN_CLOCKS_COLUMN_COUNT: usize = 14;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ClockColumn {
    Source = 0,
    GameIndex = 1,
    GameLink = 2,
    White = 3,
    Black = 4,
    Ply = 5,
    MoveNumber = 6,
    Side = 7,
    Algebraic = 8,
    ClockRemaining = 9,
    ClockSeconds = 10,
    TimeSpent = 11,
    Extraction = 12,
    ParseError = 13,
}

impl ClockColumn {
    const fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        READ_PGN_CLOCKS_COLUMNS[self.index()].name
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ClockLogicalType {
    Varchar,
    UInteger,
    Double,
}

impl ClockLogicalType {
    fn to_handle(self) -> LogicalTypeHandle {
        match self {
            Self::Varchar => LogicalTypeHandle::from(LogicalTypeId::Varchar),
            Self::UInteger => LogicalTypeHandle::from(LogicalTypeId::UInteger),
            Self::Double => LogicalTypeHandle::from(LogicalTypeId::Double),
        }
    }
}

struct ClockColumnDef {
    name: &'static str,
    logical_type: ClockLogicalType,
}

const fn column(name: &'static str, logical_type: ClockLogicalType) -> ClockColumnDef {
    ClockColumnDef { name, logical_type }
}

const READ_PGN_CLOCKS_COLUMNS: [ClockColumnDef; READ_PGN_CLOCKS_COLUMN_COUNT] = [
    column("source", ClockLogicalType::Varchar),
    column("game_index", ClockLogicalType::UInteger),
    column("game_link", ClockLogicalType::Varchar),
    column("White", ClockLogicalType::Varchar),
    column("Black", ClockLogicalType::Varchar),
    column("ply", ClockLogicalType::UInteger),
    column("move_number", ClockLogicalType::UInteger),
    column("side", ClockLogicalType::Varchar),
    column("algebraic", ClockLogicalType::Varchar),
    column("clock_remaining", ClockLogicalType::Varchar),
    column("clock_seconds", ClockLogicalType::Double),
    column("time_spent", ClockLogicalType::Double),
    column("extraction", ClockLogicalType::Varchar),
    column("parse_error", ClockLogicalType::Varchar),
];

impl CompressionMode {
    fn parse(raw: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or NULL/omitted.",
                normalized
            )
            .into())
        }
    }
}

fn resolve_compression_mode(
    bind: &BindInfo,
) -> Result<CompressionMode, Box<dyn std::error::Error>> {
    match named_varchar(bind, "compression")? {
        NamedVarchar::Missing | NamedVarchar::Null => Ok(CompressionMode::Plain),
        NamedVarchar::Value(raw) if raw.trim().eq_ignore_ascii_case("null") => {
            Ok(CompressionMode::Plain)
        }
        NamedVarchar::Value(raw) => CompressionMode::parse(&raw),
    }
}

pub type PgnInput = Box<dyn BufRead + Send>;

fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput, String> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(BufReader::new(file))),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(BufReader::new(decoder)) as PgnInput)
            .map_err(|e| {
                format!(
                    "Failed to initialize zstd decoder for '{}': {}",
                    path.display(),
                    e
                )
            }),
    }
}

/// Splits a PGN stream into the raw text of each game.
///
/// A header line (`[Tag ...`) that follows movetext starts the next game.
pub struct GameSplitter<R> {
    input: R,
    pending_header: Option<String>,
}

impl<R: BufRead> GameSplitter<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending_header: None,
        }
    }

    pub fn next_game(&mut self) -> io::Result<Option<String>> {
        let mut game = self.pending_header.take().unwrap_or_default();
        let mut seen_movetext = false;
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let trimmed = line.trim();
            if is_header_line(trimmed) {
                if seen_movetext {
                    self.pending_header = Some(line.into_owned());
                    return Ok(Some(game));
                }
            } else if !trimmed.is_empty() {
                seen_movetext = true;
            }
            game.push_str(&line);
        }

        if game.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(game))
        }
    }
}

fn is_header_line(line: &str) -> bool {
    line.starts_with('[') && !line.starts_with("[%")
}

/// One output row: a half-move, or a placeholder for a game without moves.
#[derive(Debug, Clone, PartialEq)]
struct ClockRow {
    game_index: u32,
    game_link: Option<String>,
    white: Option<String>,
    black: Option<String>,
    ply: Option<u32>,
    half_move: Option<TimedHalfMove>,
    extraction: ExtractionPath,
    parse_error: Option<String>,
}

fn rows_for_game(game_index: u32, game: ParsedGame) -> Vec<ClockRow> {
    let game_link = game.game_link().map(str::to_string);
    let white = game.metadata.get("White").cloned();
    let black = game.metadata.get("Black").cloned();
    let row = |ply: Option<u32>, half_move: Option<TimedHalfMove>| ClockRow {
        game_index,
        game_link: game_link.clone(),
        white: white.clone(),
        black: black.clone(),
        ply,
        half_move,
        extraction: game.path,
        parse_error: game.parse_error.clone(),
    };

    if game.moves.is_empty() {
        return vec![row(None, None)];
    }

    game.moves
        .iter()
        .enumerate()
        .map(|(i, m)| row(Some(i as u32 + 1), Some(m.clone())))
        .collect()
}

pub struct PgnClockReaderState {
    splitter: GameSplitter<PgnInput>,
    path_idx: usize,
    next_game_index: u32,
    pending_rows: VecDeque<ClockRow>,
    exhausted: bool,
}

impl PgnClockReaderState {
    pub fn new(input: PgnInput, path_idx: usize) -> Self {
        Self {
            splitter: GameSplitter::new(input),
            path_idx,
            next_game_index: 1,
            pending_rows: VecDeque::new(),
            exhausted: false,
        }
    }
}

pub struct SharedState {
    pub next_path_idx: usize,
    pub available_readers: Vec<PgnClockReaderState>,
}

enum ReadNextGameOutcome {
    GameReady,
    ReaderFinished,
}

fn sanitize_for_cstring<'a>(
    value: &'a str,
    field_name: &str,
    parse_error: &mut ErrorAccumulator,
) -> Cow<'a, str> {
    if value.contains('\0') {
        parse_error.push(&format!("Sanitized interior NUL in {}", field_name));
        Cow::Owned(value.replace('\0', " "))
    } else {
        Cow::Borrowed(value)
    }
}

struct ChunkWriter<'a> {
    output: &'a mut DataChunkHandle,
    row_count: usize,
}

impl<'a> ChunkWriter<'a> {
    fn new(output: &'a mut DataChunkHandle) -> Self {
        Self {
            output,
            row_count: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.row_count >= ROWS_PER_CHUNK
    }

    fn write_row(
        &mut self,
        source: &str,
        row: &ClockRow,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let row_idx = self.row_count;
        let mut row_parse_error = ErrorAccumulator::default();
        if let Some(parse_error) = row.parse_error.as_deref() {
            row_parse_error.push(parse_error);
        }
        let half_move = row.half_move.as_ref();

        self.write_optional_varchar(
            ClockColumn::Source,
            row_idx,
            Some(source),
            &mut row_parse_error,
        )?;
        self.write_optional_uinteger(ClockColumn::GameIndex, row_idx, Some(row.game_index));
        self.write_optional_varchar(
            ClockColumn::GameLink,
            row_idx,
            row.game_link.as_deref(),
            &mut row_parse_error,
        )?;
        self.write_optional_varchar(
            ClockColumn::White,
            row_idx,
            row.white.as_deref(),
            &mut row_parse_error,
        )?;
        self.write_optional_varchar(
            ClockColumn::Black,
            row_idx,
            row.black.as_deref(),
            &mut row_parse_error,
        )?;
        self.write_optional_uinteger(ClockColumn::Ply, row_idx, row.ply);
        self.write_optional_uinteger(
            ClockColumn::MoveNumber,
            row_idx,
            half_move.map(|m| m.move_number),
        );
        self.write_optional_varchar(
            ClockColumn::Side,
            row_idx,
            half_move.map(|m| m.side.as_str()),
            &mut row_parse_error,
        )?;
        self.write_optional_varchar(
            ClockColumn::Algebraic,
            row_idx,
            half_move.map(|m| m.algebraic.as_str()),
            &mut row_parse_error,
        )?;

        let clock = half_move
            .map(|m| m.clock_remaining.as_str())
            .filter(|clock| !clock.is_empty());
        self.write_optional_varchar(
            ClockColumn::ClockRemaining,
            row_idx,
            clock,
            &mut row_parse_error,
        )?;
        self.write_optional_double(
            ClockColumn::ClockSeconds,
            row_idx,
            clock.and_then(parse_clock),
        );
        self.write_optional_double(
            ClockColumn::TimeSpent,
            row_idx,
            half_move.and_then(|m| m.time_spent),
        );
        self.write_optional_varchar(
            ClockColumn::Extraction,
            row_idx,
            Some(row.extraction.as_str()),
            &mut row_parse_error,
        )?;

        let mut parse_error_vec = self.output.flat_vector(ClockColumn::ParseError.index());
        match row_parse_error.take() {
            Some(parse_error) => parse_error_vec.insert(row_idx, to_cstring(&parse_error)?),
            None => parse_error_vec.set_null(row_idx),
        }

        self.row_count += 1;
        Ok(())
    }

    fn set_output_len(&mut self) {
        self.output.set_len(self.row_count);
    }

    fn write_optional_varchar(
        &mut self,
        column: ClockColumn,
        row_idx: usize,
        value: Option<&str>,
        parse_error: &mut ErrorAccumulator,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut vector = self.output.flat_vector(column.index());
        if let Some(value) = value {
            let sanitized = sanitize_for_cstring(value, column.name(), parse_error);
            vector.insert(row_idx, to_cstring(sanitized.as_ref())?);
        } else {
            vector.set_null(row_idx);
        }
        Ok(())
    }

    fn write_optional_uinteger(&mut self, column: ClockColumn, row_idx: usize, value: Option<u32>) {
        let mut vector = self.output.flat_vector(column.index());
        if let Some(value) = value {
            vector.as_mut_slice::<u32>()[row_idx] = value;
        } else {
            vector.set_null(row_idx);
        }
    }

    fn write_optional_double(&mut self, column: ClockColumn, row_idx: usize, value: Option<f64>) {
        let mut vector = self.output.flat_vector(column.index());
        if let Some(value) = value {
            vector.as_mut_slice::<f64>()[row_idx] = value;
        } else {
            vector.set_null(row_idx);
        }
    }
}

fn acquire_reader(
    init_data: &ReadPgnClocksInitData,
    bind_data: &ReadPgnClocksBindData,
) -> Result<Option<PgnClockReaderState>, Box<dyn std::error::Error>> {
    loop {
        let path_idx = {
            let mut state = init_data
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(reader) = state.available_readers.pop() {
                return Ok(Some(reader));
            }

            if state.next_path_idx < bind_data.paths.len() {
                let path_idx = state.next_path_idx;
                state.next_path_idx += 1;
                path_idx
            } else {
                return Ok(None);
            }
        };

        let path = &bind_data.paths[path_idx];
        match open_input_stream(path, bind_data.compression) {
            Ok(input) => return Ok(Some(PgnClockReaderState::new(input, path_idx))),
            Err(err_msg) => {
                if bind_data.paths.len() == 1 {
                    return Err(err_msg.into());
                }

                log::warn(&err_msg);
            }
        }
    }
}

fn read_next_game(reader: &mut PgnClockReaderState, source_path: &Path) -> ReadNextGameOutcome {
    if reader.exhausted {
        return ReadNextGameOutcome::ReaderFinished;
    }

    let game_index = reader.next_game_index;
    match reader.splitter.next_game() {
        Ok(Some(text)) => {
            reader.next_game_index += 1;
            reader
                .pending_rows
                .extend(rows_for_game(game_index, extract(&text)));
            ReadNextGameOutcome::GameReady
        }
        Ok(None) => ReadNextGameOutcome::ReaderFinished,
        Err(error) => {
            let error_msg = format!(
                "Read error: file='{}'; game_index={}; error={}",
                source_path.display(),
                game_index,
                error
            );
            log::warn(&error_msg);
            reader.exhausted = true;
            reader.pending_rows.push_back(ClockRow {
                game_index,
                game_link: None,
                white: None,
                black: None,
                ply: None,
                half_move: None,
                extraction: ExtractionPath::Empty,
                parse_error: Some(error_msg),
            });
            ReadNextGameOutcome::GameReady
        }
    }
}

fn finalize_chunk(
    init_data: &ReadPgnClocksInitData,
    current_reader_state: Option<PgnClockReaderState>,
    chunk_writer: &mut ChunkWriter<'_>,
) {
    if let Some(reader) = current_reader_state {
        let mut state = init_data
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.available_readers.push(reader);
    }

    chunk_writer.set_output_len();
}

impl VTab for ReadPgnClocksVTab {
    type InitData = ReadPgnClocksInitData;
    type BindData = ReadPgnClocksBindData;

    fn bind(bind: &BindInfo) -> Result<Self::BindData, Box<dyn std::error::Error>> {
        let pattern = bind.get_parameter(PATH_PATTERN_PARAM_INDEX).to_string();
        let compression = resolve_compression_mode(bind)?;

        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            glob::glob(&pattern)?
                .filter_map(|entry| entry.ok())
                .collect()
        } else {
            vec![PathBuf::from(pattern)]
        };
        let sources = paths.iter().map(|p| p.display().to_string()).collect();

        for column in READ_PGN_CLOCKS_COLUMNS.iter() {
            bind.add_result_column(column.name, column.logical_type.to_handle());
        }

        Ok(ReadPgnClocksBindData {
            paths,
            sources,
            compression,
        })
    }

    fn init(_: &InitInfo) -> Result<Self::InitData, Box<dyn std::error::Error>> {
        Ok(ReadPgnClocksInitData {
            state: Mutex::new(SharedState {
                next_path_idx: 0,
                available_readers: Vec::new(),
            }),
        })
    }

    fn func(
        func: &TableFunctionInfo<Self>,
        output: &mut DataChunkHandle,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let init_data = func.get_init_data();
        let bind_data = func.get_bind_data();
        let mut chunk_writer = ChunkWriter::new(output);
        let mut current_reader_state: Option<PgnClockReaderState> = None;

        while !chunk_writer.is_full() {
            if current_reader_state.is_none() {
                current_reader_state = acquire_reader(init_data, bind_data)?;
                if current_reader_state.is_none() {
                    break;
                }
            }

            if let Some(mut reader) = current_reader_state.take() {
                if let Some(row) = reader.pending_rows.pop_front() {
                    chunk_writer.write_row(&bind_data.sources[reader.path_idx], &row)?;
                    current_reader_state = Some(reader);
                    continue;
                }

                let path_idx = reader.path_idx;
                match read_next_game(&mut reader, &bind_data.paths[path_idx]) {
                    ReadNextGameOutcome::GameReady => current_reader_state = Some(reader),
                    // Dropped here; the next iteration acquires more work.
                    ReadNextGameOutcome::ReaderFinished => {}
                }
            }
        }

        finalize_chunk(init_data, current_reader_state, &mut chunk_writer);
        Ok(())
    }

    fn parameters() -> Option<Vec<LogicalTypeHandle>> {
        Some(vec![
            LogicalTypeHandle::from(LogicalTypeId::Varchar), // path pattern (required)
        ])
    }

    fn named_parameters() -> Option<Vec<(String, LogicalTypeHandle)>> {
        Some(vec![(
            "compression".to_string(),
            LogicalTypeHandle::from(LogicalTypeId::Varchar),
        )])
    }
}
