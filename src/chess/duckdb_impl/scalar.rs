//! Shared plumbing for unary VARCHAR scalars.
//!
//! # Safety
//! These helpers MUST only be called from within a DuckDB scalar `invoke()`
//! while the input and output vectors are valid.

use std::error::Error;
use std::ffi::CString;

use duckdb::{
    Result,
    core::{DataChunkHandle, FlatVector, Inserter, LogicalTypeId},
    vtab::arrow::WritableVector,
};
use libduckdb_sys::duckdb_string_t;

use super::string::decode_duckdb_string;

#[derive(Debug, Clone)]
pub enum VarcharOutput {
    Null,
    Value(String),
}

fn ensure_type(
    vec: &FlatVector,
    expected: LogicalTypeId,
    label: &str,
) -> Result<(), Box<dyn Error>> {
    let actual = vec.logical_type().id();
    if actual != expected {
        return Err(format!(
            "scalar helper type mismatch: {label} expected {expected:?}, got {actual:?}"
        )
        .into());
    }
    Ok(())
}

/// Replace interior NUL bytes so the value fits in a `CString`.
pub(crate) fn to_cstring(value: &str) -> Result<CString, Box<dyn Error>> {
    if value.contains('\0') {
        Ok(CString::new(value.replace('\0', " "))?)
    } else {
        Ok(CString::new(value)?)
    }
}

/// Invoke a `VARCHAR -> VARCHAR` scalar; NULL rows stay NULL.
pub fn invoke_unary_varchar_to_varchar<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> VarcharOutput,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Varchar, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        match f(val.as_str()) {
            VarcharOutput::Null => output_vec.set_null(i),
            VarcharOutput::Value(v) => output_vec.insert(i, to_cstring(&v)?),
        }
    }

    Ok(())
}

/// Invoke a `VARCHAR -> DOUBLE` scalar that outputs NULL for NULL input or
/// when `f` returns `None`.
pub fn invoke_unary_varchar_to_f64_nullable<F>(
    input: &DataChunkHandle,
    output: &mut dyn WritableVector,
    mut f: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(&str) -> Option<f64>,
{
    let len = input.len();
    let input_vec = input.flat_vector(0);
    ensure_type(&input_vec, LogicalTypeId::Varchar, "input[0]")?;
    let input_slice = input_vec.as_slice::<duckdb_string_t>();
    let mut output_vec = output.flat_vector();
    ensure_type(&output_vec, LogicalTypeId::Double, "output")?;

    for (i, s) in input_slice.iter().take(len).enumerate() {
        if input_vec.row_is_null(i as u64) {
            output_vec.set_null(i);
            continue;
        }

        // SAFETY: Row nullability is checked above.
        let val = unsafe { decode_duckdb_string(s) };
        match f(val.as_str()) {
            Some(v) => output_vec.as_mut_slice::<f64>()[i] = v,
            None => output_vec.set_null(i),
        }
    }

    Ok(())
}
