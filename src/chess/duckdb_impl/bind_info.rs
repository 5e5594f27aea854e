use duckdb::vtab::BindInfo;
use libduckdb_sys::{
    duckdb_bind_get_named_parameter, duckdb_bind_info, duckdb_destroy_value, duckdb_free,
    duckdb_get_varchar, duckdb_is_null_value,
};
use std::ffi::{CStr, CString};
use std::os::raw::c_void;

/// A VARCHAR named parameter as seen at bind time.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum NamedVarchar {
    Missing,
    Null,
    Value(String),
}

pub(crate) fn named_varchar(
    bind: &BindInfo,
    name: &str,
) -> Result<NamedVarchar, Box<dyn std::error::Error>> {
    let name_cstr = CString::new(name)?;

    // SAFETY: the returned value is owned by us and destroyed below.
    let mut value =
        unsafe { duckdb_bind_get_named_parameter(raw_bind_info(bind), name_cstr.as_ptr()) };
    if value.is_null() {
        return Ok(NamedVarchar::Missing);
    }

    // SAFETY: `value` is a live `duckdb_value`; the VARCHAR copy is freed with `duckdb_free`.
    let result = unsafe {
        if duckdb_is_null_value(value) {
            Ok(NamedVarchar::Null)
        } else {
            let varchar = duckdb_get_varchar(value);
            if varchar.is_null() {
                Err(format!("Failed to read named parameter '{}' as VARCHAR", name).into())
            } else {
                let text = CStr::from_ptr(varchar).to_string_lossy().into_owned();
                duckdb_free(varchar as *mut c_void);
                Ok(NamedVarchar::Value(text))
            }
        }
    };

    // SAFETY: `value` has not been destroyed yet.
    unsafe {
        duckdb_destroy_value(&mut value);
    }

    result
}

fn raw_bind_info(bind: &BindInfo) -> duckdb_bind_info {
    // SAFETY: in duckdb-rs 1.10500 `duckdb::vtab::BindInfo` holds a single
    // `duckdb_bind_info` field (`src/vtab/function.rs`) and has no raw accessor or
    // NULL-aware named-parameter getter, so the handle is read through a cast.
    //
    // When bumping duckdb-rs, re-check:
    // - the `BindInfo` layout in `src/vtab/function.rs`
    // - whether a public accessor now makes this cast unnecessary
    // - `compression` handling for omitted, NULL, 'zstd' and invalid values
    unsafe { *(bind as *const BindInfo as *const duckdb_bind_info) }
}
