use libduckdb_sys::duckdb_string_t;

/// DuckDB stores strings of up to 12 bytes inline in the `duckdb_string_t`.
const INLINE_CAPACITY: u32 = 12;

/// Borrow the bytes of a DuckDB string value.
///
/// # Safety
///
/// `s` must be a non-NULL row of a VARCHAR vector that stays valid for the
/// lifetime of the returned slice.
unsafe fn duckdb_string_bytes(s: &duckdb_string_t) -> &[u8] {
    // SAFETY: both union variants start with the length field.
    let len = unsafe { s.value.inlined.length };
    if len == 0 {
        return &[];
    }

    let ptr = if len <= INLINE_CAPACITY {
        // SAFETY: short strings live in the inline buffer.
        unsafe { s.value.inlined.inlined.as_ptr() }
    } else {
        // SAFETY: long strings point at DuckDB-owned storage.
        unsafe { s.value.pointer.ptr as *const _ }
    };

    // SAFETY: `ptr` references `len` initialized bytes for this row.
    unsafe { std::slice::from_raw_parts(ptr as *const u8, len as usize) }
}

/// Decode a DuckDB string value into an owned `String`, replacing invalid UTF-8.
///
/// # Safety
///
/// Same contract as [`duckdb_string_bytes`]: callers check row nullability first.
pub unsafe fn decode_duckdb_string(s: &duckdb_string_t) -> String {
    // SAFETY: forwarded caller contract.
    let bytes = unsafe { duckdb_string_bytes(s) };
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libduckdb_sys::{
        duckdb_string_t__bindgen_ty_1, duckdb_string_t__bindgen_ty_1__bindgen_ty_1,
        duckdb_string_t__bindgen_ty_1__bindgen_ty_2,
    };
    use std::os::raw::c_char;

    fn inline_string(bytes: &[u8]) -> duckdb_string_t {
        let mut inlined = [0 as c_char; 12];
        for (dst, src) in inlined.iter_mut().zip(bytes.iter().copied()) {
            *dst = src as c_char;
        }

        duckdb_string_t {
            value: duckdb_string_t__bindgen_ty_1 {
                inlined: duckdb_string_t__bindgen_ty_1__bindgen_ty_2 {
                    length: bytes.len() as u32,
                    inlined,
                },
            },
        }
    }

    fn pointer_string(bytes: &mut [u8]) -> duckdb_string_t {
        let mut prefix = [0 as c_char; 4];
        for (dst, src) in prefix.iter_mut().zip(bytes.iter().copied()) {
            *dst = src as c_char;
        }

        duckdb_string_t {
            value: duckdb_string_t__bindgen_ty_1 {
                pointer: duckdb_string_t__bindgen_ty_1__bindgen_ty_1 {
                    length: bytes.len() as u32,
                    prefix,
                    ptr: bytes.as_mut_ptr() as *mut c_char,
                },
            },
        }
    }

    #[test]
    fn test_decode_inline_clock() {
        let input = inline_string(b"0:15:00");
        // SAFETY: fixture is a valid inline string.
        assert_eq!(unsafe { decode_duckdb_string(&input) }, "0:15:00");
    }

    #[test]
    fn test_decode_empty() {
        let input = inline_string(b"");
        // SAFETY: fixture is a valid inline string.
        assert_eq!(unsafe { decode_duckdb_string(&input) }, "");
    }

    #[test]
    fn test_decode_pointer_pgn() {
        let mut backing = b"1. e4 {[%clk 0:15:00]}".to_vec();
        let input = pointer_string(backing.as_mut_slice());
        // SAFETY: backing storage outlives the decode.
        assert_eq!(
            unsafe { decode_duckdb_string(&input) },
            "1. e4 {[%clk 0:15:00]}"
        );
    }

    #[test]
    fn test_decode_pointer_invalid_utf8_is_lossy() {
        let mut backing = b"[White \"Bob\"] 1. e4".to_vec();
        backing[2] = 0xFF;
        let expected = String::from_utf8_lossy(&backing).into_owned();
        let input = pointer_string(backing.as_mut_slice());
        // SAFETY: backing storage outlives the decode.
        assert_eq!(unsafe { decode_duckdb_string(&input) }, expected);
    }
}
