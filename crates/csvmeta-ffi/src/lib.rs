//! C FFI bindings for csvmeta-core
//!
//! This crate provides a C-compatible API so a non-Rust host application can
//! validate and read CSV exchange documents and show the format rules.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Opaque handle to a parsed document
pub struct FfiDocument {
    inner: csvmeta_core::CsvDocument,
}

fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Parse CSV text into a document
///
/// # Safety
/// - `text` must be a valid, NUL-terminated C string or null
/// - Returns null on error; use `csvmeta_parse_error` for the reason
/// - Caller must free the returned handle with `csvmeta_free_document`
#[no_mangle]
pub unsafe extern "C" fn csvmeta_parse(text: *const c_char) -> *mut FfiDocument {
    if text.is_null() {
        return ptr::null_mut();
    }

    let bytes = CStr::from_ptr(text).to_bytes();
    match csvmeta_core::parse_bytes(bytes) {
        Ok(doc) => Box::into_raw(Box::new(FfiDocument { inner: doc })),
        Err(_) => ptr::null_mut(),
    }
}

/// Explain why CSV text fails to parse
///
/// # Safety
/// - `text` must be a valid, NUL-terminated C string or null
/// - Returns null if the text parses successfully
/// - Caller must free the returned string with `csvmeta_free_string`
#[no_mangle]
pub unsafe extern "C" fn csvmeta_parse_error(text: *const c_char) -> *mut c_char {
    if text.is_null() {
        return into_c_string("no text given");
    }

    let bytes = CStr::from_ptr(text).to_bytes();
    match csvmeta_core::parse_bytes(bytes) {
        Ok(_) => ptr::null_mut(),
        Err(e) => into_c_string(&e.to_string()),
    }
}

/// Free a document
///
/// # Safety
/// - `doc` must be a valid pointer returned by `csvmeta_parse` or null
#[no_mangle]
pub unsafe extern "C" fn csvmeta_free_document(doc: *mut FfiDocument) {
    if !doc.is_null() {
        drop(Box::from_raw(doc));
    }
}

/// Get the number of columns of a document
///
/// # Safety
/// - `doc` must be a valid pointer returned by `csvmeta_parse` or null
#[no_mangle]
pub unsafe extern "C" fn csvmeta_document_col_count(doc: *const FfiDocument) -> usize {
    if doc.is_null() {
        return 0;
    }
    (*doc).inner.column_count()
}

/// Get the number of data rows of a document
///
/// # Safety
/// - `doc` must be a valid pointer returned by `csvmeta_parse` or null
#[no_mangle]
pub unsafe extern "C" fn csvmeta_document_row_count(doc: *const FfiDocument) -> usize {
    if doc.is_null() {
        return 0;
    }
    (*doc).inner.row_count()
}

/// Get a header name by column index
///
/// # Safety
/// - `doc` must be a valid pointer returned by `csvmeta_parse` or null
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `csvmeta_free_string`
#[no_mangle]
pub unsafe extern "C" fn csvmeta_document_header(doc: *const FfiDocument, index: usize) -> *mut c_char {
    if doc.is_null() {
        return ptr::null_mut();
    }

    (*doc)
        .inner
        .header()
        .get(index)
        .map(|name| into_c_string(name))
        .unwrap_or(ptr::null_mut())
}

/// Get a cell by data row and column index
///
/// # Safety
/// - `doc` must be a valid pointer returned by `csvmeta_parse` or null
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `csvmeta_free_string`
#[no_mangle]
pub unsafe extern "C" fn csvmeta_document_cell(
    doc: *const FfiDocument,
    row: usize,
    col: usize,
) -> *mut c_char {
    if doc.is_null() {
        return ptr::null_mut();
    }

    (*doc)
        .inner
        .cell(row, col)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Describe the CSV format as a bullet list
///
/// Caller must free the returned string with `csvmeta_free_string`.
#[no_mangle]
pub extern "C" fn csvmeta_format_description() -> *mut c_char {
    into_c_string(&csvmeta_core::format_description())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a csvmeta_* function or null
#[no_mangle]
pub unsafe extern "C" fn csvmeta_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
