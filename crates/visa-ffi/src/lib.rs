//! C FFI bindings for visa-core
//!
//! This crate provides a C-compatible API for driving a catalog session from a
//! foreign UI. Strings cross the boundary as UTF-8 C strings; document lists
//! are newline-separated text; structured results are returned as JSON.

use serde_json::json;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;
use visa_core::{
    export, matching_ids, CanonicalRecord, Dataset, Documents, ExportFormat, ImportMode, NewRecord,
    NormalizerConfig, SourceFile,
};

/// Opaque handle to a catalog session
pub struct FfiDataset {
    inner: Dataset,
    config: NormalizerConfig,
    /// Files rejected by the most recent import, as `{name, kind, message}`
    last_failures: Vec<serde_json::Value>,
}

fn failure_entry(name: &str, kind: &str, message: String) -> serde_json::Value {
    json!({ "name": name, "kind": kind, "message": message })
}

unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        None
    } else {
        CStr::from_ptr(s).to_str().ok()
    }
}

unsafe fn ids_arg<'a>(ids: *const i64, count: usize) -> &'a [i64] {
    if ids.is_null() || count == 0 {
        &[]
    } else {
        slice::from_raw_parts(ids, count)
    }
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Create an empty session
#[no_mangle]
pub extern "C" fn visa_dataset_new() -> *mut FfiDataset {
    Box::into_raw(Box::new(FfiDataset {
        inner: Dataset::new(),
        config: NormalizerConfig::default(),
        last_failures: Vec::new(),
    }))
}

/// Free a session
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new` or null
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_free(dataset: *mut FfiDataset) {
    if !dataset.is_null() {
        drop(Box::from_raw(dataset));
    }
}

/// Import a batch of files held in memory
///
/// Returns the number of records added, or -1 on invalid arguments. Files
/// that cannot be imported are skipped; the rest of the batch still lands.
/// The skipped files are available from `visa_dataset_import_failures`
/// until the next import.
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `names` and `contents` must point to arrays of `count` C strings
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_import(
    dataset: *mut FfiDataset,
    names: *const *const c_char,
    contents: *const *const c_char,
    count: usize,
    replace: bool,
) -> i64 {
    if dataset.is_null() || names.is_null() || contents.is_null() {
        return -1;
    }

    let session = &mut *dataset;
    session.last_failures.clear();

    let mut files = Vec::with_capacity(count);
    for i in 0..count {
        let name_ptr = *names.add(i);
        match (str_arg(name_ptr), str_arg(*contents.add(i))) {
            (Some(name), Some(content)) => files.push(SourceFile::new(name, content)),
            _ => {
                let name = if name_ptr.is_null() {
                    format!("#{}", i)
                } else {
                    CStr::from_ptr(name_ptr).to_string_lossy().into_owned()
                };
                session.last_failures.push(failure_entry(
                    &name,
                    "invalid_argument",
                    "name or content is null or not valid UTF-8".to_string(),
                ));
            }
        }
    }

    let report = session.inner.normalize(&files, &session.config);
    for failure in &report.failures {
        session.last_failures.push(failure_entry(
            &failure.name,
            failure.error.kind(),
            failure.error.to_string(),
        ));
    }

    let mode = if replace {
        ImportMode::Replace
    } else {
        ImportMode::Append
    };
    session.inner.import_batch(report.records, mode) as i64
}

/// Files rejected by the most recent import, as a JSON array
///
/// Each entry has `name`, `kind` (for example `unsupported_file`) and
/// `message`. The caller must free the result with `visa_free_string`.
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_import_failures(dataset: *const FfiDataset) -> *mut c_char {
    if dataset.is_null() {
        return ptr::null_mut();
    }
    serde_json::to_string(&(*dataset).last_failures)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Number of records in the session
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_len(dataset: *const FfiDataset) -> usize {
    if dataset.is_null() {
        return 0;
    }
    (*dataset).inner.len()
}

/// Id of the record at `index`, or -1 when out of bounds
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_record_id(dataset: *const FfiDataset, index: usize) -> i64 {
    if dataset.is_null() {
        return -1;
    }
    (*dataset)
        .inner
        .all()
        .get(index)
        .map(|r| r.id)
        .unwrap_or(-1)
}

/// Add a record from a JSON object of field values; returns its id or -1
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `fields_json` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_add(
    dataset: *mut FfiDataset,
    fields_json: *const c_char,
) -> i64 {
    if dataset.is_null() {
        return -1;
    }
    let fields: NewRecord = match str_arg(fields_json).map(serde_json::from_str) {
        Some(Ok(fields)) => fields,
        _ => return -1,
    };
    (*dataset).inner.add_record(fields)
}

/// Set the fee of one record; false when the id is unknown
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_update_fee(
    dataset: *mut FfiDataset,
    id: i64,
    fee: f64,
) -> bool {
    if dataset.is_null() {
        return false;
    }
    (*dataset).inner.update_fee(id, fee).is_ok()
}

/// Replace the documents of one record from newline-separated text
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `required` and `special` must be valid C strings or null
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_update_documents(
    dataset: *mut FfiDataset,
    id: i64,
    required: *const c_char,
    special: *const c_char,
) -> bool {
    if dataset.is_null() {
        return false;
    }
    let docs = Documents::from_lines(
        str_arg(required).unwrap_or(""),
        str_arg(special).unwrap_or(""),
    );
    (*dataset)
        .inner
        .update_documents(id, docs.required, docs.special)
        .is_ok()
}

/// Set the fee of every selected record
///
/// Returns the number of records updated, or -1 for an empty selection.
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `ids` must point to `count` ids
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_bulk_update_fee(
    dataset: *mut FfiDataset,
    ids: *const i64,
    count: usize,
    fee: f64,
) -> i64 {
    if dataset.is_null() {
        return -1;
    }
    match (*dataset).inner.bulk_update_fee(ids_arg(ids, count), fee) {
        Ok(updated) => updated as i64,
        Err(_) => -1,
    }
}

/// Merge newline-separated documents into every selected record
///
/// Returns the number of records updated, or -1 for an empty selection.
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `ids` must point to `count` ids
/// - `required` and `special` must be valid C strings or null
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_bulk_merge_documents(
    dataset: *mut FfiDataset,
    ids: *const i64,
    count: usize,
    required: *const c_char,
    special: *const c_char,
) -> i64 {
    if dataset.is_null() {
        return -1;
    }
    let docs = Documents::from_lines(
        str_arg(required).unwrap_or(""),
        str_arg(special).unwrap_or(""),
    );
    match (*dataset)
        .inner
        .bulk_merge_documents(ids_arg(ids, count), &docs.required, &docs.special)
    {
        Ok(updated) => updated as i64,
        Err(_) => -1,
    }
}

/// Delete one record; false when it was not there
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_delete(dataset: *mut FfiDataset, id: i64) -> bool {
    if dataset.is_null() {
        return false;
    }
    (*dataset).inner.delete_record(id)
}

/// Delete every selected record
///
/// Returns the number removed, or -1 for an empty selection.
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `ids` must point to `count` ids
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_delete_many(
    dataset: *mut FfiDataset,
    ids: *const i64,
    count: usize,
) -> i64 {
    if dataset.is_null() {
        return -1;
    }
    match (*dataset).inner.delete_records(ids_arg(ids, count)) {
        Ok(removed) => removed as i64,
        Err(_) => -1,
    }
}

/// Ids of records matching a search query, as a JSON array
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `query` must be a valid C string or null (null matches everything)
/// - Caller must free the returned string with `visa_free_string`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_search(
    dataset: *const FfiDataset,
    query: *const c_char,
) -> *mut c_char {
    if dataset.is_null() {
        return ptr::null_mut();
    }
    let ids = matching_ids((*dataset).inner.all(), str_arg(query).unwrap_or(""));
    serde_json::to_string(&ids)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Export records matching `query` as `csv`, `json` or `legacy-json`
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - `format` must be a valid C string; `query` a valid C string or null
/// - Returns null on error
/// - Caller must free the returned string with `visa_free_string`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_export(
    dataset: *const FfiDataset,
    format: *const c_char,
    query: *const c_char,
) -> *mut c_char {
    if dataset.is_null() {
        return ptr::null_mut();
    }
    let format: ExportFormat = match str_arg(format).map(str::parse) {
        Some(Ok(format)) => format,
        _ => return ptr::null_mut(),
    };

    let rows: Vec<&CanonicalRecord> =
        visa_core::filter((*dataset).inner.all(), str_arg(query).unwrap_or(""));
    export(rows, format)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Summary counters as a JSON object
///
/// # Safety
/// - `dataset` must be a valid pointer returned by `visa_dataset_new`
/// - Caller must free the returned string with `visa_free_string`
#[no_mangle]
pub unsafe extern "C" fn visa_dataset_stats(dataset: *const FfiDataset) -> *mut c_char {
    if dataset.is_null() {
        return ptr::null_mut();
    }
    serde_json::to_string(&(*dataset).inner.stats())
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a visa_* function or null
#[no_mangle]
pub unsafe extern "C" fn visa_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
