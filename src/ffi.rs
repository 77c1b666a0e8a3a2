//! FFI bindings for Synheart Rapport
//!
//! This module provides C-compatible functions for calling Rapport from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `rapport_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{
    baseline_to_goals_json, parse_timestamp, parse_window, records_to_comparison_json,
    records_to_health_json, RapportProcessor,
};
use crate::store::InMemoryStore;
use crate::types::InteractionRecord;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Read a required argument, recording an error naming it when invalid
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a computed JSON result to the caller, or record its error
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score one relationship's records and return health JSON.
///
/// # Safety
/// - `records_json` and `now` must be valid null-terminated C strings.
/// - `window` may be NULL (no window) or a null-terminated window name.
/// - Returns a newly allocated string that must be freed with `rapport_free_string`.
/// - Returns NULL on error; call `rapport_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rapport_health_json(
    records_json: *const c_char,
    window: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(records) = required_arg(records_json, "records JSON") else {
        return ptr::null_mut();
    };
    let Some(now) = required_arg(now, "timestamp") else {
        return ptr::null_mut();
    };

    finish(records_to_health_json(records, cstr_to_string(window), now))
}

/// Compare every relationship in one user's records and return report JSON.
///
/// # Safety
/// - `records_json`, `user_id` and `now` must be valid null-terminated C strings.
/// - `window` may be NULL (no window) or a null-terminated window name.
/// - Returns a newly allocated string that must be freed with `rapport_free_string`.
/// - Returns NULL on error; call `rapport_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rapport_compare_json(
    records_json: *const c_char,
    user_id: *const c_char,
    window: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(records) = required_arg(records_json, "records JSON") else {
        return ptr::null_mut();
    };
    let Some(user) = required_arg(user_id, "user_id") else {
        return ptr::null_mut();
    };
    let Some(now) = required_arg(now, "timestamp") else {
        return ptr::null_mut();
    };

    finish(records_to_comparison_json(
        records,
        user,
        cstr_to_string(window),
        now,
    ))
}

/// Derive boundary goals from baseline JSON.
///
/// # Safety
/// - `baseline_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `rapport_free_string`.
/// - Returns NULL on error; call `rapport_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rapport_goals_json(baseline_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(baseline) = required_arg(baseline_json, "baseline JSON") else {
        return ptr::null_mut();
    };

    finish(baseline_to_goals_json(baseline))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a RapportProcessor over an in-memory record store
pub struct RapportProcessorHandle {
    processor: RapportProcessor<InMemoryStore>,
}

/// Create a new processor.
///
/// # Safety
/// - `config_json` may be NULL for default settings, or a null-terminated JSON config.
/// - Returns a pointer that must be freed with `rapport_processor_free`.
/// - Returns NULL on error; call `rapport_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rapport_processor_new(
    config_json: *const c_char,
) -> *mut RapportProcessorHandle {
    clear_last_error();

    let config = match cstr_to_string(config_json) {
        Some(json) => match EngineConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
        None => EngineConfig::default(),
    };

    match RapportProcessor::with_config(InMemoryStore::new(), config) {
        Ok(processor) => Box::into_raw(Box::new(RapportProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rapport_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rapport_processor_free(processor: *mut RapportProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Add a JSON array of interaction records to the processor's store.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rapport_processor_new`.
/// - `records_json` must be a valid null-terminated C string.
/// - Returns the number of records added, or -1 on error.
/// - On error no records are added; call `rapport_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn rapport_processor_add_interactions(
    processor: *mut RapportProcessorHandle,
    records_json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(json) = required_arg(records_json, "records JSON") else {
        return -1;
    };

    let records: Vec<InteractionRecord> = match serde_json::from_str(&json) {
        Ok(records) => records,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };

    if let Some(invalid) = records.iter().find_map(|r| r.validate().err()) {
        set_last_error(&ComputeError::from(invalid).to_string());
        return -1;
    }

    let added = records.len();
    let store = handle.processor.source_mut();
    for record in records {
        if let Err(e) = store.add_interaction(record) {
            set_last_error(&e.to_string());
            return -1;
        }
    }

    i32::try_from(added).unwrap_or(i32::MAX)
}

/// Compute relationship health from the processor's store.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `rapport_processor_new`.
/// - `relationship_id`, `user_id` and `now` must be valid null-terminated C strings.
/// - `window` may be NULL or empty (no window) or a null-terminated window name.
/// - Returns a newly allocated string that must be freed with `rapport_free_string`.
/// - Returns NULL on error; call `rapport_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn rapport_processor_health(
    processor: *mut RapportProcessorHandle,
    relationship_id: *const c_char,
    user_id: *const c_char,
    window: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let Some(relationship) = required_arg(relationship_id, "relationship_id") else {
        return ptr::null_mut();
    };
    let Some(user) = required_arg(user_id, "user_id") else {
        return ptr::null_mut();
    };
    let Some(now) = required_arg(now, "timestamp") else {
        return ptr::null_mut();
    };

    let result = (|| {
        let window = parse_window(cstr_to_string(window).as_deref())?;
        let now = parse_timestamp(&now)?;
        let health = handle
            .processor
            .relationship_health(&relationship, &user, window, now)?;
        serde_json::to_string(&health).map_err(|e| ComputeError::EncodingError(e.to_string()))
    })();

    finish(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Rapport functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Rapport function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn rapport_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Rapport function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn rapport_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Rapport library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn rapport_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
