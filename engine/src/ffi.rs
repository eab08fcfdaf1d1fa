//! FFI layer for UI hosts.
//!
//! C-compatible functions around an [`OperationQueue`]. All structured data
//! crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `rowqueue_*` functions are allocated by Rust
//! - Caller must free them with `rowqueue_string_free`
//! - Queue pointers must be freed with `rowqueue_queue_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//!
//! A rejected edit is not an error: it comes back as
//! `{"ok": {"status": "rejected", "reason": "..."}}`.

use crate::{NewOperation, OperationQueue, QueueConfig, RowIdentifiers, TableId, TableSnapshot};
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

fn error_string(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `rowqueue_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => CString::new(r#"{"error":"string contained null bytes"}"#)
            .unwrap_or_default()
            .into_raw(),
    }
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

// ============================================================================
// Queue Lifecycle
// ============================================================================

/// Create a new queue.
///
/// # Arguments
/// - `config_json`: JSON string of QueueConfig, or null for defaults
///
/// # Returns
/// Pointer to OperationQueue, or null if the configuration is invalid.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `rowqueue_queue_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_queue_new(config_json: *const c_char) -> *mut OperationQueue {
    let config = match from_c_string(config_json) {
        Some(s) => match serde_json::from_str::<QueueConfig>(&s) {
            Ok(config) => config,
            Err(_) => return ptr::null_mut(),
        },
        None => QueueConfig::default(),
    };

    if config.validate().is_err() {
        return ptr::null_mut();
    }

    Box::into_raw(Box::new(OperationQueue::new(config)))
}

/// Free a queue.
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rowqueue_queue_free(queue: *mut OperationQueue) {
    if !queue.is_null() {
        drop(Box::from_raw(queue));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `rowqueue_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rowqueue_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Queue Operations
// ============================================================================

/// Resolve and enqueue a requested change.
///
/// # Arguments
/// - `queue`: Queue pointer
/// - `op_json`: JSON string of NewOperation
/// - `now`: Timestamp in milliseconds
///
/// # Returns
/// JSON string: `{"ok": Enqueued}` or `{"error": "message"}`
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - `op_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_enqueue(
    queue: *mut OperationQueue,
    op_json: *const c_char,
    now: u64,
) -> *mut c_char {
    let queue = match queue.as_mut() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    let op_str = match from_c_string(op_json) {
        Some(s) => s,
        None => return error_string("invalid operation JSON"),
    };

    match NewOperation::from_json(&op_str) {
        Ok(op) => to_c_string(FfiResult::ok(queue.enqueue(op, now)).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Get queued operations in enqueue order.
///
/// # Returns
/// JSON string: `{"ok": [Operation, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_operations(queue: *const OperationQueue) -> *mut c_char {
    let queue = match queue.as_ref() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    to_c_string(FfiResult::ok(queue.operations()).to_json())
}

/// Get queued operations count.
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
#[no_mangle]
pub unsafe extern "C" fn rowqueue_pending_count(queue: *const OperationQueue) -> i64 {
    match queue.as_ref() {
        Some(q) => q.len() as i64,
        None => -1,
    }
}

/// Replay the queue onto a freshly fetched table snapshot.
///
/// # Arguments
/// - `snapshot_json`: JSON string of TableSnapshot
///
/// # Returns
/// JSON string: `{"ok": TableSnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - `snapshot_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_replay(
    queue: *const OperationQueue,
    snapshot_json: *const c_char,
) -> *mut c_char {
    let queue = match queue.as_ref() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    let snapshot_str = match from_c_string(snapshot_json) {
        Some(s) => s,
        None => return error_string("invalid snapshot JSON"),
    };

    let snapshot = match TableSnapshot::from_json(&snapshot_str) {
        Ok(s) => s,
        Err(e) => return error_string(e.to_string()),
    };

    let rows = queue.replay(snapshot.table_id, &snapshot.rows);
    to_c_string(FfiResult::ok(TableSnapshot::new(snapshot.table_id, rows)).to_json())
}

/// Remove one operation by id.
///
/// # Returns
/// JSON string: `{"ok": Operation}` or `{"ok": null}` if no such id, or
/// `{"error": "message"}`
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - `id` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_cancel(
    queue: *mut OperationQueue,
    id: *const c_char,
) -> *mut c_char {
    let queue = match queue.as_mut() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    let id_str = match from_c_string(id) {
        Some(s) => s,
        None => return error_string("invalid id"),
    };

    to_c_string(FfiResult::ok(queue.cancel(&id_str)).to_json())
}

/// Undo a row addition together with the edits addressed to its temp id.
///
/// # Returns
/// JSON string: `{"ok": <number of operations removed>}` or
/// `{"error": "message"}`
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - `temp_id` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_undo_add(
    queue: *mut OperationQueue,
    table_id: TableId,
    temp_id: *const c_char,
) -> *mut c_char {
    let queue = match queue.as_mut() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    let temp_id = match from_c_string(temp_id) {
        Some(s) => s,
        None => return error_string("invalid temp id"),
    };

    to_c_string(FfiResult::ok(queue.undo_add(table_id, &temp_id)).to_json())
}

/// Undo a row deletion.
///
/// # Arguments
/// - `identifiers_json`: JSON object of the deleted row's identifiers
///
/// # Returns
/// JSON string: `{"ok": Operation}` or `{"ok": null}` if no delete was
/// queued for that row, or `{"error": "message"}`
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - `identifiers_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_undo_delete(
    queue: *mut OperationQueue,
    table_id: TableId,
    identifiers_json: *const c_char,
) -> *mut c_char {
    let queue = match queue.as_mut() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    let identifiers_str = match from_c_string(identifiers_json) {
        Some(s) => s,
        None => return error_string("invalid identifiers JSON"),
    };

    let identifiers: RowIdentifiers = match serde_json::from_str(&identifiers_str) {
        Ok(ids) => ids,
        Err(e) => return error_string(format!("parse error: {}", e)),
    };

    to_c_string(FfiResult::ok(queue.undo_delete(table_id, &identifiers)).to_json())
}

/// Acknowledge operations as committed.
///
/// # Arguments
/// - `ids_json`: JSON array of operation ids
///
/// # Safety
/// - `queue` must be a valid pointer from `rowqueue_queue_new` or null
/// - `ids_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_acknowledge(
    queue: *mut OperationQueue,
    ids_json: *const c_char,
) -> *mut c_char {
    let queue = match queue.as_mut() {
        Some(q) => q,
        None => return error_string("null queue pointer"),
    };

    let ids_str = match from_c_string(ids_json) {
        Some(s) => s,
        None => return error_string("invalid ids JSON"),
    };

    let ids: Vec<String> = match serde_json::from_str(&ids_str) {
        Ok(ids) => ids,
        Err(e) => return error_string(format!("parse error: {}", e)),
    };

    queue.acknowledge(&ids);
    to_c_string(FfiResult::ok(()).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Compute the canonical key of an operation without queueing it.
///
/// # Returns
/// JSON string: `{"ok": "key"}` or `{"error": "message"}`
///
/// # Safety
/// - `op_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rowqueue_string_free`
#[no_mangle]
pub unsafe extern "C" fn rowqueue_canonical_key(op_json: *const c_char) -> *mut c_char {
    let op_str = match from_c_string(op_json) {
        Some(s) => s,
        None => return error_string("invalid operation JSON"),
    };

    match NewOperation::from_json(&op_str) {
        Ok(op) => to_c_string(FfiResult::ok(op.key()).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn rowqueue_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
