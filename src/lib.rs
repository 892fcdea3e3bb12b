//! # Analysis Store
//!
//! Local persistence for product compliance analyses, built to be linked into
//! a mobile app and called over FFI. The app captures a product photo, runs
//! an analysis, and hands the resulting record to this library, which keeps
//! every record in a single JSON document in the app's private storage.
//!
//! ## Guarantees
//!
//! - **One record per id**: saving an existing id replaces the stored record
//! - **Newest first**: saves are prepended, listing returns on-disk order
//! - **Crash-safe writes**: the document is replaced via temp file + rename
//! - **Always renderable**: listing never fails; an unreadable document is
//!   logged and reported as empty
//! - **Loud writes**: save and delete failures are always returned to the caller
//!
//! ## Quick Start
//!
//! ```no_run
//! use analysis_store::{create_store, save_analysis, get_analyses, free_response};
//! use std::ffi::CString;
//!
//! let dir = CString::new("/data/user/0/com.example.app/files").unwrap();
//! let store = create_store(dir.as_ptr());
//!
//! let json = CString::new(r#"{"id":"1","date":"2024-02-15","productName":"Protein Shake",
//!     "imageUri":"file://a.jpg","result":"Non-Compliant","status":"Reviewed","compliant":false}"#).unwrap();
//! free_response(save_analysis(store, json.as_ptr()));
//!
//! let all = get_analyses(store);
//! free_response(all);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_store`] - Open the store in a documents directory
//! - [`get_analyses`] - List all analyses, newest first
//! - [`get_analysis`] - Fetch one analysis by id
//! - [`save_analysis`] - Insert or replace an analysis
//! - [`delete_analysis`] - Remove an analysis by id
//! - [`clear_analyses`] - Remove every analysis
//! - [`close_store`] - Release the store handle
//! - [`free_response`] - Release a string returned by this library

pub mod analysis_record;
pub mod analysis_store;
pub mod store_error;
pub mod app_response;

use crate::analysis_record::AnalysisRecord;
use crate::analysis_store::AnalysisStore;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use log::{info, warn};

use crate::app_response::AppResponse;

/// Opens the analysis store inside the given documents directory.
///
/// The directory is created if missing, and `analyses.json` is initialized to
/// an empty array on first use.
///
/// # Parameters
///
/// * `dir` - Null-terminated C string with the app's private documents directory
///
/// # Returns
///
/// A pointer to the [`AnalysisStore`] on success, or null on failure. Release
/// it with [`close_store`].
///
/// # Errors
///
/// Returns null if:
/// - `dir` is null
/// - `dir` is not valid UTF-8
/// - the directory or document cannot be created
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(dir: *const c_char) -> *mut AnalysisStore {
    if dir.is_null() {
        warn!("Null dir pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let dir_str = match unsafe { CStr::from_ptr(dir).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in dir parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match AnalysisStore::init(dir_str) {
        Ok(store) => {
            info!("Analysis store ready at {}", store.path().display());
            Box::into_raw(Box::new(store))
        }
        Err(e) => {
            warn!("Failed to open analysis store in {dir_str}: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Returns every stored analysis as a JSON array, newest first.
///
/// A corrupt or unreadable document yields `Ok("[]")`; the failure is logged.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use analysis_store::{create_store, get_analyses};
///
/// let dir = CString::new("analyses_dir").unwrap();
/// let store = create_store(dir.as_ptr());
/// let all = get_analyses(store);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_analyses(store: *mut AnalysisStore) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => {
            let error = AppResponse::BadRequest("Null store pointer passed to get_analyses".to_string());
            return response_to_c_string(&error);
        }
    };

    let records = store.list();
    match serde_json::to_string(&records) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Returns the analysis with the given id, or `NotFound`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_analysis(store: *mut AnalysisStore, id: *const c_char) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => {
            let error = AppResponse::BadRequest("Null store pointer passed to get_analysis".to_string());
            return response_to_c_string(&error);
        }
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    match store.get(&id_str) {
        Some(record) => match serde_json::to_string(&record) {
            Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
            Err(e) => response_to_c_string(&AppResponse::from(e)),
        },
        None => {
            let error = AppResponse::NotFound(format!("No analysis found with id: {id_str}"));
            response_to_c_string(&error)
        }
    }
}

/// Saves an analysis, replacing any stored analysis with the same id.
///
/// # JSON Format
///
/// ```json
/// {
///   "id": "1708041600000",
///   "date": "2024-02-16",
///   "productName": "Granola",
///   "imageUri": "file://b.jpg",
///   "result": "Compliant",
///   "status": "Completed",
///   "compliant": true,
///   "qualityScore": "8/10"
/// }
/// ```
///
/// `nutritionFacts`, `regulatoryCompliance`, `qualityScore` and
/// `recommendedActions` are optional.
///
/// # Returns
///
/// `Ok` with the saved record, `SerializationError` for malformed JSON,
/// `ValidationError` for an empty id, `StorageError` when the document
/// could not be read or written.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn save_analysis(store: *mut AnalysisStore, json_ptr: *const c_char) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => {
            let error = AppResponse::BadRequest("Null store pointer passed to save_analysis".to_string());
            return response_to_c_string(&error);
        }
    };

    let json_str = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(json) => json,
        Err(error_ptr) => return error_ptr,
    };

    let record: AnalysisRecord = match serde_json::from_str(&json_str) {
        Ok(r) => r,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match store.save(record) {
        Ok(saved) => match serde_json::to_string(&saved) {
            Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
            Err(e) => response_to_c_string(&AppResponse::from(e)),
        },
        Err(e) => {
            warn!("Error saving analysis: {e}");
            response_to_c_string(&AppResponse::from(e))
        }
    }
}

/// Deletes the analysis with the given id.
///
/// Deleting an id that is not stored succeeds.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_analysis(store: *mut AnalysisStore, id: *const c_char) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => {
            let error = AppResponse::BadRequest("Null store pointer passed to delete_analysis".to_string());
            return response_to_c_string(&error);
        }
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    match store.delete(&id_str) {
        Ok(true) => response_to_c_string(&AppResponse::success("Analysis deleted successfully")),
        Ok(false) => response_to_c_string(&AppResponse::success(format!("No analysis with id: {id_str}"))),
        Err(e) => {
            warn!("Error deleting analysis: {e}");
            response_to_c_string(&AppResponse::from(e))
        }
    }
}

/// Removes every stored analysis.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_analyses(store: *mut AnalysisStore) -> *const c_char {
    let store = match unsafe { store.as_ref() } {
        Some(s) => s,
        None => {
            let error = AppResponse::BadRequest("Null store pointer passed to clear_analyses".to_string());
            return response_to_c_string(&error);
        }
    };

    match store.clear() {
        Ok(()) => response_to_c_string(&AppResponse::success("All analyses cleared successfully")),
        Err(e) => response_to_c_string(&AppResponse::from(e)),
    }
}

/// Releases a store handle returned by [`create_store`].
///
/// Passing null is a no-op. The pointer must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(store: *mut AnalysisStore) {
    if store.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(store) });
    info!("Analysis store closed");
}

/// Releases a response string returned by any function of this library.
///
/// Passing null is a no-op.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

/// Serializes `response` to a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a `String`.
///
/// On a null pointer or invalid UTF-8, returns a `BadRequest` response
/// already converted to a C string, ready to hand back to the caller.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
