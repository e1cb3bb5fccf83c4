//! C ABI for embedding the predictor. Handles are opaque pointers owned by
//! the caller and released with the matching destroy function. Every entry
//! point is null-safe and converts internal failures (panics included)
//! into status codes; nothing unwinds across the boundary.

use crate::graph::{Graph, GraphDef};
use crate::train::Trainer;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr;

/// Opaque handle around a loaded [Trainer] (graph + config collaborators).
pub struct CoreHandle {
    trainer: Trainer,
}

/// Opaque handle around a bare [Graph], built from a JSON string. Exposes
/// forward/backward directly for embedding tests.
pub struct GraphHandle {
    graph: Graph,
}

unsafe fn cstr<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        None
    } else {
        CStr::from_ptr(ptr).to_str().ok()
    }
}

/// Load a core from a config file and an optional weights checkpoint
/// (null or empty path = none). Returns null on any failure.
///
/// # Safety
/// `config_path` must be a valid NUL-terminated string; `weights_path`
/// may be null.
#[no_mangle]
pub unsafe extern "C" fn graph_core_create(
    config_path: *const c_char,
    weights_path: *const c_char,
) -> *mut CoreHandle {
    catch_unwind(AssertUnwindSafe(|| {
        let config = match cstr(config_path) {
            Some(s) => s,
            None => return ptr::null_mut(),
        };
        let weights = cstr(weights_path).filter(|s| !s.is_empty());
        match Trainer::from_config_path(config, weights.map(Path::new)) {
            Ok(trainer) => Box::into_raw(Box::new(CoreHandle { trainer })),
            Err(_) => ptr::null_mut(),
        }
    }))
    .unwrap_or(ptr::null_mut())
}

/// Release a core handle. Null is a no-op.
///
/// # Safety
/// `handle` must be null or a pointer returned by [graph_core_create].
#[no_mangle]
pub unsafe extern "C" fn graph_core_destroy(handle: *mut CoreHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Declared input element count; 0 on a bad handle.
///
/// # Safety
/// `handle` must be null or a valid core handle.
#[no_mangle]
pub unsafe extern "C" fn graph_core_input_size(handle: *mut CoreHandle) -> usize {
    if handle.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| {
        (*handle).trainer.input_size().unwrap_or(0)
    }))
    .unwrap_or(0)
}

/// Declared output element count; 0 on a bad handle.
///
/// # Safety
/// `handle` must be null or a valid core handle.
#[no_mangle]
pub unsafe extern "C" fn graph_core_output_size(handle: *mut CoreHandle) -> usize {
    if handle.is_null() {
        return 0;
    }
    catch_unwind(AssertUnwindSafe(|| (*handle).trainer.output_size())).unwrap_or(0)
}

/// Forward one input and copy the output into `out`. Status: 0 ok, 1 null
/// argument, 2 wrong input length, 3 wrong output length, 4 internal size
/// mismatch, 5 runtime failure.
///
/// # Safety
/// `x` must point to `x_len` floats and `out` to `out_len` writable floats.
#[no_mangle]
pub unsafe extern "C" fn graph_core_predict(
    handle: *mut CoreHandle,
    x: *const f32,
    x_len: usize,
    out: *mut f32,
    out_len: usize,
) -> c_int {
    if handle.is_null() || x.is_null() || out.is_null() {
        return 1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let trainer = &mut (*handle).trainer;
        if trainer.input_size().unwrap_or(0) != x_len {
            return 2;
        }
        if trainer.output_size() != out_len {
            return 3;
        }
        let input = std::slice::from_raw_parts(x, x_len);
        let output = match trainer.predict(input) {
            Ok(o) => o,
            Err(_) => return 5,
        };
        if output.len() != out_len {
            return 4;
        }
        std::slice::from_raw_parts_mut(out, out_len).copy_from_slice(&output);
        0
    }))
    .unwrap_or(5)
}

/// Forward one input and write the argmax of the output into `out_label`.
/// Status: 0 ok, 1 null argument, 2 wrong input length, 3 runtime failure.
///
/// # Safety
/// `x` must point to `x_len` floats; `out_label` must be writable.
#[no_mangle]
pub unsafe extern "C" fn graph_core_predict_label(
    handle: *mut CoreHandle,
    x: *const f32,
    x_len: usize,
    out_label: *mut c_int,
) -> c_int {
    if handle.is_null() || x.is_null() || out_label.is_null() {
        return 1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let trainer = &mut (*handle).trainer;
        if trainer.input_size().unwrap_or(0) != x_len {
            return 2;
        }
        let input = std::slice::from_raw_parts(x, x_len);
        match trainer.predict_label(input) {
            Ok(label) => {
                *out_label = label as c_int;
                0
            }
            Err(_) => 3,
        }
    }))
    .unwrap_or(3)
}

/// Build a bare graph from a JSON definition string. Returns null on any
/// failure.
///
/// # Safety
/// `json` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn graph_core_graph_from_json(json: *const c_char) -> *mut GraphHandle {
    catch_unwind(AssertUnwindSafe(|| {
        let text = match cstr(json) {
            Some(s) => s,
            None => return ptr::null_mut(),
        };
        let def: GraphDef = match serde_json::from_str(text) {
            Ok(d) => d,
            Err(_) => return ptr::null_mut(),
        };
        match Graph::from_def(def, None) {
            Ok(graph) => Box::into_raw(Box::new(GraphHandle { graph })),
            Err(_) => ptr::null_mut(),
        }
    }))
    .unwrap_or(ptr::null_mut())
}

/// Release a graph handle. Null is a no-op.
///
/// # Safety
/// `handle` must be null or a pointer from [graph_core_graph_from_json].
#[no_mangle]
pub unsafe extern "C" fn graph_core_graph_destroy(handle: *mut GraphHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Run one forward pass. Status: 0 ok, 1 null handle, 2 failure.
///
/// # Safety
/// `handle` must be null or a valid graph handle.
#[no_mangle]
pub unsafe extern "C" fn graph_core_graph_forward(handle: *mut GraphHandle) -> c_int {
    if handle.is_null() {
        return 1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        match (*handle).graph.forward() {
            Ok(()) => 0,
            Err(_) => 2,
        }
    }))
    .unwrap_or(2)
}

/// Run one backward pass. Status: 0 ok, 1 null handle, 2 failure.
///
/// # Safety
/// `handle` must be null or a valid graph handle.
#[no_mangle]
pub unsafe extern "C" fn graph_core_graph_backward(handle: *mut GraphHandle) -> c_int {
    if handle.is_null() {
        return 1;
    }
    catch_unwind(AssertUnwindSafe(|| {
        match (*handle).graph.backward() {
            Ok(()) => 0,
            Err(_) => 2,
        }
    }))
    .unwrap_or(2)
}
