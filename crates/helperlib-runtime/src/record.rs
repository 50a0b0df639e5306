// crates/helperlib-runtime/src/record.rs
//! Record reconstructor: raw bytes + type descriptor -> fresh host record.

use std::ffi::{c_int, c_void};

use crate::errors::{ReconstructError, set_error};
use crate::object::{HostObject, HostRef, HostRuntime, host_runtime};

/// Rebuild a record from `length` bytes at `data`, interpreted with `dtype`,
/// using the installed host runtime.
///
/// # Safety
/// `data` must be readable for `length` bytes (or null with `length == 0`);
/// `dtype` must be null or a live host object.
pub unsafe fn reconstruct_record(
    data: *const u8,
    length: usize,
    dtype: *mut HostObject,
) -> Result<HostRef, ReconstructError> {
    unsafe { reconstruct_record_with(host_runtime(), data, length, dtype) }
}

/// [`reconstruct_record`] against an explicit runtime.
///
/// The bytes are copied into storage owned by the returned value. The record
/// kind, combined descriptor and intermediate array are released before
/// returning; only the record itself escapes.
///
/// # Safety
/// Same as [`reconstruct_record`].
pub unsafe fn reconstruct_record_with(
    runtime: Option<&dyn HostRuntime>,
    data: *const u8,
    length: usize,
    dtype: *mut HostObject,
) -> Result<HostRef, ReconstructError> {
    let runtime = runtime.ok_or(ReconstructError::RuntimeUnavailable)?;
    let kind = runtime.record_kind().ok_or(ReconstructError::RuntimeUnavailable)?;
    let dtype = unsafe { HostRef::from_borrowed(dtype) }.ok_or(ReconstructError::BadDescriptor)?;
    let descr = runtime
        .combine_descriptor(&kind, &dtype)
        .ok_or(ReconstructError::BadDescriptor)?;

    let bytes = if length == 0 {
        &[][..]
    } else if data.is_null() {
        return Err(ReconstructError::CopyFailed);
    } else {
        unsafe { std::slice::from_raw_parts(data, length) }
    };
    let array = runtime
        .array_from_bytes(bytes, descr)
        .ok_or(ReconstructError::CopyFailed)?;
    let record = runtime.item(&array, 0).ok_or(ReconstructError::CopyFailed)?;
    tracing::trace!(length, record = record.ty().name, "record reconstructed");
    Ok(record)
}

/// C entry point: rebuild a record and return a new reference to it, or null
/// with the pending error set.
///
/// # Safety
/// `pdata` must be readable for `size` bytes; `dtype` must be null or a live
/// host object.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn helperlib_recreate_record(
    pdata: *const c_void,
    size: c_int,
    dtype: *mut HostObject,
) -> *mut HostObject {
    let result = match usize::try_from(size) {
        Ok(length) => unsafe { reconstruct_record(pdata.cast(), length, dtype) },
        Err(_) => Err(ReconstructError::CopyFailed),
    };
    match result {
        Ok(record) => record.into_raw(),
        Err(err) => {
            set_error(err);
            std::ptr::null_mut()
        }
    }
}
