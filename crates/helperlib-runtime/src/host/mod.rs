// crates/helperlib-runtime/src/host/mod.rs
//! In-process reference host.
//!
//! A minimal host object system implementing the helper ABI: numbers, array
//! scalars, byte buffers (current and legacy protocol), descriptors and
//! records. The integration tests and the `helperlib check` command run the
//! helpers against it.

mod buffers;
mod numbers;
mod records;

pub use buffers::{bytes_exports, bytes_ptr, new_bytes, new_legacy_buffer, new_record_holder};
pub use numbers::{
    new_complex, new_complex_scalar_with_struct_descriptor, new_complex_scalar_without_descriptor,
    new_complex64_scalar, new_complex128_scalar, new_float, new_int, new_real_scalar,
    scalar_descriptor,
};
pub use records::{
    ReferenceRuntime, new_scalar_descriptor, new_struct_descriptor, record_bytes, record_field,
};

use crate::alloc_track;
use crate::object::{HostObject, HostRef, install_host_runtime};

static REFERENCE_RUNTIME: ReferenceRuntime = ReferenceRuntime;

/// Install [`ReferenceRuntime`] as the process-wide host runtime. Returns
/// `false` if a runtime was already installed.
pub fn install_reference_runtime() -> bool {
    install_host_runtime(&REFERENCE_RUNTIME)
}

/// Heap-allocate a host object and hand out its first reference.
fn adopt<T>(obj: T) -> HostRef {
    // SAFETY: callers pass `#[repr(C)]` objects headed by a HostObject whose
    // type frees them with `free_boxed::<T>`.
    let obj = unsafe { HostRef::from_box(Box::new(obj)) };
    alloc_track::track_alloc(obj.kind());
    obj
}

/// `dealloc` slot for objects created by [`adopt`].
unsafe fn free_boxed<T>(ptr: *mut HostObject) {
    let kind = unsafe { (*ptr).ty.kind };
    drop(unsafe { Box::from_raw(ptr.cast::<T>()) });
    alloc_track::track_dealloc(kind);
}
