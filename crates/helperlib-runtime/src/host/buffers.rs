// crates/helperlib-runtime/src/host/buffers.rs
//! Byte buffers, legacy buffer objects and record holders.

use std::ffi::{c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{adopt, free_boxed};
use crate::buffer::{BufferView, DATA_ATTR};
use crate::object::{
    BufferSlots, HostObject, HostRef, HostType, LegacyBufferObject, ObjectKind, host_dec,
};

/// Immutable bytes exporting the current buffer protocol. `exports` counts
/// outstanding views.
#[repr(C)]
pub(super) struct BytesObject {
    head: HostObject,
    exports: AtomicUsize,
    data: Box<[u8]>,
}

impl BytesObject {
    pub(super) fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

static BYTES_TYPE: HostType = HostType {
    name: "bytes",
    kind: ObjectKind::Bytes,
    dealloc: free_boxed::<BytesObject>,
    number_float: None,
    scalar: None,
    get_attr: None,
    buffer: Some(BufferSlots {
        get: bytes_get_buffer,
        release: Some(bytes_release_buffer),
    }),
    legacy_read_buffer: Some(bytes_read_legacy),
};

static LEGACY_BUFFER_TYPE: HostType = HostType {
    name: "buffer",
    kind: ObjectKind::LegacyBuffer,
    dealloc: legacy_dealloc,
    number_float: None,
    scalar: None,
    get_attr: None,
    buffer: None,
    legacy_read_buffer: Some(legacy_read),
};

/// Any object exposing another one as its `data` attribute.
#[repr(C)]
struct RecordHolderObject {
    head: HostObject,
    data: HostRef,
}

static RECORD_HOLDER_TYPE: HostType = HostType {
    name: "holder",
    kind: ObjectKind::RecordHolder,
    dealloc: free_boxed::<RecordHolderObject>,
    number_float: None,
    scalar: None,
    get_attr: Some(holder_get_attr),
    buffer: None,
    legacy_read_buffer: None,
};

unsafe fn bytes_get_buffer(obj: *mut HostObject, view: *mut BufferView) -> c_int {
    let bytes = unsafe { &*obj.cast::<BytesObject>() };
    let view = unsafe { &mut *view };
    view.buf = bytes.data.as_ptr() as *mut c_void;
    view.len = bytes.data.len() as isize;
    view.itemsize = 1;
    view.readonly = 1;
    view.ndim = 1;
    bytes.exports.fetch_add(1, Ordering::AcqRel);
    0
}

unsafe fn bytes_release_buffer(obj: *mut HostObject, _view: *mut BufferView) {
    let bytes = unsafe { &*obj.cast::<BytesObject>() };
    bytes.exports.fetch_sub(1, Ordering::AcqRel);
}

unsafe fn bytes_read_legacy(obj: *mut HostObject, segment: isize, out: *mut *mut c_void) -> isize {
    if segment != 0 {
        return -1;
    }
    let bytes = unsafe { &*obj.cast::<BytesObject>() };
    unsafe { out.write(bytes.data.as_ptr() as *mut c_void) };
    bytes.data.len() as isize
}

/// Only base-less legacy objects can serve as a read buffer themselves.
unsafe fn legacy_read(obj: *mut HostObject, segment: isize, out: *mut *mut c_void) -> isize {
    let legacy = unsafe { &*obj.cast::<LegacyBufferObject>() };
    if segment != 0 || !legacy.base.is_null() || legacy.size < 0 {
        return -1;
    }
    unsafe { out.write(legacy.ptr) };
    legacy.size
}

unsafe fn legacy_dealloc(obj: *mut HostObject) {
    let base = unsafe { (*obj.cast::<LegacyBufferObject>()).base };
    unsafe {
        host_dec(base);
        free_boxed::<LegacyBufferObject>(obj);
    }
}

unsafe fn holder_get_attr(obj: *mut HostObject, name: &str) -> *mut HostObject {
    if name != DATA_ATTR {
        return ptr::null_mut();
    }
    let holder = unsafe { &*obj.cast::<RecordHolderObject>() };
    holder.data.clone().into_raw()
}

pub fn new_bytes(data: &[u8]) -> HostRef {
    adopt(BytesObject {
        head: HostObject::new(&BYTES_TYPE),
        exports: AtomicUsize::new(0),
        data: data.into(),
    })
}

fn as_bytes(obj: &HostRef) -> Option<&BytesObject> {
    (obj.kind() == ObjectKind::Bytes).then(|| unsafe { &*obj.as_ptr().cast::<BytesObject>() })
}

pub(super) fn bytes_slice(obj: &HostRef) -> Option<&[u8]> {
    as_bytes(obj).map(BytesObject::as_slice)
}

/// Start of a bytes object's storage (null for other objects).
pub fn bytes_ptr(obj: &HostRef) -> *mut u8 {
    as_bytes(obj).map_or(ptr::null_mut(), |b| b.data.as_ptr() as *mut u8)
}

/// Outstanding buffer views of a bytes object.
pub fn bytes_exports(obj: &HostRef) -> usize {
    as_bytes(obj).map_or(0, |b| b.exports.load(Ordering::Acquire))
}

/// A legacy buffer object. Without `base` it covers `size` bytes at `ptr`;
/// with one it covers `size` bytes (negative: to the end) at `offset` into
/// the base's read buffer and `ptr` is ignored.
pub fn new_legacy_buffer(
    base: Option<&HostRef>,
    ptr: *mut c_void,
    size: isize,
    offset: isize,
) -> HostRef {
    adopt(LegacyBufferObject {
        head: HostObject::new(&LEGACY_BUFFER_TYPE),
        base: base.map_or(ptr::null_mut(), |b| b.clone().into_raw()),
        ptr,
        size,
        offset,
    })
}

/// An object whose `data` attribute is `data`.
pub fn new_record_holder(data: &HostRef) -> HostRef {
    adopt(RecordHolderObject {
        head: HostObject::new(&RECORD_HOLDER_TYPE),
        data: data.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_follow_get_and_release() {
        let bytes = new_bytes(b"abcd");
        let mut view = BufferView::empty();
        let slots = bytes.ty().buffer.unwrap();
        assert_eq!(unsafe { (slots.get)(bytes.as_ptr(), &mut view) }, 0);
        assert_eq!(view.len, 4);
        assert_eq!(bytes_exports(&bytes), 1);
        unsafe { (slots.release.unwrap())(bytes.as_ptr(), &mut view) };
        assert_eq!(bytes_exports(&bytes), 0);
    }

    #[test]
    fn legacy_object_holds_its_base() {
        let base = new_bytes(b"xyz");
        let legacy = new_legacy_buffer(Some(&base), ptr::null_mut(), -1, 0);
        assert_eq!(base.ref_count(), 2);
        drop(legacy);
        assert_eq!(base.ref_count(), 1);
    }

    #[test]
    fn holder_only_answers_data() {
        let bytes = new_bytes(b"q");
        let holder = new_record_holder(&bytes);
        assert!(unsafe { crate::object::get_attr(holder.as_ptr(), "other") }.is_none());
        let data = unsafe { crate::object::get_attr(holder.as_ptr(), DATA_ATTR) }.unwrap();
        assert_eq!(data.as_ptr(), bytes.as_ptr());
    }
}
