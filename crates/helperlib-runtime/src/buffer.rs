// crates/helperlib-runtime/src/buffer.rs
//! Buffer extractor: raw address + length of an object's `data` buffer.
//!
//! Two acquisition strategies sit behind [`BufferStrategy`]:
//!
//! - [`CurrentProtocol`]: the owner's `get_buffer` slot fills a
//!   [`BufferView`] and takes an export lock.
//! - [`LegacyProtocol`]: compatibility shim for hosts that still hand out
//!   legacy buffer objects. Removable once no supported host does.
//!
//! A successful acquisition is a [`BufferGuard`]; dropping it (or calling
//! [`release_buffer`] on a view handed to C) releases the lock and the
//! reference to the owner exactly once.

use std::ffi::{c_int, c_void};
use std::ptr;

use crate::errors::{ExtractError, set_error};
use crate::object::{HostObject, HostRef, LegacyBufferObject, ObjectKind, get_attr, host_dec};

/// Attribute holding the buffer-bearing sub-object.
pub const DATA_ATTR: &str = "data";

/// The host's buffer descriptor. Generated code allocates
/// [`BUFFER_VIEW_SIZE`] bytes for it and passes it to the extract helper.
#[repr(C)]
#[derive(Debug)]
pub struct BufferView {
    pub buf: *mut c_void,
    /// Owner whose reference and export lock this view holds; null once
    /// released.
    pub obj: *mut HostObject,
    pub len: isize,
    pub itemsize: isize,
    pub readonly: c_int,
    pub ndim: c_int,
    /// Reserved for the exporter. Views produced by the legacy strategy point
    /// it at an internal marker so release skips the owner's release slot.
    pub internal: *mut c_void,
}

pub const BUFFER_VIEW_SIZE: usize = size_of::<BufferView>();

impl BufferView {
    pub const fn empty() -> Self {
        Self {
            buf: ptr::null_mut(),
            obj: ptr::null_mut(),
            len: 0,
            itemsize: 1,
            readonly: 0,
            ndim: 1,
            internal: ptr::null_mut(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.obj.is_null()
    }

    fn is_legacy(&self) -> bool {
        self.internal == legacy_marker()
    }
}

impl Default for BufferView {
    fn default() -> Self {
        Self::empty()
    }
}

static LEGACY_MARKER: u8 = 0;

fn legacy_marker() -> *mut c_void {
    &LEGACY_MARKER as *const u8 as *mut c_void
}

/// One way of obtaining a raw buffer from the `data` sub-object.
pub trait BufferStrategy {
    fn name(&self) -> &'static str;

    /// Fill a view for `obj`. On success the returned view owns a new
    /// reference to `obj` in `view.obj` and `view.buf` is non-null; on
    /// failure nothing is held.
    ///
    /// # Safety
    /// `obj` must be a live host object.
    unsafe fn acquire(&self, obj: &HostRef) -> Result<BufferView, ExtractError>;
}

pub struct CurrentProtocol;

impl BufferStrategy for CurrentProtocol {
    fn name(&self) -> &'static str {
        "current"
    }

    unsafe fn acquire(&self, obj: &HostRef) -> Result<BufferView, ExtractError> {
        let slots = obj.ty().buffer.ok_or(ExtractError::NoBufferProtocol)?;
        let mut view = BufferView::empty();
        if unsafe { (slots.get)(obj.as_ptr(), &mut view) } != 0 {
            return Err(ExtractError::NoBufferProtocol);
        }
        if view.len < 0 || view.buf.is_null() {
            // The exporter took a lock before reporting an unusable view; give it back.
            if let Some(release) = slots.release {
                unsafe { release(obj.as_ptr(), &mut view) };
            }
            return Err(ExtractError::NoBufferProtocol);
        }
        view.obj = obj.clone().into_raw();
        Ok(view)
    }
}

/// Legacy buffer objects. Only one level of base nesting is supported: a
/// base that is itself a based legacy buffer object is rejected.
pub struct LegacyProtocol;

impl BufferStrategy for LegacyProtocol {
    fn name(&self) -> &'static str {
        "legacy"
    }

    unsafe fn acquire(&self, obj: &HostRef) -> Result<BufferView, ExtractError> {
        if obj.kind() != ObjectKind::LegacyBuffer {
            return Err(ExtractError::NoBufferProtocol);
        }
        // SAFETY: kind LegacyBuffer guarantees the LegacyBufferObject layout.
        let legacy = unsafe { &*(obj.as_ptr() as *const LegacyBufferObject) };

        let (buf, len) = if legacy.base.is_null() {
            if legacy.size < 0 || legacy.ptr.is_null() {
                return Err(ExtractError::NoBufferProtocol);
            }
            (legacy.ptr, legacy.size)
        } else {
            let base = unsafe { &*legacy.base };
            if base.ty.kind == ObjectKind::LegacyBuffer {
                let nested = unsafe { &*(legacy.base as *const LegacyBufferObject) };
                if !nested.base.is_null() {
                    tracing::debug!("legacy buffer nested more than one level deep");
                    return Err(ExtractError::NoBufferProtocol);
                }
            }
            let read = base.ty.legacy_read_buffer.ok_or(ExtractError::NoBufferProtocol)?;
            let mut base_ptr: *mut c_void = ptr::null_mut();
            let available = unsafe { read(legacy.base, 0, &mut base_ptr) };
            if available <= 0
                || base_ptr.is_null()
                || legacy.offset < 0
                || legacy.offset > available
            {
                return Err(ExtractError::NoBufferProtocol);
            }
            let past_offset = available - legacy.offset;
            let len = if legacy.size < 0 {
                past_offset
            } else {
                legacy.size.min(past_offset)
            };
            let buf = unsafe { base_ptr.cast::<u8>().offset(legacy.offset) }.cast::<c_void>();
            (buf, len)
        };

        Ok(BufferView {
            buf,
            obj: obj.clone().into_raw(),
            len,
            itemsize: 1,
            readonly: 1,
            ndim: 1,
            internal: legacy_marker(),
        })
    }
}

/// Default strategy order: current protocol, then the legacy fallback.
pub const DEFAULT_STRATEGIES: &[&dyn BufferStrategy] = &[&CurrentProtocol, &LegacyProtocol];

/// An acquired buffer. Releases the view when dropped.
#[derive(Debug)]
pub struct BufferGuard {
    view: BufferView,
}

impl BufferGuard {
    pub fn as_ptr(&self) -> *mut c_void {
        self.view.buf
    }

    pub fn len(&self) -> usize {
        self.view.len as usize
    }

    /// The object whose buffer is held.
    pub fn owner(&self) -> *mut HostObject {
        self.view.obj
    }

    pub fn view(&self) -> &BufferView {
        &self.view
    }

    /// The buffer contents.
    ///
    /// # Safety
    /// The exporter must not mutate the buffer while the slice is alive.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        if self.view.len == 0 || self.view.buf.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.view.buf.cast::<u8>(), self.len()) }
    }

    /// Hand the still-locked view to a caller that will release it with
    /// [`release_buffer`].
    pub fn into_view(self) -> BufferView {
        let view = unsafe { ptr::read(&self.view) };
        std::mem::forget(self);
        view
    }
}

impl Drop for BufferGuard {
    fn drop(&mut self) {
        unsafe { release_buffer(&mut self.view) };
    }
}

/// Extract the buffer behind `obj.data` with the default strategies.
///
/// # Safety
/// `obj` must be null or point to a live host object.
pub unsafe fn extract_buffer(obj: *mut HostObject) -> Result<BufferGuard, ExtractError> {
    unsafe { extract_buffer_with(obj, DEFAULT_STRATEGIES) }
}

/// Extract the buffer behind `obj.data`, trying `strategies` in order.
///
/// # Safety
/// `obj` must be null or point to a live host object.
pub unsafe fn extract_buffer_with(
    obj: *mut HostObject,
    strategies: &[&dyn BufferStrategy],
) -> Result<BufferGuard, ExtractError> {
    // Released when this function returns, whichever way.
    let data = unsafe { get_attr(obj, DATA_ATTR) }.ok_or(ExtractError::NoDataAttribute)?;
    for strategy in strategies {
        match unsafe { strategy.acquire(&data) } {
            Ok(view) => {
                tracing::trace!(strategy = strategy.name(), len = view.len, "buffer acquired");
                return Ok(BufferGuard { view });
            }
            Err(err) => {
                tracing::trace!(strategy = strategy.name(), %err, "buffer strategy failed");
            }
        }
    }
    Err(ExtractError::NoBufferProtocol)
}

/// Release a view: drop the owner's export lock and the view's reference.
/// A released view has a null `obj`, so releasing it again does nothing.
///
/// # Safety
/// `view` must be null, released, or a view filled by this module.
pub unsafe fn release_buffer(view: *mut BufferView) {
    if view.is_null() {
        return;
    }
    let view = unsafe { &mut *view };
    let owner = std::mem::replace(&mut view.obj, ptr::null_mut());
    if owner.is_null() {
        return;
    }
    if !view.is_legacy()
        && let Some(release) = unsafe { (*owner).ty.buffer }.and_then(|slots| slots.release)
    {
        unsafe { release(owner, view) };
    }
    unsafe { host_dec(owner) };
}

/// C entry point: fill `*pbuf` with the buffer behind `recordobj.data` and
/// return its address. Returns null and sets the pending error on failure,
/// leaving `*pbuf` untouched. The caller must pass the filled view to
/// [`helperlib_release_record_buffer`].
///
/// Null always means failure: an exporter that reports a null address is
/// rejected even for a zero-length buffer, so a successful call never
/// returns null.
///
/// # Safety
/// `recordobj` must be null or a live host object; `pbuf` must be valid for
/// writes of a `BufferView`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn helperlib_extract_record_data(
    recordobj: *mut HostObject,
    pbuf: *mut BufferView,
) -> *mut c_void {
    match unsafe { extract_buffer(recordobj) } {
        Ok(guard) => {
            let view = guard.into_view();
            let buf = view.buf;
            unsafe { pbuf.write(view) };
            buf
        }
        Err(err) => {
            set_error(err);
            ptr::null_mut()
        }
    }
}

/// C entry point: release a view filled by [`helperlib_extract_record_data`].
///
/// # Safety
/// See [`release_buffer`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn helperlib_release_record_buffer(pbuf: *mut BufferView) {
    unsafe { release_buffer(pbuf) };
}
