// crates/helperlib-runtime/src/object.rs
//! Host object ABI.
//!
//! Every host value starts with a [`HostObject`] header: an atomic reference
//! count and a pointer to its [`HostType`]. The type is a table of optional
//! slots; helpers never look at a concrete object layout except for the few
//! `#[repr(C)]` layouts declared here (complex, float, legacy buffer), which
//! the host must honour.
//!
//! Module-level host services that are not tied to an object (resolving the
//! record kind, building descriptors, materialising arrays) go through the
//! [`HostRuntime`] trait, installed once per process.

use std::ffi::{c_int, c_void};
use std::fmt;
use std::ptr::NonNull;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::buffer::BufferView;
use crate::complex::NativeComplex;

/// Sentinel refcount for static/pinned objects; `host_inc`/`host_dec` are no-ops.
pub const RC_PINNED: u32 = u32::MAX;

/// Concrete representation tag of a host type.
///
/// Only `Complex`, `Float` and `LegacyBuffer` carry a layout the helpers
/// read directly; the rest are informational (allocation tracking, logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ObjectKind {
    Complex = 1,
    Float = 2,
    Int = 3,
    ArrayScalar = 4,
    Descriptor = 5,
    Bytes = 6,
    LegacyBuffer = 7,
    RecordHolder = 8,
    RecordArray = 9,
    Record = 10,
    RecordKind = 11,
    Other = 12,
}

impl ObjectKind {
    pub const ALL: &'static [ObjectKind] = &[
        ObjectKind::Complex,
        ObjectKind::Float,
        ObjectKind::Int,
        ObjectKind::ArrayScalar,
        ObjectKind::Descriptor,
        ObjectKind::Bytes,
        ObjectKind::LegacyBuffer,
        ObjectKind::RecordHolder,
        ObjectKind::RecordArray,
        ObjectKind::Record,
        ObjectKind::RecordKind,
        ObjectKind::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Complex => "complex",
            ObjectKind::Float => "float",
            ObjectKind::Int => "int",
            ObjectKind::ArrayScalar => "array-scalar",
            ObjectKind::Descriptor => "descriptor",
            ObjectKind::Bytes => "bytes",
            ObjectKind::LegacyBuffer => "legacy-buffer",
            ObjectKind::RecordHolder => "record-holder",
            ObjectKind::RecordArray => "record-array",
            ObjectKind::Record => "record",
            ObjectKind::RecordKind => "record-kind",
            ObjectKind::Other => "other",
        }
    }
}

/// Returns a new reference, or null when the operation is not possible.
pub type NewRefFn = unsafe fn(*mut HostObject) -> *mut HostObject;

/// Slots of an array scalar (a single element boxed by the array library).
#[derive(Debug, Clone, Copy)]
pub struct ScalarSlots {
    /// Whether the scalar belongs to the complex-floating family.
    pub complex: bool,
    /// New reference to the scalar's element descriptor, or null.
    pub descr: NewRefFn,
    /// Pointer to the scalar's raw storage, laid out as its descriptor says.
    pub data: unsafe fn(*mut HostObject) -> *const u8,
}

/// Current buffer protocol.
#[derive(Debug, Clone, Copy)]
pub struct BufferSlots {
    /// Fill `view.buf`/`view.len` (and optionally the other fields) and take
    /// an export lock. Returns 0 on success, -1 on failure. The helper sets
    /// `view.obj` itself.
    pub get: unsafe fn(*mut HostObject, *mut BufferView) -> c_int,
    /// Drop the export lock taken by `get`.
    pub release: Option<unsafe fn(*mut HostObject, *mut BufferView)>,
}

/// Legacy read-buffer capability: returns the segment size (<= 0 on failure)
/// and stores the segment start in the out pointer.
pub type LegacyReadFn = unsafe fn(*mut HostObject, isize, *mut *mut c_void) -> isize;

/// Type object of a host value.
pub struct HostType {
    pub name: &'static str,
    pub kind: ObjectKind,
    /// Frees the object once its refcount reaches zero.
    pub dealloc: unsafe fn(*mut HostObject),
    /// Generic numeric coercion: new reference to a `Float` object, or null.
    pub number_float: Option<NewRefFn>,
    pub scalar: Option<ScalarSlots>,
    /// Attribute lookup by name: new reference, or null when absent.
    pub get_attr: Option<unsafe fn(*mut HostObject, &str) -> *mut HostObject>,
    pub buffer: Option<BufferSlots>,
    pub legacy_read_buffer: Option<LegacyReadFn>,
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("number_float", &self.number_float.is_some())
            .field("scalar", &self.scalar.is_some())
            .field("get_attr", &self.get_attr.is_some())
            .field("buffer", &self.buffer.is_some())
            .field("legacy_read_buffer", &self.legacy_read_buffer.is_some())
            .finish()
    }
}

/// Common header of every host value.
#[repr(C)]
pub struct HostObject {
    pub ref_count: AtomicU32,
    pub ty: &'static HostType,
}

impl HostObject {
    pub const fn new(ty: &'static HostType) -> Self {
        Self {
            ref_count: AtomicU32::new(1),
            ty,
        }
    }

    /// Header for an immortal object (statics, singletons).
    pub const fn pinned(ty: &'static HostType) -> Self {
        Self {
            ref_count: AtomicU32::new(RC_PINNED),
            ty,
        }
    }
}

/// Layout of the host's native complex scalar.
#[repr(C)]
pub struct ComplexObject {
    pub head: HostObject,
    pub value: NativeComplex,
}

/// Layout of the host's float object, the result of numeric coercion.
#[repr(C)]
pub struct FloatObject {
    pub head: HostObject,
    pub value: f64,
}

/// Layout of a legacy buffer object: a window of `size` bytes either at
/// `ptr` (no base) or at `offset` into `base`'s read buffer.
#[repr(C)]
pub struct LegacyBufferObject {
    pub head: HostObject,
    pub base: *mut HostObject,
    pub ptr: *mut c_void,
    /// Negative means "to the end of the base buffer".
    pub size: isize,
    pub offset: isize,
}

/// Increment the reference count of a host object.
///
/// # Safety
/// `ptr` must be null or point to a live object starting with a `HostObject`.
pub unsafe fn host_inc(ptr: *mut HostObject) {
    if ptr.is_null() {
        return;
    }
    let header = unsafe { &*ptr };
    if header.ref_count.load(Ordering::Relaxed) == RC_PINNED {
        return;
    }
    header.ref_count.fetch_add(1, Ordering::Relaxed);
}

/// Decrement the reference count of a host object, deallocating it through
/// its type's `dealloc` slot when the count reaches zero.
///
/// # Safety
/// `ptr` must be null or point to a live object starting with a `HostObject`,
/// and the caller must own the reference being released.
pub unsafe fn host_dec(ptr: *mut HostObject) {
    if ptr.is_null() {
        return;
    }
    let header = unsafe { &*ptr };
    if header.ref_count.load(Ordering::Relaxed) == RC_PINNED {
        return;
    }
    if header.ref_count.fetch_sub(1, Ordering::AcqRel) == 1 {
        let dealloc = header.ty.dealloc;
        unsafe { dealloc(ptr) };
    }
}

/// Owned strong reference to a host object. Dropping it releases the
/// reference exactly once.
pub struct HostRef(NonNull<HostObject>);

// SAFETY: the refcount is atomic and host objects are immutable apart from
// their atomic counters, so references may move and be shared across threads.
unsafe impl Send for HostRef {}
unsafe impl Sync for HostRef {}

impl HostRef {
    /// Take ownership of a new reference. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or a reference the caller owns.
    pub unsafe fn from_new(ptr: *mut HostObject) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Take a new reference to a borrowed object. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live host object.
    pub unsafe fn from_borrowed(ptr: *mut HostObject) -> Option<Self> {
        let ptr = NonNull::new(ptr)?;
        unsafe { host_inc(ptr.as_ptr()) };
        Some(Self(ptr))
    }

    /// Move a freshly built object to the heap and own its first reference.
    ///
    /// # Safety
    /// `T` must be `#[repr(C)]` with a `HostObject` as its first field, and
    /// its type's `dealloc` slot must free it as a `Box<T>`.
    pub unsafe fn from_box<T>(obj: Box<T>) -> Self {
        Self(NonNull::from(Box::leak(obj)).cast())
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut HostObject {
        self.0.as_ptr()
    }

    #[inline]
    pub fn ty(&self) -> &'static HostType {
        // SAFETY: a HostRef keeps its object alive.
        unsafe { self.0.as_ref().ty }
    }

    #[inline]
    pub fn kind(&self) -> ObjectKind {
        self.ty().kind
    }

    pub fn ref_count(&self) -> u32 {
        // SAFETY: a HostRef keeps its object alive.
        unsafe { self.0.as_ref().ref_count.load(Ordering::Acquire) }
    }

    /// Hand the reference to the caller without releasing it.
    pub fn into_raw(self) -> *mut HostObject {
        let ptr = self.0.as_ptr();
        std::mem::forget(self);
        ptr
    }
}

impl Clone for HostRef {
    fn clone(&self) -> Self {
        unsafe { host_inc(self.0.as_ptr()) };
        Self(self.0)
    }
}

impl Drop for HostRef {
    fn drop(&mut self) {
        unsafe { host_dec(self.0.as_ptr()) };
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRef")
            .field("ptr", &self.0)
            .field("type", &self.ty().name)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Look up an attribute by name.
///
/// # Safety
/// `obj` must be null or point to a live host object.
pub unsafe fn get_attr(obj: *mut HostObject, name: &str) -> Option<HostRef> {
    if obj.is_null() {
        return None;
    }
    let lookup = unsafe { (*obj).ty.get_attr }?;
    unsafe { HostRef::from_new(lookup(obj, name)) }
}

/// Module-level services of the host runtime.
///
/// Every method returns an owned reference (or `None` on failure); the
/// helpers release whatever they do not hand back to the host.
pub trait HostRuntime: Send + Sync {
    /// The host's record scalar kind.
    fn record_kind(&self) -> Option<HostRef>;

    /// Descriptor combining the record kind with a structured `dtype`.
    fn combine_descriptor(&self, kind: &HostRef, dtype: &HostRef) -> Option<HostRef>;

    /// One-element array of `descr` whose storage is a copy of `bytes`.
    fn array_from_bytes(&self, bytes: &[u8], descr: HostRef) -> Option<HostRef>;

    /// Element `index` of `seq` as an independent value.
    fn item(&self, seq: &HostRef, index: usize) -> Option<HostRef>;
}

static HOST_RUNTIME: OnceLock<&'static dyn HostRuntime> = OnceLock::new();

/// Install the process-wide host runtime. Returns `false` if one was
/// already installed (the first one stays).
pub fn install_host_runtime(runtime: &'static dyn HostRuntime) -> bool {
    let installed = HOST_RUNTIME.set(runtime).is_ok();
    if installed {
        tracing::debug!("host runtime installed");
    }
    installed
}

pub fn host_runtime() -> Option<&'static dyn HostRuntime> {
    HOST_RUNTIME.get().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    static FREED: AtomicUsize = AtomicUsize::new(0);

    unsafe fn counting_dealloc(ptr: *mut HostObject) {
        FREED.fetch_add(1, Ordering::SeqCst);
        drop(unsafe { Box::from_raw(ptr) });
    }

    static PLAIN_TYPE: HostType = HostType {
        name: "plain",
        kind: ObjectKind::Other,
        dealloc: counting_dealloc,
        number_float: None,
        scalar: None,
        get_attr: None,
        buffer: None,
        legacy_read_buffer: None,
    };

    static PINNED: HostObject = HostObject::pinned(&PLAIN_TYPE);

    #[test]
    fn host_ref_releases_on_drop() {
        let before = FREED.load(Ordering::SeqCst);
        let raw = Box::into_raw(Box::new(HostObject::new(&PLAIN_TYPE)));
        let owned = unsafe { HostRef::from_new(raw) }.unwrap();
        let second = owned.clone();
        assert_eq!(owned.ref_count(), 2);
        drop(second);
        assert_eq!(owned.ref_count(), 1);
        drop(owned);
        assert_eq!(FREED.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn into_raw_transfers_ownership() {
        let raw = Box::into_raw(Box::new(HostObject::new(&PLAIN_TYPE)));
        let owned = unsafe { HostRef::from_new(raw) }.unwrap();
        let back = owned.into_raw();
        assert_eq!(back, raw);
        assert_eq!(unsafe { (*raw).ref_count.load(Ordering::SeqCst) }, 1);
        unsafe { host_dec(back) };
    }

    #[test]
    fn pinned_objects_ignore_refcounting() {
        let ptr = &PINNED as *const HostObject as *mut HostObject;
        unsafe {
            host_inc(ptr);
            host_dec(ptr);
            host_dec(ptr);
        }
        assert_eq!(PINNED.ref_count.load(Ordering::SeqCst), RC_PINNED);
    }

    #[test]
    fn null_pointers_are_ignored() {
        unsafe {
            host_inc(std::ptr::null_mut());
            host_dec(std::ptr::null_mut());
            assert!(HostRef::from_new(std::ptr::null_mut()).is_none());
            assert!(HostRef::from_borrowed(std::ptr::null_mut()).is_none());
            assert!(get_attr(std::ptr::null_mut(), "data").is_none());
        }
    }

    #[test]
    fn get_attr_without_slot_is_none() {
        let ptr = &PINNED as *const HostObject as *mut HostObject;
        assert!(unsafe { get_attr(ptr, "data") }.is_none());
    }
}
