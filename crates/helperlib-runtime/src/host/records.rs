// crates/helperlib-runtime/src/host/records.rs
//! Descriptors, record arrays, records and the reference `HostRuntime`.

use std::ptr;

use super::buffers::{bytes_slice, new_bytes};
use super::{adopt, free_boxed};
use crate::buffer::DATA_ATTR;
use crate::descriptor::{DescriptorObject, Layout, ScalarType};
use crate::object::{HostObject, HostRef, HostRuntime, HostType, ObjectKind};

static DESCRIPTOR_TYPE: HostType = HostType {
    name: "dtype",
    kind: ObjectKind::Descriptor,
    dealloc: free_boxed::<DescriptorObject>,
    number_float: None,
    scalar: None,
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

/// Pinned, never freed.
unsafe fn never_freed(_: *mut HostObject) {}

static RECORD_KIND_TYPE: HostType = HostType {
    name: "type",
    kind: ObjectKind::RecordKind,
    dealloc: never_freed,
    number_float: None,
    scalar: None,
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

static RECORD_KIND: HostObject = HostObject::pinned(&RECORD_KIND_TYPE);

/// Array of records backed by a private copy of the source bytes.
#[repr(C)]
struct RecordArrayObject {
    head: HostObject,
    descr: HostRef,
    storage: HostRef,
}

static RECORD_ARRAY_TYPE: HostType = HostType {
    name: "recarray",
    kind: ObjectKind::RecordArray,
    dealloc: free_boxed::<RecordArrayObject>,
    number_float: None,
    scalar: None,
    get_attr: Some(record_get_attr),
    buffer: None,
    legacy_read_buffer: None,
};

/// A single record. Its `data` attribute is its own bytes object.
#[repr(C)]
struct RecordObject {
    head: HostObject,
    descr: HostRef,
    storage: HostRef,
}

static RECORD_TYPE: HostType = HostType {
    name: "record",
    kind: ObjectKind::Record,
    dealloc: free_boxed::<RecordObject>,
    number_float: None,
    scalar: None,
    get_attr: Some(record_get_attr),
    buffer: None,
    legacy_read_buffer: None,
};

// RecordArrayObject and RecordObject share a layout.
unsafe fn record_get_attr(obj: *mut HostObject, name: &str) -> *mut HostObject {
    if name != DATA_ATTR {
        return ptr::null_mut();
    }
    let record = unsafe { &*obj.cast::<RecordObject>() };
    record.storage.clone().into_raw()
}

fn new_descriptor(layout: Layout, is_record: bool) -> HostRef {
    adopt(DescriptorObject {
        head: HostObject::new(&DESCRIPTOR_TYPE),
        layout,
        is_record,
    })
}

pub fn new_scalar_descriptor(scalar: ScalarType) -> HostRef {
    new_descriptor(Layout::Scalar(scalar), false)
}

pub fn new_struct_descriptor(layout: Layout) -> HostRef {
    new_descriptor(layout, false)
}

fn as_record(obj: &HostRef) -> Option<&RecordObject> {
    (obj.kind() == ObjectKind::Record).then(|| unsafe { &*obj.as_ptr().cast::<RecordObject>() })
}

/// Copy of a record's bytes.
pub fn record_bytes(obj: &HostRef) -> Option<Vec<u8>> {
    bytes_slice(&as_record(obj)?.storage).map(<[u8]>::to_vec)
}

/// One field of a record, cast to `[real, imag]`.
pub fn record_field(obj: &HostRef, name: &str) -> Option<[f64; 2]> {
    let record = as_record(obj)?;
    let field = DescriptorObject::from_ref(&record.descr)?.layout.field(name)?;
    let bytes = bytes_slice(&record.storage)?;
    if field.end() > bytes.len() {
        return None;
    }
    Some(unsafe { field.scalar.cast_to_cdouble(bytes[field.offset..].as_ptr()) })
}

/// Record kind, descriptor combination, byte copies and element access for
/// the reference host.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceRuntime;

impl HostRuntime for ReferenceRuntime {
    fn record_kind(&self) -> Option<HostRef> {
        unsafe { HostRef::from_borrowed(&RECORD_KIND as *const HostObject as *mut HostObject) }
    }

    fn combine_descriptor(&self, kind: &HostRef, dtype: &HostRef) -> Option<HostRef> {
        if kind.kind() != ObjectKind::RecordKind {
            return None;
        }
        let dtype = DescriptorObject::from_ref(dtype)?;
        if !dtype.layout.is_struct() {
            return None;
        }
        Some(new_descriptor(dtype.layout.clone(), true))
    }

    fn array_from_bytes(&self, bytes: &[u8], descr: HostRef) -> Option<HostRef> {
        let itemsize = DescriptorObject::from_ref(&descr)?.layout.itemsize();
        if itemsize == 0 || bytes.len() < itemsize {
            tracing::trace!(itemsize, len = bytes.len(), "byte region too short for one item");
            return None;
        }
        Some(adopt(RecordArrayObject {
            head: HostObject::new(&RECORD_ARRAY_TYPE),
            storage: new_bytes(&bytes[..itemsize]),
            descr,
        }))
    }

    fn item(&self, seq: &HostRef, index: usize) -> Option<HostRef> {
        if seq.kind() != ObjectKind::RecordArray {
            return None;
        }
        let array = unsafe { &*seq.as_ptr().cast::<RecordArrayObject>() };
        let itemsize = DescriptorObject::from_ref(&array.descr)?.layout.itemsize();
        let start = index.checked_mul(itemsize)?;
        let bytes = bytes_slice(&array.storage)?.get(start..start.checked_add(itemsize)?)?;
        Some(adopt(RecordObject {
            head: HostObject::new(&RECORD_TYPE),
            descr: array.descr.clone(),
            storage: new_bytes(bytes),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldSpec;

    #[test]
    fn record_kind_is_pinned() {
        let kind = ReferenceRuntime.record_kind().unwrap();
        assert_eq!(kind.kind(), ObjectKind::RecordKind);
        assert_eq!(kind.ref_count(), crate::object::RC_PINNED);
    }

    #[test]
    fn combined_descriptor_is_a_record() {
        let runtime = ReferenceRuntime;
        let kind = runtime.record_kind().unwrap();
        let dtype = new_struct_descriptor(Layout::packed(vec![FieldSpec::new(
            "a",
            0,
            ScalarType::Int32,
        )]));
        let combined = runtime.combine_descriptor(&kind, &dtype).unwrap();
        let descr = DescriptorObject::from_ref(&combined).unwrap();
        assert!(descr.is_record);
        assert_eq!(descr.layout.itemsize(), 4);
        assert!(runtime.combine_descriptor(&dtype, &dtype).is_none());
    }

    #[test]
    fn item_out_of_range() {
        let runtime = ReferenceRuntime;
        let descr = new_struct_descriptor(Layout::packed(vec![FieldSpec::new(
            "a",
            0,
            ScalarType::UInt8,
        )]));
        let array = runtime.array_from_bytes(&[1, 2], descr).unwrap();
        assert!(runtime.item(&array, 0).is_some());
        assert!(runtime.item(&array, 1).is_none());
    }

    #[test]
    fn record_fields_are_readable() {
        let runtime = ReferenceRuntime;
        let descr = new_struct_descriptor(Layout::packed(vec![
            FieldSpec::new("x", 0, ScalarType::Float64),
            FieldSpec::new("n", 8, ScalarType::Int32),
        ]));
        let mut raw = 2.5f64.to_ne_bytes().to_vec();
        raw.extend_from_slice(&(-3i32).to_ne_bytes());
        let array = runtime.array_from_bytes(&raw, descr).unwrap();
        let record = runtime.item(&array, 0).unwrap();
        assert_eq!(record_field(&record, "x"), Some([2.5, 0.0]));
        assert_eq!(record_field(&record, "n"), Some([-3.0, 0.0]));
        assert_eq!(record_field(&record, "missing"), None);
        assert_eq!(record_bytes(&record), Some(raw));
    }
}
