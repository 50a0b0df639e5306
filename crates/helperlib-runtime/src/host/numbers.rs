// crates/helperlib-runtime/src/host/numbers.rs
//! Numbers and array scalars.

use std::ptr;

use super::records::{new_scalar_descriptor, new_struct_descriptor};
use super::{adopt, free_boxed};
use crate::complex::NativeComplex;
use crate::descriptor::{DescriptorObject, FieldSpec, Layout, ScalarType};
use crate::object::{
    ComplexObject, FloatObject, HostObject, HostRef, HostType, ObjectKind, ScalarSlots,
};

static COMPLEX_TYPE: HostType = HostType {
    name: "complex",
    kind: ObjectKind::Complex,
    dealloc: free_boxed::<ComplexObject>,
    number_float: None,
    scalar: None,
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

static FLOAT_TYPE: HostType = HostType {
    name: "float",
    kind: ObjectKind::Float,
    dealloc: free_boxed::<FloatObject>,
    number_float: Some(float_to_float),
    scalar: None,
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

#[repr(C)]
struct IntObject {
    head: HostObject,
    value: i64,
}

static INT_TYPE: HostType = HostType {
    name: "int",
    kind: ObjectKind::Int,
    dealloc: free_boxed::<IntObject>,
    number_float: Some(int_to_float),
    scalar: None,
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

/// A boxed array element. Storage is wide enough for `complex128`.
#[repr(C)]
struct ScalarObject {
    head: HostObject,
    descr: Option<HostRef>,
    storage: [u8; 16],
}

static COMPLEX_SCALAR_TYPE: HostType = HostType {
    name: "complexfloating",
    kind: ObjectKind::ArrayScalar,
    dealloc: free_boxed::<ScalarObject>,
    number_float: None,
    scalar: Some(ScalarSlots {
        complex: true,
        descr: scalar_descr,
        data: scalar_data,
    }),
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

static REAL_SCALAR_TYPE: HostType = HostType {
    name: "number",
    kind: ObjectKind::ArrayScalar,
    dealloc: free_boxed::<ScalarObject>,
    number_float: Some(real_scalar_to_float),
    scalar: Some(ScalarSlots {
        complex: false,
        descr: scalar_descr,
        data: scalar_data,
    }),
    get_attr: None,
    buffer: None,
    legacy_read_buffer: None,
};

unsafe fn float_to_float(obj: *mut HostObject) -> *mut HostObject {
    unsafe { HostRef::from_borrowed(obj) }.map_or(ptr::null_mut(), HostRef::into_raw)
}

unsafe fn int_to_float(obj: *mut HostObject) -> *mut HostObject {
    let value = unsafe { (*obj.cast::<IntObject>()).value };
    new_float(value as f64).into_raw()
}

unsafe fn scalar_descr(obj: *mut HostObject) -> *mut HostObject {
    let scalar = unsafe { &*obj.cast::<ScalarObject>() };
    scalar.descr.clone().map_or(ptr::null_mut(), HostRef::into_raw)
}

unsafe fn scalar_data(obj: *mut HostObject) -> *const u8 {
    unsafe { (*obj.cast::<ScalarObject>()).storage.as_ptr() }
}

unsafe fn real_scalar_to_float(obj: *mut HostObject) -> *mut HostObject {
    let scalar = unsafe { &*obj.cast::<ScalarObject>() };
    let Some(Layout::Scalar(ty)) = scalar
        .descr
        .as_ref()
        .and_then(DescriptorObject::from_ref)
        .map(|d| &d.layout)
    else {
        return ptr::null_mut();
    };
    let [real, _] = unsafe { ty.cast_to_cdouble(scalar.storage.as_ptr()) };
    new_float(real).into_raw()
}

pub fn new_complex(real: f64, imag: f64) -> HostRef {
    adopt(ComplexObject {
        head: HostObject::new(&COMPLEX_TYPE),
        value: NativeComplex::new(real, imag),
    })
}

pub fn new_float(value: f64) -> HostRef {
    adopt(FloatObject {
        head: HostObject::new(&FLOAT_TYPE),
        value,
    })
}

pub fn new_int(value: i64) -> HostRef {
    adopt(IntObject {
        head: HostObject::new(&INT_TYPE),
        value,
    })
}

fn new_scalar(ty: &'static HostType, descr: Option<HostRef>, raw: &[u8]) -> HostRef {
    let mut storage = [0u8; 16];
    let n = raw.len().min(storage.len());
    storage[..n].copy_from_slice(&raw[..n]);
    adopt(ScalarObject {
        head: HostObject::new(ty),
        descr,
        storage,
    })
}

pub fn new_complex64_scalar(real: f32, imag: f32) -> HostRef {
    let raw = [real.to_ne_bytes(), imag.to_ne_bytes()].concat();
    let descr = new_scalar_descriptor(ScalarType::Complex64);
    new_scalar(&COMPLEX_SCALAR_TYPE, Some(descr), &raw)
}

pub fn new_complex128_scalar(real: f64, imag: f64) -> HostRef {
    let raw = [real.to_ne_bytes(), imag.to_ne_bytes()].concat();
    let descr = new_scalar_descriptor(ScalarType::Complex128);
    new_scalar(&COMPLEX_SCALAR_TYPE, Some(descr), &raw)
}

/// Non-complex array scalar holding `raw` (native byte order) as `ty`.
pub fn new_real_scalar(ty: ScalarType, raw: &[u8]) -> HostRef {
    new_scalar(&REAL_SCALAR_TYPE, Some(new_scalar_descriptor(ty)), raw)
}

/// Complex array scalar whose descriptor lookup fails.
pub fn new_complex_scalar_without_descriptor() -> HostRef {
    new_scalar(&COMPLEX_SCALAR_TYPE, None, &[])
}

/// Complex array scalar whose descriptor is structured and so cannot be
/// cast to a complex.
pub fn new_complex_scalar_with_struct_descriptor() -> HostRef {
    let descr = new_struct_descriptor(Layout::packed(vec![
        FieldSpec::new("re", 0, ScalarType::Float64),
        FieldSpec::new("im", 8, ScalarType::Float64),
    ]));
    new_scalar(&COMPLEX_SCALAR_TYPE, Some(descr), &[])
}

/// The element descriptor of an array scalar.
pub fn scalar_descriptor(obj: &HostRef) -> Option<HostRef> {
    let slots = obj.ty().scalar?;
    unsafe { HostRef::from_new((slots.descr)(obj.as_ptr())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coerces_to_float() {
        let five = new_int(5);
        let coerce = five.ty().number_float.unwrap();
        let float = unsafe { HostRef::from_new(coerce(five.as_ptr())) }.unwrap();
        assert_eq!(float.kind(), ObjectKind::Float);
        assert_eq!(unsafe { (*float.as_ptr().cast::<FloatObject>()).value }, 5.0);
    }

    #[test]
    fn scalar_descriptor_is_shared() {
        let value = new_complex128_scalar(1.0, 2.0);
        let first = scalar_descriptor(&value).unwrap();
        let second = scalar_descriptor(&value).unwrap();
        assert_eq!(first.as_ptr(), second.as_ptr());
        assert!(scalar_descriptor(&new_int(1)).is_none());
        assert!(scalar_descriptor(&new_complex_scalar_without_descriptor()).is_none());
    }
}
