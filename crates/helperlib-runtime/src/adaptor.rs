// crates/helperlib-runtime/src/adaptor.rs
//! Native value adaptor: dynamic host number -> `NativeComplex`.

use std::ffi::c_int;

use crate::complex::NativeComplex;
use crate::descriptor::{DescriptorObject, Layout};
use crate::errors::{ConversionError, set_error};
use crate::object::{ComplexObject, FloatObject, HostObject, HostRef, HostType, ObjectKind};

/// How a value is turned into a complex. Checked in declaration order; the
/// first matching arm is used and never falls through to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// The host's own complex scalar: read the parts in place.
    NativeComplex,
    /// Complex-family array scalar: cast through its element descriptor.
    ArrayScalar,
    /// Anything with a float coercion: real part only.
    CoercibleReal,
    NotNumeric,
}

impl NumericKind {
    pub fn of(ty: &HostType) -> NumericKind {
        if ty.kind == ObjectKind::Complex {
            NumericKind::NativeComplex
        } else if ty.scalar.is_some_and(|slots| slots.complex) {
            NumericKind::ArrayScalar
        } else if ty.number_float.is_some() {
            NumericKind::CoercibleReal
        } else {
            NumericKind::NotNumeric
        }
    }
}

/// Convert a borrowed dynamic value to a native complex.
///
/// # Safety
/// `value` must be null or point to a live host object.
pub unsafe fn adapt_to_complex(value: *mut HostObject) -> Result<NativeComplex, ConversionError> {
    if value.is_null() {
        return Err(ConversionError::NotNumeric);
    }
    let ty = unsafe { (*value).ty };
    match NumericKind::of(ty) {
        NumericKind::NativeComplex => {
            let obj = unsafe { &*(value as *const ComplexObject) };
            Ok(obj.value)
        }
        NumericKind::ArrayScalar => unsafe { adapt_array_scalar(value, ty) },
        NumericKind::CoercibleReal => unsafe { adapt_real(value, ty) },
        NumericKind::NotNumeric => Err(ConversionError::NotNumeric),
    }
}

unsafe fn adapt_array_scalar(
    value: *mut HostObject,
    ty: &HostType,
) -> Result<NativeComplex, ConversionError> {
    let Some(slots) = ty.scalar else {
        return Err(ConversionError::NotNumeric);
    };
    // Dropped on every return below.
    let descr = unsafe { HostRef::from_new((slots.descr)(value)) }
        .ok_or(ConversionError::DescriptorUnavailable)?;
    let descr = DescriptorObject::from_ref(&descr).ok_or(ConversionError::DescriptorUnavailable)?;
    let Layout::Scalar(scalar) = descr.layout else {
        return Err(ConversionError::CastFailed);
    };
    let data = unsafe { (slots.data)(value) };
    if data.is_null() {
        return Err(ConversionError::CastFailed);
    }
    let parts = unsafe { scalar.cast_to_cdouble(data) };
    tracing::trace!(scalar = scalar.name(), "array scalar cast to complex128");
    Ok(NativeComplex::from(parts))
}

unsafe fn adapt_real(value: *mut HostObject, ty: &HostType) -> Result<NativeComplex, ConversionError> {
    let coerce = ty.number_float.ok_or(ConversionError::NotNumeric)?;
    let float = unsafe { HostRef::from_new(coerce(value)) }.ok_or(ConversionError::NotNumeric)?;
    if float.kind() != ObjectKind::Float {
        return Err(ConversionError::NotNumeric);
    }
    let real = unsafe { (*(float.as_ptr() as *const FloatObject)).value };
    Ok(NativeComplex::from_real(real))
}

/// C entry point: convert `obj` into `*out`. Returns 1 on success; on
/// failure returns 0, leaves `*out` untouched and sets the pending error.
///
/// # Safety
/// `obj` must be null or a live host object; `out` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn helperlib_complex_adaptor(obj: *mut HostObject, out: *mut NativeComplex) -> c_int {
    match unsafe { adapt_to_complex(obj) } {
        Ok(value) => {
            unsafe { out.write(value) };
            1
        }
        Err(err) => {
            set_error(err);
            0
        }
    }
}
