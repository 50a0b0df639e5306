//! Calls every core helper through the addresses in the export table, the
//! way generated code does.

use std::ffi::{c_int, c_void};
use std::mem::transmute;

use helperlib_runtime::buffer::BufferView;
use helperlib_runtime::descriptor::{FieldSpec, Layout, ScalarType};
use helperlib_runtime::host;
use helperlib_runtime::{
    ConversionError, HelperError, HostObject, HostRef, NativeComplex, export_table, module_init,
    take_error,
};

type AdaptorFn = unsafe extern "C" fn(*mut HostObject, *mut NativeComplex) -> c_int;
type ExtractFn = unsafe extern "C" fn(*mut HostObject, *mut BufferView) -> *mut c_void;
type ReleaseFn = unsafe extern "C" fn(*mut BufferView);
type RecreateFn = unsafe extern "C" fn(*const c_void, c_int, *mut HostObject) -> *mut HostObject;

fn helper(name: &str) -> *const u8 {
    export_table()
        .unwrap()
        .get(name)
        .unwrap_or_else(|| panic!("{name} not exported"))
        .as_ptr()
}

#[test]
fn adaptor_through_table() {
    let adapt: AdaptorFn = unsafe { transmute(helper("complex_adaptor")) };

    let mut out = NativeComplex::ZERO;
    let value = host::new_complex(3.0, -4.0);
    assert_eq!(unsafe { adapt(value.as_ptr(), &mut out) }, 1);
    assert_eq!(out, NativeComplex::new(3.0, -4.0));

    let value = host::new_int(5);
    assert_eq!(unsafe { adapt(value.as_ptr(), &mut out) }, 1);
    assert_eq!(out, NativeComplex::new(5.0, 0.0));

    let junk = host::new_bytes(b"x");
    let mut untouched = NativeComplex::new(9.0, 9.0);
    assert_eq!(unsafe { adapt(junk.as_ptr(), &mut untouched) }, 0);
    assert_eq!(untouched, NativeComplex::new(9.0, 9.0));
    assert_eq!(
        take_error(),
        Some(HelperError::Conversion(ConversionError::NotNumeric))
    );
}

#[test]
fn record_round_trip_through_table() {
    host::install_reference_runtime();
    let extract: ExtractFn = unsafe { transmute(helper("extract_record_data")) };
    let release: ReleaseFn = unsafe { transmute(helper("release_record_buffer")) };
    let recreate: RecreateFn = unsafe { transmute(helper("recreate_record")) };

    let dtype = host::new_struct_descriptor(Layout::packed(vec![
        FieldSpec::new("re", 0, ScalarType::Float64),
        FieldSpec::new("im", 8, ScalarType::Float64),
    ]));
    let mut source = [1.25f64.to_ne_bytes(), (-8.0f64).to_ne_bytes()].concat();

    let raw = unsafe { recreate(source.as_ptr().cast(), 16, dtype.as_ptr()) };
    let record = unsafe { HostRef::from_new(raw) }.expect("record");
    source.fill(0);

    // The record exposes its own copy through `data`.
    let mut view = BufferView::empty();
    let ptr = unsafe { extract(record.as_ptr(), &mut view) };
    assert!(!ptr.is_null());
    assert_eq!(view.len, 16);
    let copied = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), 16) };
    assert_eq!(&copied[..8], &1.25f64.to_ne_bytes());
    assert_eq!(&copied[8..], &(-8.0f64).to_ne_bytes());
    unsafe { release(&mut view) };

    assert_eq!(host::record_field(&record, "im"), Some([-8.0, 0.0]));
    assert_eq!(record.ref_count(), 1);
}

#[test]
fn integer_and_rounding_helpers_through_table() {
    let sdiv: extern "C" fn(i64, i64) -> i64 = unsafe { transmute(helper("sdiv")) };
    let urem: extern "C" fn(u64, u64) -> u64 = unsafe { transmute(helper("urem")) };
    let round_even: extern "C" fn(f64) -> f64 = unsafe { transmute(helper("round_even")) };
    let roundf_even: extern "C" fn(f32) -> f32 = unsafe { transmute(helper("roundf_even")) };
    let fptoui: extern "C" fn(f64) -> u64 = unsafe { transmute(helper("fptoui")) };
    let hypotf: extern "C" fn(f32, f32) -> f32 = unsafe { transmute(helper("hypotf")) };

    assert_eq!(sdiv(-9, 2), -4);
    assert_eq!(urem(10, 4), 2);
    assert_eq!(round_even(2.5), 2.0);
    assert_eq!(round_even(3.5), 4.0);
    assert_eq!(round_even(-2.5), -2.0);
    assert_eq!(roundf_even(2.5), 2.0);
    assert_eq!(fptoui(42.9), 42);
    assert_eq!(hypotf(3.0, 4.0), 5.0);
}

#[test]
fn module_exposes_table_and_constants() {
    let module = module_init().unwrap();
    assert!(module.c_helpers.len() >= 12);
    assert_eq!(module.buffer_view_size, size_of::<BufferView>());
    assert!(module.long_min < 0 && module.long_max > 0);
    for (name, addr) in module.c_helpers.iter() {
        assert_ne!(addr.get(), 0, "{name}");
    }
}
