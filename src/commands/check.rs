// src/commands/check.rs

use std::ffi::{c_int, c_void};
use std::fmt::Debug;
use std::mem::transmute;
use std::process::ExitCode;

use thiserror::Error;

use helperlib_runtime::buffer::BufferView;
use helperlib_runtime::descriptor::{FieldSpec, Layout, ScalarType};
use helperlib_runtime::host;
use helperlib_runtime::{
    ConversionError, ExportTable, ExtractError, HelperError, HostObject, HostRef, NativeComplex,
    ReconstructError, module_init, take_error,
};

type AdaptorFn = unsafe extern "C" fn(*mut HostObject, *mut NativeComplex) -> c_int;
type ExtractFn = unsafe extern "C" fn(*mut HostObject, *mut BufferView) -> *mut c_void;
type ReleaseFn = unsafe extern "C" fn(*mut BufferView);
type RecreateFn = unsafe extern "C" fn(*const c_void, c_int, *mut HostObject) -> *mut HostObject;
type CpowFn = unsafe extern "C" fn(*const NativeComplex, *const NativeComplex, *mut NativeComplex);

#[derive(Debug, Error)]
pub enum CheckFailure {
    #[error("helper `{0}` is not exported")]
    Missing(&'static str),
    #[error("`{helper}` failed: {source}")]
    Helper {
        helper: &'static str,
        source: HelperError,
    },
    #[error("`{helper}` gave {got}, expected {want}")]
    Mismatch {
        helper: &'static str,
        got: String,
        want: String,
    },
}

struct Check {
    name: &'static str,
    run: fn(&ExportTable) -> Result<(), CheckFailure>,
}

const CHECKS: &[Check] = &[
    Check {
        name: "complex_adaptor",
        run: check_complex_adaptor,
    },
    Check {
        name: "extract_record_data",
        run: check_extract_record_data,
    },
    Check {
        name: "recreate_record",
        run: check_recreate_record,
    },
    Check {
        name: "rounding",
        run: check_rounding,
    },
    Check {
        name: "integer division",
        run: check_integer_division,
    },
    Check {
        name: "cpow",
        run: check_cpow,
    },
    Check {
        name: "math",
        run: check_math,
    },
];

fn lookup(table: &ExportTable, name: &'static str) -> Result<*const u8, CheckFailure> {
    table
        .get(name)
        .map(|addr| addr.as_ptr())
        .ok_or(CheckFailure::Missing(name))
}

fn expect_eq<T: PartialEq + Debug>(helper: &'static str, got: T, want: T) -> Result<(), CheckFailure> {
    if got == want {
        return Ok(());
    }
    Err(CheckFailure::Mismatch {
        helper,
        got: format!("{got:?}"),
        want: format!("{want:?}"),
    })
}

/// The pending error must be exactly `want`.
fn expect_error(helper: &'static str, want: HelperError) -> Result<(), CheckFailure> {
    expect_eq(helper, take_error(), Some(want))
}

fn check_complex_adaptor(table: &ExportTable) -> Result<(), CheckFailure> {
    const NAME: &str = "complex_adaptor";
    let adapt: AdaptorFn = unsafe { transmute(lookup(table, NAME)?) };

    let cases = [
        (host::new_complex(3.0, -4.0), NativeComplex::new(3.0, -4.0)),
        (host::new_int(5), NativeComplex::new(5.0, 0.0)),
        (host::new_float(-0.25), NativeComplex::new(-0.25, 0.0)),
        (
            host::new_complex64_scalar(1.5, -0.1),
            NativeComplex::new(1.5, f64::from(-0.1f32)),
        ),
    ];
    for (value, want) in &cases {
        let mut out = NativeComplex::ZERO;
        let status = unsafe { adapt(value.as_ptr(), &mut out) };
        if status != 1 {
            let err = take_error().unwrap_or(HelperError::Conversion(ConversionError::NotNumeric));
            return Err(CheckFailure::Helper { helper: NAME, source: err });
        }
        expect_eq(NAME, out, *want)?;
    }

    let junk = host::new_bytes(b"abc");
    let sentinel = NativeComplex::new(7.0, 7.0);
    let mut out = sentinel;
    expect_eq(NAME, unsafe { adapt(junk.as_ptr(), &mut out) }, 0)?;
    expect_eq(NAME, out, sentinel)?;
    expect_error(NAME, ConversionError::NotNumeric.into())
}

fn check_extract_record_data(table: &ExportTable) -> Result<(), CheckFailure> {
    const NAME: &str = "extract_record_data";
    let extract: ExtractFn = unsafe { transmute(lookup(table, NAME)?) };
    let release: ReleaseFn = unsafe { transmute(lookup(table, "release_record_buffer")?) };

    let source: Vec<u8> = (0..32).collect();
    let bytes = host::new_bytes(&source);
    let holder = host::new_record_holder(&bytes);
    let refs = bytes.ref_count();
    for _ in 0..1_000 {
        let mut view = BufferView::empty();
        let ptr = unsafe { extract(holder.as_ptr(), &mut view) };
        if ptr.is_null() {
            let err = take_error().unwrap_or(HelperError::Extract(ExtractError::NoBufferProtocol));
            return Err(CheckFailure::Helper { helper: NAME, source: err });
        }
        expect_eq(NAME, ptr.cast::<u8>(), host::bytes_ptr(&bytes))?;
        expect_eq(NAME, view.len, 32)?;
        unsafe { release(&mut view) };
    }
    expect_eq(NAME, host::bytes_exports(&bytes), 0)?;
    expect_eq(NAME, bytes.ref_count(), refs)?;

    let base = host::new_bytes(&source);
    let legacy = host::new_legacy_buffer(Some(&base), std::ptr::null_mut(), 8, 4);
    let holder = host::new_record_holder(&legacy);
    let mut view = BufferView::empty();
    let ptr = unsafe { extract(holder.as_ptr(), &mut view) };
    expect_eq(NAME, ptr.cast::<u8>(), host::bytes_ptr(&base).wrapping_add(4))?;
    expect_eq(NAME, view.len, 8)?;
    unsafe { release(&mut view) };

    let no_data = host::new_int(1);
    let mut view = BufferView::empty();
    expect_eq(NAME, unsafe { extract(no_data.as_ptr(), &mut view) }, std::ptr::null_mut())?;
    expect_error(NAME, ExtractError::NoDataAttribute.into())
}

fn check_recreate_record(table: &ExportTable) -> Result<(), CheckFailure> {
    const NAME: &str = "recreate_record";
    let recreate: RecreateFn = unsafe { transmute(lookup(table, NAME)?) };

    let dtype = host::new_struct_descriptor(Layout::packed(vec![
        FieldSpec::new("x", 0, ScalarType::Float64),
        FieldSpec::new("n", 8, ScalarType::Int64),
    ]));
    let original = [2.5f64.to_ne_bytes(), 11i64.to_ne_bytes()].concat();
    let mut source = original.clone();

    let raw = unsafe { recreate(source.as_ptr().cast(), 16, dtype.as_ptr()) };
    let Some(record) = (unsafe { HostRef::from_new(raw) }) else {
        let err = take_error().unwrap_or(HelperError::Reconstruct(ReconstructError::CopyFailed));
        return Err(CheckFailure::Helper { helper: NAME, source: err });
    };
    source.fill(0xee);
    expect_eq(NAME, host::record_bytes(&record), Some(original))?;
    expect_eq(NAME, host::record_field(&record, "n"), Some([11.0, 0.0]))
}

fn check_rounding(table: &ExportTable) -> Result<(), CheckFailure> {
    let round_even: extern "C" fn(f64) -> f64 = unsafe { transmute(lookup(table, "round_even")?) };
    let roundf_even: extern "C" fn(f32) -> f32 = unsafe { transmute(lookup(table, "roundf_even")?) };
    let fptoui: extern "C" fn(f64) -> u64 = unsafe { transmute(lookup(table, "fptoui")?) };

    for (x, want) in [(2.5, 2.0), (3.5, 4.0), (-2.5, -2.0), (1.4, 1.0)] {
        expect_eq("round_even", round_even(x), want)?;
    }
    for (x, want) in [(2.5f32, 2.0), (3.5, 4.0), (-2.5, -2.0)] {
        expect_eq("roundf_even", roundf_even(x), want)?;
    }
    expect_eq("fptoui", fptoui(3.99), 3)
}

fn check_integer_division(table: &ExportTable) -> Result<(), CheckFailure> {
    let sdiv: extern "C" fn(i64, i64) -> i64 = unsafe { transmute(lookup(table, "sdiv")?) };
    let srem: extern "C" fn(i64, i64) -> i64 = unsafe { transmute(lookup(table, "srem")?) };
    let udiv: extern "C" fn(u64, u64) -> u64 = unsafe { transmute(lookup(table, "udiv")?) };
    let urem: extern "C" fn(u64, u64) -> u64 = unsafe { transmute(lookup(table, "urem")?) };

    expect_eq("sdiv", sdiv(-7, 2), -3)?;
    expect_eq("srem", srem(-7, 2), -1)?;
    expect_eq("udiv", udiv(u64::MAX, 2), u64::MAX / 2)?;
    expect_eq("urem", urem(17, 5), 2)
}

fn check_cpow(table: &ExportTable) -> Result<(), CheckFailure> {
    let cpow: CpowFn = unsafe { transmute(lookup(table, "cpow")?) };
    let base = NativeComplex::from_real(2.0);
    let exp = NativeComplex::from_real(10.0);
    let mut out = NativeComplex::ZERO;
    unsafe { cpow(&base, &exp, &mut out) };
    expect_eq("cpow", (out.real.round(), out.imag.abs() < 1e-9), (1024.0, true))
}

fn check_math(table: &ExportTable) -> Result<(), CheckFailure> {
    let sqrt: extern "C" fn(f64) -> f64 = unsafe { transmute(lookup(table, "sqrt")?) };
    let sqrtf: extern "C" fn(f32) -> f32 = unsafe { transmute(lookup(table, "sqrtf")?) };
    let hypot: extern "C" fn(f64, f64) -> f64 = unsafe { transmute(lookup(table, "hypot")?) };
    expect_eq("sqrt", sqrt(81.0), 9.0)?;
    expect_eq("sqrtf", sqrtf(81.0), 9.0)?;
    expect_eq("hypot", hypot(3.0, 4.0), 5.0)
}

/// Run every check. Returns the number of failures.
pub fn run_checks(table: &ExportTable, verbose: bool) -> usize {
    let mut failed = 0;
    for check in CHECKS {
        tracing::debug!(check = check.name, "running");
        match (check.run)(table) {
            Ok(()) => {
                if verbose {
                    println!("ok    {}", check.name);
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL  {}: {e}", check.name);
            }
        }
    }
    failed
}

pub fn check_helpers(verbose: bool) -> ExitCode {
    let module = match module_init() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    host::install_reference_runtime();

    let failed = run_checks(module.c_helpers, verbose);
    println!("{} passed, {failed} failed", CHECKS.len() - failed);
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
