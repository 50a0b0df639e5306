// crates/helperlib-runtime/src/arith.rs
//! Arithmetic bridges: integer division, complex power and libm
//! pass-throughs called from generated code.

use crate::complex::NativeComplex;
use crate::export_table::HelperSymbol;

// =============================================================================
// Integer division
// =============================================================================

// A zero divisor is guarded by the code generator; here it yields 0 so no
// panic can unwind across the C boundary.

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_sdiv(a: i64, b: i64) -> i64 {
    if b == 0 { 0 } else { a.wrapping_div(b) }
}

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_srem(a: i64, b: i64) -> i64 {
    if b == 0 { 0 } else { a.wrapping_rem(b) }
}

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_udiv(a: u64, b: u64) -> u64 {
    a.checked_div(b).unwrap_or(0)
}

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_urem(a: u64, b: u64) -> u64 {
    a.checked_rem(b).unwrap_or(0)
}

// =============================================================================
// Complex power
// =============================================================================

/// `*out = *a ** *b`.
///
/// # Safety
/// `a` and `b` must be readable and `out` writable `NativeComplex` slots.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn helperlib_cpow(
    a: *const NativeComplex,
    b: *const NativeComplex,
    out: *mut NativeComplex,
) {
    unsafe { out.write((*a).pow(*b)) };
}

// =============================================================================
// Math pass-throughs
// =============================================================================

macro_rules! unary_math {
    ($($name:literal: $f64_fn:ident, $f32_fn:ident => $method:ident;)*) => {
        $(
            #[unsafe(no_mangle)]
            pub extern "C" fn $f64_fn(x: f64) -> f64 {
                x.$method()
            }

            #[unsafe(no_mangle)]
            pub extern "C" fn $f32_fn(x: f32) -> f32 {
                x.$method()
            }
        )*

        const UNARY_MATH_SYMBOLS: &[HelperSymbol] = &[
            $(
                HelperSymbol { name: $name, ptr: $f64_fn as *const u8 },
                HelperSymbol { name: concat!($name, "f"), ptr: $f32_fn as *const u8 },
            )*
        ];
    };
}

macro_rules! binary_math {
    ($($name:literal: $f64_fn:ident, $f32_fn:ident => |$x:ident, $y:ident| $body:expr;)*) => {
        $(
            #[unsafe(no_mangle)]
            pub extern "C" fn $f64_fn($x: f64, $y: f64) -> f64 {
                $body
            }

            #[unsafe(no_mangle)]
            pub extern "C" fn $f32_fn($x: f32, $y: f32) -> f32 {
                $body
            }
        )*

        const BINARY_MATH_SYMBOLS: &[HelperSymbol] = &[
            $(
                HelperSymbol { name: $name, ptr: $f64_fn as *const u8 },
                HelperSymbol { name: concat!($name, "f"), ptr: $f32_fn as *const u8 },
            )*
        ];
    };
}

unary_math! {
    "sqrt": helperlib_sqrt, helperlib_sqrtf => sqrt;
    "exp": helperlib_exp, helperlib_expf => exp;
    "expm1": helperlib_expm1, helperlib_expm1f => exp_m1;
    "log": helperlib_log, helperlib_logf => ln;
    "log1p": helperlib_log1p, helperlib_log1pf => ln_1p;
    "log10": helperlib_log10, helperlib_log10f => log10;
    "log2": helperlib_log2, helperlib_log2f => log2;
    "sin": helperlib_sin, helperlib_sinf => sin;
    "cos": helperlib_cos, helperlib_cosf => cos;
    "tan": helperlib_tan, helperlib_tanf => tan;
    "asin": helperlib_asin, helperlib_asinf => asin;
    "acos": helperlib_acos, helperlib_acosf => acos;
    "atan": helperlib_atan, helperlib_atanf => atan;
    "sinh": helperlib_sinh, helperlib_sinhf => sinh;
    "cosh": helperlib_cosh, helperlib_coshf => cosh;
    "tanh": helperlib_tanh, helperlib_tanhf => tanh;
    "asinh": helperlib_asinh, helperlib_asinhf => asinh;
    "acosh": helperlib_acosh, helperlib_acoshf => acosh;
    "atanh": helperlib_atanh, helperlib_atanhf => atanh;
    "floor": helperlib_floor, helperlib_floorf => floor;
    "ceil": helperlib_ceil, helperlib_ceilf => ceil;
    "trunc": helperlib_trunc, helperlib_truncf => trunc;
    "fabs": helperlib_fabs, helperlib_fabsf => abs;
}

binary_math! {
    "atan2": helperlib_atan2, helperlib_atan2f => |y, x| y.atan2(x);
    "pow": helperlib_pow, helperlib_powf => |x, y| x.powf(y);
    // Rust's float `%` truncates like C fmod: the sign follows the dividend.
    "fmod": helperlib_fmod, helperlib_fmodf => |x, y| x % y;
    "hypot": helperlib_hypot, helperlib_hypotf => |x, y| x.hypot(y);
    "copysign": helperlib_copysign, helperlib_copysignf => |x, y| x.copysign(y);
}

pub(crate) fn math_symbols() -> impl Iterator<Item = &'static HelperSymbol> {
    UNARY_MATH_SYMBOLS.iter().chain(BINARY_MATH_SYMBOLS)
}
