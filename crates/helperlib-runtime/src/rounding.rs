// crates/helperlib-runtime/src/rounding.rs
//! Rounding and float-to-integer conversion primitives.

/// Round to nearest, ties to even.
pub fn round_half_even(x: f64) -> f64 {
    let z = x.round();
    if (x - z).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        z
    }
}

/// Single-precision [`round_half_even`].
pub fn roundf_half_even(x: f32) -> f32 {
    let z = x.round();
    if (x - z).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        z
    }
}

/// Truncating conversion to an unsigned 64-bit integer.
///
/// Values outside `[0, u64::MAX]` follow Rust's `as` cast: negative values
/// and NaN give 0, values above the range give `u64::MAX`. No other guard is
/// applied.
pub fn float_to_unsigned(x: f64) -> u64 {
    x as u64
}

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_round_even(x: f64) -> f64 {
    round_half_even(x)
}

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_roundf_even(x: f32) -> f32 {
    roundf_half_even(x)
}

#[unsafe(no_mangle)]
pub extern "C" fn helperlib_fptoui(x: f64) -> u64 {
    float_to_unsigned(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_go_to_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(-0.5), -0.0);
        assert_eq!(round_half_even(-1.5), -2.0);
        assert_eq!(round_half_even(-2.5), -2.0);
        assert_eq!(roundf_half_even(2.5), 2.0);
        assert_eq!(roundf_half_even(3.5), 4.0);
        assert_eq!(roundf_half_even(-3.5), -4.0);
    }

    #[test]
    fn non_ties_round_to_nearest() {
        for x in [0.49, 0.51, 1.2, -1.7, 1e15 + 0.25, 123.999] {
            assert_eq!(round_half_even(x), x.round(), "{x}");
        }
        for x in [0.49f32, 0.51, 1.2, -1.7, 123.99] {
            assert_eq!(roundf_half_even(x), x.round(), "{x}");
        }
    }

    #[test]
    fn agrees_with_ties_even_on_a_grid() {
        for i in -400..=400 {
            let x = f64::from(i) * 0.25;
            assert_eq!(round_half_even(x), x.round_ties_even(), "{x}");
            let xf = i as f32 * 0.25;
            assert_eq!(roundf_half_even(xf), xf.round_ties_even(), "{xf}");
        }
    }

    #[test]
    fn special_values_pass_through() {
        assert!(round_half_even(f64::NAN).is_nan());
        assert_eq!(round_half_even(f64::INFINITY), f64::INFINITY);
        assert_eq!(roundf_half_even(f32::NEG_INFINITY), f32::NEG_INFINITY);
    }

    #[test]
    fn fptoui_truncates() {
        assert_eq!(float_to_unsigned(3.99), 3);
        assert_eq!(float_to_unsigned(0.0), 0);
        assert_eq!(float_to_unsigned(9007199254740992.0), 1 << 53);
        assert_eq!(float_to_unsigned(-1.0), 0);
        assert_eq!(float_to_unsigned(f64::NAN), 0);
        assert_eq!(float_to_unsigned(1e30), u64::MAX);
    }

    #[test]
    fn c_entries_match() {
        assert_eq!(helperlib_round_even(4.5), 4.0);
        assert_eq!(helperlib_roundf_even(5.5), 6.0);
        assert_eq!(helperlib_fptoui(7.9), 7);
    }
}
