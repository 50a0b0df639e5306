// crates/helperlib-runtime/src/complex.rs

/// Fixed-width complex number handed to generated code.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NativeComplex {
    pub real: f64,
    pub imag: f64,
}

impl NativeComplex {
    pub const ZERO: NativeComplex = NativeComplex::new(0.0, 0.0);
    pub const ONE: NativeComplex = NativeComplex::new(1.0, 0.0);

    pub const fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    pub const fn from_real(real: f64) -> Self {
        Self { real, imag: 0.0 }
    }

    pub fn abs(self) -> f64 {
        self.real.hypot(self.imag)
    }

    /// `self ** exp` with the host runtime's conventions: a zero exponent
    /// yields one, and zero raised to a negative or complex power yields zero.
    pub fn pow(self, exp: NativeComplex) -> NativeComplex {
        if exp.real == 0.0 && exp.imag == 0.0 {
            return NativeComplex::ONE;
        }
        if self.real == 0.0 && self.imag == 0.0 {
            // 0 ** negative and 0 ** complex are domain errors upstream; both
            // produce zero here.
            return NativeComplex::ZERO;
        }
        let vabs = self.abs();
        let mut len = vabs.powf(exp.real);
        let at = self.imag.atan2(self.real);
        let mut phase = at * exp.real;
        if exp.imag != 0.0 {
            len /= (at * exp.imag).exp();
            phase += exp.imag * vabs.ln();
        }
        NativeComplex::new(len * phase.cos(), len * phase.sin())
    }
}

impl From<[f64; 2]> for NativeComplex {
    fn from(parts: [f64; 2]) -> Self {
        NativeComplex::new(parts[0], parts[1])
    }
}
