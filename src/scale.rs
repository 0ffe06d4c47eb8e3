//! Power scales for mapping data magnitudes onto circle radii
//!
//! With an exponent of 0.5 (a square-root scale) and a range starting at 0,
//! circle *area* is linear in the input value.

/// A continuous power scale: `y = lerp(range, (x^k - d0^k) / (d1^k - d0^k))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowScale {
    exponent: f64,
    domain: (f64, f64),
    range: (f64, f64),
}

impl Default for PowScale {
    fn default() -> Self {
        Self::pow(1.0)
    }
}

impl PowScale {
    /// Create a power scale with the given exponent, unit domain and range
    pub fn pow(exponent: f64) -> Self {
        Self {
            exponent,
            domain: (0.0, 1.0),
            range: (0.0, 1.0),
        }
    }

    /// Square-root scale (exponent 0.5)
    pub fn sqrt() -> Self {
        Self::pow(0.5)
    }

    /// Set the input interval
    pub fn domain(mut self, d0: f64, d1: f64) -> Self {
        self.domain = (d0, d1);
        self
    }

    /// Set the output interval
    pub fn range(mut self, r0: f64, r1: f64) -> Self {
        self.range = (r0, r1);
        self
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Map a value through the scale
    ///
    /// Values outside the domain are extrapolated. A degenerate domain
    /// (both ends equal after the power transform) maps every input to the
    /// midpoint of the range.
    pub fn scale(&self, value: f64) -> f64 {
        let d0 = self.transform(self.domain.0);
        let d1 = self.transform(self.domain.1);
        let span = d1 - d0;

        let t = if span != 0.0 {
            (self.transform(value) - d0) / span
        } else {
            0.5
        };

        self.range.0 + (self.range.1 - self.range.0) * t
    }

    /// Sign-preserving power transform
    fn transform(&self, x: f64) -> f64 {
        if x < 0.0 {
            -(-x).powf(self.exponent)
        } else {
            x.powf(self.exponent)
        }
    }
}
