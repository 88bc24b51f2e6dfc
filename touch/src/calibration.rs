//! Three point affine calibration.
//!
//! A raw transducer reading (Xs, Ys) maps to a display point (Xd, Yd) through
//!
//! ```text
//! Xd = (A·Xs + B·Ys + C) / divider
//! Yd = (D·Xs + E·Ys + F) / divider
//! ```
//!
//! which corrects for translation, scaling and rotation between the touch panel and the display.
//! The coefficients are solved from three non-collinear reference points with Cramer's rule
//! (Carlos E. Vidales' method). All terms are summed before the single division so rounding
//! happens once.
//!
//! Intermediate products are 64 bit, so 12-bit digitizers are handled as well as 10-bit ones.

use crate::{DisplayPoint, RawSample};

/// Size of a persisted matrix: seven little-endian `i32`
pub const MATRIX_BYTES: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The three raw points are collinear or repeated
    Collinear,
    /// A coefficient does not fit in 32 bits
    Overflow,
}

/// Calibration coefficients. A zero `divider` means "not calibrated".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationMatrix {
    pub a: i32,
    pub b: i32,
    pub c: i32,
    pub d: i32,
    pub e: i32,
    pub f: i32,
    pub divider: i32,
}

impl CalibrationMatrix {
    pub const UNCALIBRATED: Self = Self {
        a: 0,
        b: 0,
        c: 0,
        d: 0,
        e: 0,
        f: 0,
        divider: 0,
    };

    pub fn is_calibrated(&self) -> bool {
        self.divider != 0
    }

    /// Solve the matrix that maps each of `raw` onto the matching entry of `display`
    pub fn compute(
        display: &[DisplayPoint; 3],
        raw: &[RawSample; 3],
    ) -> Result<Self, CalibrationError> {
        let (xd0, yd0) = (display[0].x as i64, display[0].y as i64);
        let (xd1, yd1) = (display[1].x as i64, display[1].y as i64);
        let (xd2, yd2) = (display[2].x as i64, display[2].y as i64);
        let (xs0, ys0) = (raw[0].x as i64, raw[0].y as i64);
        let (xs1, ys1) = (raw[1].x as i64, raw[1].y as i64);
        let (xs2, ys2) = (raw[2].x as i64, raw[2].y as i64);

        let divider = (xs0 - xs2) * (ys1 - ys2) - (xs1 - xs2) * (ys0 - ys2);
        if divider == 0 {
            return Err(CalibrationError::Collinear);
        }

        let a = (xd0 - xd2) * (ys1 - ys2) - (xd1 - xd2) * (ys0 - ys2);
        let b = (xs0 - xs2) * (xd1 - xd2) - (xd0 - xd2) * (xs1 - xs2);
        let c = ys0 * (xs2 * xd1 - xs1 * xd2)
            + ys1 * (xs0 * xd2 - xs2 * xd0)
            + ys2 * (xs1 * xd0 - xs0 * xd1);

        let d = (yd0 - yd2) * (ys1 - ys2) - (yd1 - yd2) * (ys0 - ys2);
        let e = (xs0 - xs2) * (yd1 - yd2) - (yd0 - yd2) * (xs1 - xs2);
        let f = ys0 * (xs2 * yd1 - xs1 * yd2)
            + ys1 * (xs0 * yd2 - xs2 * yd0)
            + ys2 * (xs1 * yd0 - xs0 * yd1);

        let narrow = |v: i64| i32::try_from(v).map_err(|_| CalibrationError::Overflow);

        Ok(Self {
            a: narrow(a)?,
            b: narrow(b)?,
            c: narrow(c)?,
            d: narrow(d)?,
            e: narrow(e)?,
            f: narrow(f)?,
            divider: narrow(divider)?,
        })
    }

    /// Map a raw sample to display pixels. `None` when not calibrated.
    pub fn transform(&self, raw: RawSample) -> Option<DisplayPoint> {
        if !self.is_calibrated() {
            return None;
        }
        let (xs, ys) = (raw.x as i64, raw.y as i64);
        let divider = self.divider as i64;

        let x = (self.a as i64 * xs + self.b as i64 * ys + self.c as i64) / divider;
        let y = (self.d as i64 * xs + self.e as i64 * ys + self.f as i64) / divider;

        Some(DisplayPoint::new(saturate(x), saturate(y)))
    }

    /// Serialize for persistent storage
    pub fn to_bytes(&self) -> [u8; MATRIX_BYTES] {
        let mut out = [0u8; MATRIX_BYTES];
        let fields = [self.a, self.b, self.c, self.d, self.e, self.f, self.divider];
        for (chunk, v) in out.chunks_exact_mut(4).zip(fields.iter()) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; MATRIX_BYTES]) -> Self {
        let mut fields = [0i32; 7];
        for (v, chunk) in fields.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self {
            a: fields[0],
            b: fields[1],
            c: fields[2],
            d: fields[3],
            e: fields[4],
            f: fields[5],
            divider: fields[6],
        }
    }
}

pub(crate) fn saturate(v: i64) -> i16 {
    v.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}
