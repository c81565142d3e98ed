use core::fmt;

use crate::hx711::{RawSample, TareOffset};

/// Raw HX711 counts per gram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationFactor(i32);

impl CalibrationFactor {
    pub const fn new(counts_per_gram: i32) -> Self {
        Self(counts_per_gram)
    }

    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Divisor used during conversion, zero is replaced by one
    const fn divisor(&self) -> i64 {
        if self.0 == 0 {
            1
        } else {
            self.0 as i64
        }
    }
}

/// Weight in hundredths of a gram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Centigrams(i32);

impl Centigrams {
    pub const fn new(centigrams: i32) -> Self {
        Self(centigrams)
    }

    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Centigrams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{:02} g", sign, magnitude / 100, magnitude % 100)
    }
}

/// Convert a raw sample into centigrams relative to the tare offset.
///
/// `(raw - offset) * 100 / calibration`, computed in 64 bits with truncating
/// division and saturated to the `i32` range.
pub fn to_centigrams(
    raw: RawSample,
    offset: TareOffset,
    calibration: CalibrationFactor,
) -> Centigrams {
    let diff = raw.get() as i64 - offset.raw().get() as i64;
    let scaled = (diff * 100) / calibration.divisor();

    Centigrams(scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}
