use serde::{
    Deserialize,
    Serialize,
};

/// An inclusive `(start, end)` range where `start <= end` is enforced
/// at construction.
///
/// Convention: both endpoints are part of the range, so
/// `TupleRange::try_from((1.0, 1.0))` is a valid (degenerate) range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TupleRange<T> {
    start: T,
    end: T,
}

impl<T: PartialOrd + Copy> TupleRange<T> {
    pub fn start(&self) -> T {
        self.start
    }

    pub fn end(&self) -> T {
        self.end
    }

    pub fn contains(&self, value: T) -> bool {
        self.start <= value && value <= self.end
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InvalidRangeError;

impl<T: PartialOrd + Copy> TryFrom<(T, T)> for TupleRange<T> {
    type Error = InvalidRangeError;

    fn try_from(value: (T, T)) -> Result<Self, Self::Error> {
        if value.0 > value.1 {
            return Err(InvalidRangeError);
        }
        Ok(Self {
            start: value.0,
            end: value.1,
        })
    }
}

/// Quantile of the absolute values of a slice, with linear interpolation
/// between the two nearest order statistics.
///
/// `q` is clamped to `[0, 1]`. Returns 0.0 for an empty slice.
pub fn abs_quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("abs values should not be NaN"));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Trapezoidal integral of intensity over retention time.
///
/// Retention times are in minutes; the result is in intensity-seconds,
/// hence the x60 on each step.
pub fn trapezoid_area_seconds(rts_minutes: &[f32], intensities: &[f64]) -> f64 {
    debug_assert_eq!(rts_minutes.len(), intensities.len());
    let mut area = 0.0;
    for i in 1..rts_minutes.len().min(intensities.len()) {
        let dt = (rts_minutes[i] - rts_minutes[i - 1]) as f64 * 60.0;
        area += dt * (intensities[i] + intensities[i - 1]) / 2.0;
    }
    area
}
