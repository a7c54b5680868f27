use crate::utils::TupleRange;
use serde::{
    Deserialize,
    Serialize,
};

/// A single centroided mass measurement.
///
/// Produced by the upstream mass detection step; immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub mz: f64,
    pub intensity: f64,
}

impl DataPoint {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

/// One instrument scan: an m/z-sorted collection of data points at a
/// fixed retention time.
///
/// Retention times are in minutes. Scans are owned by the raw-file
/// collaborator; trace construction only copies the points it consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub scan_number: usize,
    pub retention_time: f32,
    data_points: Vec<DataPoint>,
}

impl Scan {
    /// Sorts the points by m/z so that range queries can use binary search.
    pub fn new(scan_number: usize, retention_time: f32, mut data_points: Vec<DataPoint>) -> Self {
        data_points.sort_by(|a, b| {
            a.mz.partial_cmp(&b.mz)
                .expect("scan m/z values should not be NaN")
        });
        Self {
            scan_number,
            retention_time,
            data_points,
        }
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.data_points
    }

    pub fn is_empty(&self) -> bool {
        self.data_points.is_empty()
    }

    /// All points whose m/z falls inside the (inclusive) range.
    pub fn data_points_in(&self, mz_range: &TupleRange<f64>) -> &[DataPoint] {
        let lo = self
            .data_points
            .partition_point(|dp| dp.mz < mz_range.start());
        let hi = self
            .data_points
            .partition_point(|dp| dp.mz <= mz_range.end());
        &self.data_points[lo..hi]
    }

    /// The most intense point within the m/z range, if any.
    pub fn base_peak_in(&self, mz_range: &TupleRange<f64>) -> Option<DataPoint> {
        self.data_points_in(mz_range)
            .iter()
            .copied()
            .max_by(|a, b| {
                a.intensity
                    .partial_cmp(&b.intensity)
                    .expect("intensities should not be NaN")
            })
    }
}
