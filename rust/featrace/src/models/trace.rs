use nohash_hasher::IntMap;

use crate::models::DataPoint;
use crate::utils::TupleRange;

/// A trace under construction, owned exclusively by one builder.
///
/// Holds at most one data point per scan index. The derived statistics
/// (`center_mz`, m/z bounds, mean intensity) are recomputed after every
/// mutation so that the collision resolution in
/// [`keep_better_fitting_point`](BuildingTrace::keep_better_fitting_point)
/// always compares against the current centroid.
#[derive(Debug, Clone)]
pub struct BuildingTrace {
    // scan index -> (retention time in minutes, point)
    points: IntMap<usize, (f32, DataPoint)>,
    center_mz: f64,
    mean_intensity: f64,
    lowest_mz: f64,
    highest_mz: f64,
}

impl Default for BuildingTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildingTrace {
    pub fn new() -> Self {
        Self {
            points: IntMap::default(),
            center_mz: 0.0,
            mean_intensity: 0.0,
            lowest_mz: f64::MAX,
            highest_mz: f64::MIN,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Intensity-weighted mean m/z of the points currently in the trace.
    ///
    /// 0.0 only while the trace is empty; empty traces never leave the
    /// builder.
    pub fn center_mz(&self) -> f64 {
        self.center_mz
    }

    pub fn mean_intensity(&self) -> f64 {
        self.mean_intensity
    }

    /// Inserts only if the scan slot is unoccupied.
    ///
    /// Returns the pre-existing point (unchanged) if the slot is taken,
    /// `None` after a successful insert.
    pub fn try_to_add(&mut self, scan_index: usize, rt: f32, dp: DataPoint) -> Option<DataPoint> {
        if let Some((_, existing)) = self.points.get(&scan_index) {
            return Some(*existing);
        }
        self.points.insert(scan_index, (rt, dp));
        self.update_values();
        None
    }

    /// Unconditional overwrite of the scan slot; returns the displaced
    /// point, if any.
    pub fn replace(&mut self, scan_index: usize, rt: f32, dp: DataPoint) -> Option<DataPoint> {
        let previous = self.points.insert(scan_index, (rt, dp)).map(|(_, p)| p);
        self.update_values();
        previous
    }

    /// Inserts the candidate, resolving a collision in favor of the point
    /// closer to the trace's running center m/z.
    ///
    /// On an exact tie the incumbent stays. Returns the dropped point
    /// (either the displaced incumbent or the rejected candidate), or
    /// `None` when the slot was free.
    pub fn keep_better_fitting_point(
        &mut self,
        scan_index: usize,
        rt: f32,
        dp: DataPoint,
    ) -> Option<DataPoint> {
        let existing = self.try_to_add(scan_index, rt, dp)?;
        let existing_delta = (self.center_mz - existing.mz).abs();
        let candidate_delta = (self.center_mz - dp.mz).abs();
        if candidate_delta < existing_delta {
            self.replace(scan_index, rt, dp)
        } else {
            Some(dp)
        }
    }

    /// Recomputes `center_mz`, the m/z bounds and the mean intensity.
    ///
    /// A zero intensity sum leaves `center_mz` at its previous value
    /// instead of dividing by zero.
    fn update_values(&mut self) {
        let mut weighted_mz = 0.0;
        let mut total_intensity = 0.0;
        let mut lowest = f64::MAX;
        let mut highest = f64::MIN;
        for (_, dp) in self.points.values() {
            weighted_mz += dp.mz * dp.intensity;
            total_intensity += dp.intensity;
            lowest = lowest.min(dp.mz);
            highest = highest.max(dp.mz);
        }
        if total_intensity > 0.0 {
            self.center_mz = weighted_mz / total_intensity;
        }
        if !self.points.is_empty() {
            self.lowest_mz = lowest;
            self.highest_mz = highest;
            self.mean_intensity = total_intensity / self.points.len() as f64;
        }
    }

    /// Converts into the immutable representation consumed downstream.
    ///
    /// Returns `None` for an empty trace so that emptiness is never
    /// observable outside construction.
    pub fn finish(self) -> Option<Trace> {
        if self.points.is_empty() {
            return None;
        }
        let mut entries: Vec<TraceEntry> = self
            .points
            .into_iter()
            .map(|(scan_index, (retention_time, data_point))| TraceEntry {
                scan_index,
                retention_time,
                data_point,
            })
            .collect();
        entries.sort_by_key(|e| e.scan_index);
        Some(Trace {
            entries,
            center_mz: self.center_mz,
            lowest_mz: self.lowest_mz,
            highest_mz: self.highest_mz,
        })
    }
}

/// One `(scan, point)` pair of a finished trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceEntry {
    pub scan_index: usize,
    pub retention_time: f32,
    pub data_point: DataPoint,
}

/// A finished, immutable trace ordered by scan index.
#[derive(Debug, Clone)]
pub struct Trace {
    entries: Vec<TraceEntry>,
    center_mz: f64,
    lowest_mz: f64,
    highest_mz: f64,
}

impl Trace {
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn center_mz(&self) -> f64 {
        self.center_mz
    }

    pub fn mz_range(&self) -> TupleRange<f64> {
        (self.lowest_mz, self.highest_mz)
            .try_into()
            .expect("trace m/z bounds should be ordered")
    }

    /// Position-indexed intensity profile. Positions are adjacent even
    /// when the underlying scan indices have gaps.
    pub fn intensities(&self) -> Vec<f64> {
        self.entries
            .iter()
            .map(|e| e.data_point.intensity)
            .collect()
    }

    pub fn retention_times(&self) -> Vec<f32> {
        self.entries.iter().map(|e| e.retention_time).collect()
    }
}
