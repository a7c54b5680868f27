//! Post-hoc recovery of features missed by direct detection.
//!
//! A `Gap` is the search state for one (feature row, raw file) pair: a
//! target m/z and retention-time window where other files say a peak
//! should be. Scans are replayed through it in retention-time order and
//! at most one synthetic feature comes out.

use tracing::trace;

use crate::models::{
    DataPoint,
    Feature,
    FeatureStatus,
    Scan,
};
use crate::utils::{
    trapezoid_area_seconds,
    TupleRange,
};

#[derive(Debug, Clone, Copy)]
struct GapPoint {
    scan_number: usize,
    retention_time: f32,
    data_point: DataPoint,
}

#[derive(Debug, Clone)]
struct PeakCandidate {
    // Trimmed to the elution window found by the shoulder walk.
    points: Vec<GapPoint>,
    // Index of the apex within `points`.
    apex: usize,
}

impl PeakCandidate {
    fn height(&self) -> f64 {
        self.points[self.apex].data_point.intensity
    }
}

/// Search state for one missing feature cell.
///
/// Drive with [`offer_next_scan`](Gap::offer_next_scan) once per scan in
/// increasing retention-time order, then finalize once with
/// [`no_more_offers`](Gap::no_more_offers). Most gaps produce nothing;
/// that is the expected outcome, not a failure.
#[derive(Debug, Clone)]
pub struct Gap {
    mz_range: TupleRange<f64>,
    rt_range: TupleRange<f32>,
    intensity_tolerance: f64,
    current: Vec<GapPoint>,
    best: Option<PeakCandidate>,
}

impl Gap {
    pub fn new(
        mz_range: TupleRange<f64>,
        rt_range: TupleRange<f32>,
        intensity_tolerance: f64,
    ) -> Self {
        Self {
            mz_range,
            rt_range,
            intensity_tolerance,
            current: Vec::new(),
            best: None,
        }
    }

    pub fn offer_next_scan(&mut self, scan: &Scan) {
        let rt = scan.retention_time;
        if self.current.is_empty() {
            // Not yet inside the window, or already past it.
            if !self.rt_range.contains(rt) {
                return;
            }
        }

        // Base peak in the target m/z window; if the scan has none, a
        // zero-intensity point at the window midpoint keeps the
        // candidate gapless.
        let data_point = scan.base_peak_in(&self.mz_range).unwrap_or_else(|| {
            DataPoint::new((self.mz_range.start() + self.mz_range.end()) / 2.0, 0.0)
        });
        let point = GapPoint {
            scan_number: scan.scan_number,
            retention_time: rt,
            data_point,
        };

        if self.current.is_empty() || self.check_rt_shape(&point) {
            self.current.push(point);
        } else {
            self.check_current_peak();
            self.current.push(point);
        }
    }

    /// Finalizes the gap, evaluating any still-open candidate.
    ///
    /// `fragment_lookup` resolves the best fragmentation scan within the
    /// found feature's m/z and retention-time window; the raw-data
    /// collaborator owns that index.
    pub fn no_more_offers(
        mut self,
        fragment_lookup: impl FnOnce(&TupleRange<f64>, &TupleRange<f32>) -> Option<usize>,
    ) -> Option<Feature> {
        self.check_current_peak();
        let best = self.best?;

        let apex = best.points[best.apex];
        let rts: Vec<f32> = best.points.iter().map(|p| p.retention_time).collect();
        let intensities: Vec<f64> = best
            .points
            .iter()
            .map(|p| p.data_point.intensity)
            .collect();
        let area = trapezoid_area_seconds(&rts, &intensities);

        let mut lowest_mz = f64::MAX;
        let mut highest_mz = f64::MIN;
        for p in &best.points {
            lowest_mz = lowest_mz.min(p.data_point.mz);
            highest_mz = highest_mz.max(p.data_point.mz);
        }
        let mz_range: TupleRange<f64> = (lowest_mz, highest_mz)
            .try_into()
            .expect("candidate m/z bounds should be ordered");
        let rt_range: TupleRange<f32> = (rts[0], rts[rts.len() - 1])
            .try_into()
            .expect("candidate retention times should be ordered");
        let fragment_scan = fragment_lookup(&mz_range, &rt_range);
        trace!(
            mz = apex.data_point.mz,
            rt = apex.retention_time,
            "gap filled"
        );

        Some(Feature {
            mz: apex.data_point.mz,
            rt: apex.retention_time,
            height: apex.data_point.intensity,
            area,
            rt_range,
            mz_range,
            representative_scan: apex.scan_number,
            fragment_scan,
            status: FeatureStatus::Estimated,
        })
    }

    /// Whether a point continues the current candidate: inside the
    /// window, still rising toward it, or still falling away from it.
    fn check_rt_shape(&self, point: &GapPoint) -> bool {
        let rt = point.retention_time;
        if self.rt_range.contains(rt) {
            return true;
        }
        let prev = self
            .current
            .last()
            .map(|p| p.data_point.intensity)
            .unwrap_or(0.0);
        if rt < self.rt_range.start() {
            point.data_point.intensity > prev * (1.0 - self.intensity_tolerance)
        } else {
            point.data_point.intensity < prev * (1.0 + self.intensity_tolerance)
        }
    }

    /// Evaluates and clears the current candidate.
    ///
    /// Finds the highest strictly-interior local maximum whose retention
    /// time falls in the window, walks outward along the elution
    /// shoulders, and stores the trimmed candidate if its apex is taller
    /// than the best so far.
    fn check_current_peak(&mut self) {
        let points = std::mem::take(&mut self.current);
        if points.len() < 3 {
            return;
        }

        let mut apex: Option<usize> = None;
        for i in 1..points.len() - 1 {
            if !self.rt_range.contains(points[i].retention_time) {
                continue;
            }
            let intensity = points[i].data_point.intensity;
            if intensity < points[i - 1].data_point.intensity
                || intensity < points[i + 1].data_point.intensity
            {
                continue;
            }
            if apex.is_none_or(|a| intensity > points[a].data_point.intensity) {
                apex = Some(i);
            }
        }
        let Some(apex) = apex else {
            return;
        };

        // Shoulder walk: each outward step may not exceed the previous
        // one by more than the tolerance factor.
        let bound = 1.0 + self.intensity_tolerance;
        let mut start = apex;
        while start > 0
            && points[start - 1].data_point.intensity
                <= points[start].data_point.intensity * bound
        {
            start -= 1;
        }
        let mut end = apex;
        while end + 1 < points.len()
            && points[end + 1].data_point.intensity
                <= points[end].data_point.intensity * bound
        {
            end += 1;
        }

        let height = points[apex].data_point.intensity;
        if self.best.as_ref().is_none_or(|b| height > b.height()) {
            self.best = Some(PeakCandidate {
                apex: apex - start,
                points: points[start..=end].to_vec(),
            });
        }
    }
}
