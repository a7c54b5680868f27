use serde::{
    Deserialize,
    Serialize,
};

use crate::models::Trace;
use crate::utils::{
    trapezoid_area_seconds,
    TupleRange,
};

/// Whether a feature was detected directly or synthesized by gap filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureStatus {
    Detected,
    Estimated,
}

/// One elution peak segmented out of a trace.
///
/// `start`/`end`/`apex` are positions into the trace's entry list, with
/// `end` exclusive. The derived values are frozen at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPeak {
    pub start: usize,
    pub end: usize,
    pub apex: usize,
    pub height: f64,
    pub area: f64,
    pub rt_range: TupleRange<f32>,
    pub mz_range: TupleRange<f64>,
}

impl ResolvedPeak {
    /// Builds a peak over the half-open region `[start, end)` of a trace.
    ///
    /// The apex is the position of maximum raw intensity in the region.
    /// Returns `None` for an empty or out-of-bounds region.
    pub fn from_region(trace: &Trace, start: usize, end: usize) -> Option<Self> {
        if start >= end || end > trace.len() {
            return None;
        }
        let entries = &trace.entries()[start..end];
        let (apex_offset, apex_entry) = entries
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.data_point
                    .intensity
                    .partial_cmp(&b.data_point.intensity)
                    .expect("intensities should not be NaN")
            })?;

        let rts: Vec<f32> = entries.iter().map(|e| e.retention_time).collect();
        let intensities: Vec<f64> = entries.iter().map(|e| e.data_point.intensity).collect();
        let area = trapezoid_area_seconds(&rts, &intensities);

        let mut lowest_mz = f64::MAX;
        let mut highest_mz = f64::MIN;
        for e in entries {
            lowest_mz = lowest_mz.min(e.data_point.mz);
            highest_mz = highest_mz.max(e.data_point.mz);
        }

        Some(Self {
            start,
            end,
            apex: start + apex_offset,
            height: apex_entry.data_point.intensity,
            area,
            rt_range: (rts[0], rts[rts.len() - 1])
                .try_into()
                .expect("trace retention times should be ordered"),
            mz_range: (lowest_mz, highest_mz)
                .try_into()
                .expect("region m/z bounds should be ordered"),
        })
    }

    /// Duration of the peak in minutes.
    pub fn duration(&self) -> f32 {
        self.rt_range.end() - self.rt_range.start()
    }
}

/// A feature-list row: the final output of detection or gap filling.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub mz: f64,
    pub rt: f32,
    pub height: f64,
    pub area: f64,
    pub rt_range: TupleRange<f32>,
    pub mz_range: TupleRange<f64>,
    pub representative_scan: usize,
    pub fragment_scan: Option<usize>,
    pub status: FeatureStatus,
}
