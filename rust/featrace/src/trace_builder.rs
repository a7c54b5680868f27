//! Online trace construction across retention-time scans.
//!
//! Each trace owns a fixed, non-overlapping m/z key range assigned when
//! the trace is created. Candidate points are routed to the trace whose
//! key range contains their m/z; the key ranges never move afterwards,
//! only the trace's centroid does. Points displaced by collision
//! resolution accumulate as leftovers and get one supplemental building
//! pass at the end.

use tracing::debug;

use crate::models::{
    BuildingTrace,
    DataPoint,
    Scan,
    Trace,
};
use crate::scorer::MatchScorer;
use crate::utils::TupleRange;

/// Leftovers below this count are discarded instead of rebuilt.
const LEFTOVER_REBUILD_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Copy)]
struct Leftover {
    scan_index: usize,
    retention_time: f32,
    data_point: DataPoint,
}

#[derive(Debug)]
struct TraceSlot {
    key_range: TupleRange<f64>,
    trace: BuildingTrace,
}

/// Set of in-progress traces for one raw file.
///
/// Scans must be offered in retention-time order so centroid
/// drift-correction sees a consistent history.
#[derive(Debug)]
pub struct TraceBuilder {
    // Sorted by key_range start, ranges pairwise non-overlapping.
    slots: Vec<TraceSlot>,
    leftovers: Vec<Leftover>,
    mz_tolerance: f64,
    scorer: MatchScorer,
}

impl TraceBuilder {
    pub fn new(mz_tolerance: f64) -> Self {
        Self {
            slots: Vec::new(),
            leftovers: Vec::new(),
            mz_tolerance,
            scorer: MatchScorer::new(mz_tolerance),
        }
    }

    pub fn num_traces(&self) -> usize {
        self.slots.len()
    }

    /// Folds one scan into the trace set.
    ///
    /// Points are processed in descending intensity order so that the
    /// strongest signals claim their key ranges first.
    pub fn process_scan(&mut self, scan_index: usize, scan: &Scan) {
        let mut points: Vec<DataPoint> = scan.data_points().to_vec();
        points.sort_by(|a, b| {
            b.intensity
                .partial_cmp(&a.intensity)
                .expect("intensities should not be NaN")
        });
        for dp in points {
            if let Some(dropped) = offer_point(
                &mut self.slots,
                &self.scorer,
                self.mz_tolerance,
                scan_index,
                scan.retention_time,
                dp,
            ) {
                self.leftovers.push(Leftover {
                    scan_index,
                    retention_time: scan.retention_time,
                    data_point: dropped,
                });
            }
        }
    }

    /// Finishes all traces, running the supplemental leftover pass first.
    ///
    /// Empty traces are dropped. The returned traces are in ascending
    /// key-range order.
    pub fn finish_all(mut self) -> Vec<Trace> {
        debug!(
            traces = self.slots.len(),
            leftovers = self.leftovers.len(),
            "finishing trace set"
        );
        if self.leftovers.len() >= LEFTOVER_REBUILD_THRESHOLD {
            let mut rebuilt: Vec<TraceSlot> = Vec::new();
            let mut leftovers = std::mem::take(&mut self.leftovers);
            leftovers.sort_by(|a, b| {
                b.data_point
                    .intensity
                    .partial_cmp(&a.data_point.intensity)
                    .expect("intensities should not be NaN")
            });
            // Single pass only: points displaced here are discarded.
            for leftover in leftovers {
                offer_point(
                    &mut rebuilt,
                    &self.scorer,
                    self.mz_tolerance,
                    leftover.scan_index,
                    leftover.retention_time,
                    leftover.data_point,
                );
            }
            self.slots.extend(rebuilt);
            self.slots.sort_by(|a, b| {
                a.key_range
                    .start()
                    .partial_cmp(&b.key_range.start())
                    .expect("key range bounds should not be NaN")
            });
        }
        self.slots
            .into_iter()
            .filter_map(|slot| slot.trace.finish())
            .collect()
    }
}

/// Routes one point into the slot list, creating a new trace when no key
/// range contains it. Returns the displaced point on collision, or the
/// point itself when the scorer rejects it against the trace's center.
fn offer_point(
    slots: &mut Vec<TraceSlot>,
    scorer: &MatchScorer,
    mz_tolerance: f64,
    scan_index: usize,
    retention_time: f32,
    dp: DataPoint,
) -> Option<DataPoint> {
    // Rightmost slot whose range starts at or below the point.
    let pos = slots.partition_point(|slot| slot.key_range.start() <= dp.mz);
    if pos > 0 && slots[pos - 1].key_range.contains(dp.mz) {
        let slot = &mut slots[pos - 1];
        // The key range is fixed but the centroid drifts; a candidate
        // the centroid has moved away from is not folded in.
        if scorer.score(&slot.trace, &dp).is_infinite() {
            return Some(dp);
        }
        return slot
            .trace
            .keep_better_fitting_point(scan_index, retention_time, dp);
    }

    // New trace: tolerance window around the point, clipped against the
    // neighboring key ranges so ranges stay non-overlapping.
    let mut start = dp.mz - mz_tolerance;
    let mut end = dp.mz + mz_tolerance;
    if pos > 0 {
        start = start.max(slots[pos - 1].key_range.end());
    }
    if pos < slots.len() {
        end = end.min(slots[pos].key_range.start());
    }
    let key_range = (start, end)
        .try_into()
        .expect("clipped key range should stay ordered around its point");
    let mut trace = BuildingTrace::new();
    trace.try_to_add(scan_index, retention_time, dp);
    slots.insert(pos, TraceSlot { key_range, trace });
    None
}
