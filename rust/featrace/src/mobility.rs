use tracing::trace;

use crate::models::Mobilogram;
use crate::models::Scan;
use crate::trace_builder::TraceBuilder;

/// Trace construction in the mobility dimension.
///
/// Same routing and collision contract as [`TraceBuilder`], but keyed by
/// mobility scan number within a single frame. Each frame is complete
/// when offered, so the resulting mobilograms freeze their statistics
/// once instead of recomputing per mutation.
#[derive(Debug, Clone, Copy)]
pub struct IonMobilityTraceBuilder {
    mz_tolerance: f64,
}

impl IonMobilityTraceBuilder {
    pub fn new(mz_tolerance: f64) -> Self {
        Self { mz_tolerance }
    }

    /// Builds one mobilogram per distinct species found in the frame.
    ///
    /// `sub_scans` are the frame's mobility sub-scans; their
    /// `scan_number` is the mobility scan number within the frame. They
    /// may arrive in any order.
    pub fn process_frame(&self, frame_id: usize, sub_scans: &[Scan]) -> Vec<Mobilogram> {
        let mut builder = TraceBuilder::new(self.mz_tolerance);
        for sub_scan in sub_scans {
            builder.process_scan(sub_scan.scan_number, sub_scan);
        }
        let mobilograms: Vec<Mobilogram> = builder
            .finish_all()
            .into_iter()
            .filter_map(|t| {
                let entries = t
                    .entries()
                    .iter()
                    .map(|e| (e.scan_index, e.data_point))
                    .collect();
                Mobilogram::new(frame_id, entries)
            })
            .collect();
        trace!(
            frame_id,
            mobilograms = mobilograms.len(),
            "built frame mobilograms"
        );
        mobilograms
    }
}
