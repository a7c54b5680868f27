use crate::models::{
    BuildingTrace,
    DataPoint,
};

/// Dissimilarity between a trace's running center and a candidate point.
///
/// Candidates beyond the m/z tolerance score `f32::INFINITY`, so sorting
/// by score naturally ranks rejected candidates last.
#[derive(Debug, Clone, Copy)]
pub struct MatchScorer {
    mz_tolerance: f64,
}

impl MatchScorer {
    pub fn new(mz_tolerance: f64) -> Self {
        Self { mz_tolerance }
    }

    pub fn score(&self, trace: &BuildingTrace, candidate: &DataPoint) -> f32 {
        let mz_delta = trace.center_mz() - candidate.mz;
        if mz_delta.abs() > self.mz_tolerance {
            return f32::INFINITY;
        }
        let intensity_delta = trace.mean_intensity() - candidate.intensity;
        (mz_delta * mz_delta + intensity_delta * intensity_delta).sqrt() as f32
    }
}
