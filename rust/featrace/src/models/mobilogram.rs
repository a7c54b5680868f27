use crate::models::DataPoint;

/// A trace over mobility sub-scans within one frame.
///
/// Unlike a retention-time trace, a mobilogram is built from a complete
/// frame, so `summed_intensity` and `avg_mz` are computed once at
/// construction instead of per mutation.
#[derive(Debug, Clone)]
pub struct Mobilogram {
    pub frame_id: usize,
    // (mobility scan number within the frame, point), ordered by scan number
    entries: Vec<(usize, DataPoint)>,
    summed_intensity: f64,
    avg_mz: f64,
}

impl Mobilogram {
    /// Returns `None` for an empty sub-series.
    pub fn new(frame_id: usize, mut entries: Vec<(usize, DataPoint)>) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        entries.sort_by_key(|(scan, _)| *scan);
        let summed_intensity: f64 = entries.iter().map(|(_, dp)| dp.intensity).sum();
        let avg_mz = if summed_intensity > 0.0 {
            entries
                .iter()
                .map(|(_, dp)| dp.mz * dp.intensity)
                .sum::<f64>()
                / summed_intensity
        } else {
            // All-zero frame: fall back to the unweighted mean.
            entries.iter().map(|(_, dp)| dp.mz).sum::<f64>() / entries.len() as f64
        };
        Some(Self {
            frame_id,
            entries,
            summed_intensity,
            avg_mz,
        })
    }

    pub fn entries(&self) -> &[(usize, DataPoint)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summed_intensity(&self) -> f64 {
        self.summed_intensity
    }

    pub fn avg_mz(&self) -> f64 {
        self.avg_mz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_computed_once() {
        let mob = Mobilogram::new(
            42,
            vec![
                (3, DataPoint::new(500.2, 10.0)),
                (1, DataPoint::new(500.0, 30.0)),
                (2, DataPoint::new(500.1, 60.0)),
            ],
        )
        .unwrap();
        assert_eq!(mob.frame_id, 42);
        assert_eq!(mob.summed_intensity(), 100.0);
        let expected = (500.2 * 10.0 + 500.0 * 30.0 + 500.1 * 60.0) / 100.0;
        assert!((mob.avg_mz() - expected).abs() < 1e-12);
        // Ordered by mobility scan number.
        let scans: Vec<usize> = mob.entries().iter().map(|(s, _)| *s).collect();
        assert_eq!(scans, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_frame_yields_none() {
        assert!(Mobilogram::new(0, vec![]).is_none());
    }

    #[test]
    fn test_zero_intensity_frame_uses_plain_mean() {
        let mob = Mobilogram::new(
            1,
            vec![(0, DataPoint::new(500.0, 0.0)), (1, DataPoint::new(502.0, 0.0))],
        )
        .unwrap();
        assert_eq!(mob.avg_mz(), 501.0);
    }
}
