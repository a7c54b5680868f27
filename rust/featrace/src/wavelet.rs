//! CWT peak deconvolution of a finished trace.
//!
//! Convolves the trace's intensity profile with a Mexican-hat kernel at
//! an automatically chosen scale, then segments the response with a
//! zero-crossing state machine. Positions are profile positions, not
//! absolute scan numbers; gaps in the trace are treated as adjacent.

use tracing::debug;

use crate::errors::ConfigError;
use crate::models::{
    DetectionParams,
    ResolvedPeak,
    Trace,
};
use crate::utils::abs_quantile;

// Effective support of the mother wavelet.
const SUPPORT_LEFT: f64 = -5.0;
const SUPPORT_RIGHT: f64 = 5.0;
const SUPPORT_WIDTH: usize = 10;

/// Scales at or above this bound abort the search for a better one.
const MAX_SCALE: usize = 100;

pub struct WaveletPeakResolver {
    params: DetectionParams,
    // Mexican hat sampled over [-5, 5].
    kernel: Vec<f64>,
}

impl WaveletPeakResolver {
    pub fn new(params: DetectionParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let n = params.wavelet_kernel_resolution * SUPPORT_WIDTH;
        let c = 2.0 / (3.0f64.sqrt() * std::f64::consts::PI.powf(0.25));
        let kernel = (0..n)
            .map(|i| {
                let x = SUPPORT_LEFT
                    + (SUPPORT_RIGHT - SUPPORT_LEFT) * i as f64 / (n - 1) as f64;
                c * (1.0 - x * x) * (-x * x / 2.0).exp()
            })
            .collect();
        Ok(Self { params, kernel })
    }

    /// Segments a trace into elution peaks. Never errors; a trace that
    /// cannot be decomposed yields an empty list.
    pub fn resolve(&self, trace: &Trace) -> Vec<ResolvedPeak> {
        let intensities = trace.intensities();
        if intensities.is_empty() {
            return Vec::new();
        }
        let max_intensity = intensities.iter().cloned().fold(f64::MIN, f64::max);
        let mean_intensity = intensities.iter().sum::<f64>() / intensities.len() as f64;
        // Flat or noisy profiles are rejected before any wavelet work.
        if mean_intensity > max_intensity * 0.5 {
            return Vec::new();
        }

        let (scale, wavelet) = self.effective_scale(&intensities, max_intensity);
        let threshold = abs_quantile(&wavelet, self.params.wavelet_threshold_quantile);
        let regions = segment(&wavelet, threshold);
        debug!(
            scale,
            threshold,
            regions = regions.len(),
            "segmented trace"
        );

        regions
            .into_iter()
            .filter_map(|(start, end)| ResolvedPeak::from_region(trace, start, end))
            .filter(|peak| {
                peak.duration() as f64 >= self.params.minimum_peak_duration
                    && peak.height >= self.params.minimum_peak_height
            })
            .collect()
    }

    /// Finds the effective scale: the first integer scale, starting at
    /// 2, whose response reaches the raw intensity maximum somewhere.
    /// Wider profiles need a larger scale before the kernel matches the
    /// bump width and the response peaks out.
    fn effective_scale(&self, intensities: &[f64], max_intensity: f64) -> (usize, Vec<f64>) {
        let mut scale = 2;
        loop {
            let wavelet = self.convolve(intensities, scale);
            if scale + 1 >= MAX_SCALE || wavelet.iter().any(|w| w.abs() >= max_intensity) {
                return (scale, wavelet);
            }
            scale += 1;
        }
    }

    /// One CWT pass at a fixed integer scale.
    ///
    /// Out-of-range taps are dropped, not zero-padded, which slightly
    /// biases the response near the edges; downstream expects exactly
    /// this behavior.
    fn convolve(&self, intensities: &[f64], scale: usize) -> Vec<f64> {
        let n = intensities.len();
        let klen = self.kernel.len() as i64;
        let center = klen / 2;
        // Samples of the kernel per unit of support.
        let density = klen / SUPPORT_WIDTH as i64;
        let radius = scale * SUPPORT_RIGHT as usize;
        let norm = (scale as f64).sqrt();

        let mut out = vec![0.0; n];
        for (dx, slot) in out.iter_mut().enumerate() {
            let t1 = dx.saturating_sub(radius);
            let t2 = (dx + radius).min(n - 1);
            let mut acc = 0.0;
            for i in t1..=t2 {
                let offset = (density * (i as i64 - dx as i64)).div_euclid(scale as i64);
                let ind = (center - offset).clamp(0, klen - 1) as usize;
                acc += intensities[i] * self.kernel[ind];
            }
            *slot = acc / norm;
        }
        out
    }
}

/// Zero-crossing segmentation state.
///
/// A region opens when the response crosses up into the central lobe and
/// closes at the next up-crossing, after the sign-change sequence of a
/// single bump. When that closing up-crossing is threshold-confirmed,
/// the adjacent region it opens is an overlap tail: it absorbs any
/// further bumps until a hard close, so a run of overlapping bumps is
/// split only at its first boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Rising { start: usize },
    Closing { start: usize },
    OverlapTail { start: usize },
}

impl State {
    fn start(&self) -> Option<usize> {
        match self {
            State::Idle => None,
            State::Rising { start } | State::Closing { start } | State::OverlapTail { start } => {
                Some(*start)
            }
        }
    }
}

/// Segments the wavelet response into candidate `[start, end)` regions.
///
/// A region is emitted only if some `|w[i]| > threshold` occurred inside
/// it; sub-threshold regions vanish silently. Adjacent regions share
/// their boundary index, they never enclose one another.
fn segment(wavelet: &[f64], threshold: f64) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut state = State::Idle;
    // Threshold seen since the last crossing / since it was opened.
    let mut passed = false;
    let mut region_passed = false;
    let n = wavelet.len();

    for i in 1..n {
        let prev = wavelet[i - 1];
        let cur = wavelet[i];
        let rising = prev < 0.0 && cur > 0.0;
        let falling = prev > 0.0 && cur < 0.0;

        if rising || falling {
            region_passed = region_passed || passed;
            state = match state {
                State::Idle if rising => {
                    region_passed = false;
                    State::Rising { start: i }
                }
                State::Rising { start } if falling => State::Closing { start },
                State::Closing { start } if rising => {
                    // Third crossing: the bump is complete. A confirmed
                    // region is emitted no matter what follows it.
                    if region_passed {
                        regions.push((start, i));
                    }
                    region_passed = false;
                    if passed {
                        State::OverlapTail { start: i }
                    } else {
                        State::Rising { start: i }
                    }
                }
                // An overlap tail merges everything up to a hard close.
                other => other,
            };
            passed = false;
        }

        if wavelet[i].abs() > threshold {
            passed = true;
        }

        // Exact zero on both sides closes the region immediately.
        if wavelet[i] == 0.0 && wavelet[i - 1] == 0.0 {
            if let Some(start) = state.start() {
                region_passed = region_passed || passed;
                if region_passed {
                    regions.push((start, i));
                }
                state = State::Idle;
                passed = false;
                region_passed = false;
            }
        }
    }

    if let Some(start) = state.start() {
        region_passed = region_passed || passed;
        if region_passed {
            regions.push((start, n));
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BuildingTrace,
        DataPoint,
    };

    fn trace_from(intensities: &[f64]) -> Trace {
        let mut trace = BuildingTrace::new();
        for (i, intensity) in intensities.iter().enumerate() {
            trace.try_to_add(i, i as f32 * 0.1, DataPoint::new(500.0, *intensity));
        }
        trace.finish().unwrap()
    }

    fn resolver(quantile: f64) -> WaveletPeakResolver {
        let params = DetectionParams {
            wavelet_threshold_quantile: quantile,
            minimum_peak_height: 0.0,
            minimum_peak_duration: 0.0,
            ..DetectionParams::default()
        };
        WaveletPeakResolver::new(params).unwrap()
    }

    #[test]
    fn test_single_gaussian_resolves_to_one_peak() {
        let intensities: Vec<f64> = (0..15)
            .map(|i| 100.0 * (-((i as f64 - 7.0).powi(2)) / 8.0).exp())
            .collect();
        let trace = trace_from(&intensities);
        let peaks = resolver(0.5).resolve(&trace);
        assert_eq!(peaks.len(), 1, "peaks: {:?}", peaks);
        assert_eq!(peaks[0].apex, 7);
        assert_eq!(peaks[0].height, 100.0);
    }

    #[test]
    fn test_overlapping_bumps_are_split() {
        let intensities: Vec<f64> = (0..20)
            .map(|i| {
                let i = i as f64;
                100.0 * (-((i - 6.0).powi(2)) / 4.0).exp()
                    + 80.0 * (-((i - 13.0).powi(2)) / 4.0).exp()
            })
            .collect();
        let trace = trace_from(&intensities);
        let peaks = resolver(0.5).resolve(&trace);
        assert_eq!(peaks.len(), 2, "peaks: {:?}", peaks);
        assert_eq!(peaks[0].apex, 6);
        assert_eq!(peaks[1].apex, 13);
        // Adjacent split: the first region ends where the second opens,
        // so neither region encloses the other bump's apex.
        assert_eq!(peaks[0].end, peaks[1].start);
        assert!(peaks[0].end <= peaks[1].apex);
    }

    #[test]
    fn test_three_bumps_split_only_once() {
        // Three overlapping bumps: only the first boundary splits, the
        // last two bumps share a region.
        let intensities: Vec<f64> = (0..27)
            .map(|i| {
                let i = i as f64;
                100.0 * (-((i - 6.0).powi(2)) / 4.0).exp()
                    + 80.0 * (-((i - 13.0).powi(2)) / 4.0).exp()
                    + 90.0 * (-((i - 20.0).powi(2)) / 4.0).exp()
            })
            .collect();
        let trace = trace_from(&intensities);
        let peaks = resolver(0.5).resolve(&trace);
        assert_eq!(peaks.len(), 2, "peaks: {:?}", peaks);
        assert_eq!(peaks[0].apex, 6);
        assert_eq!(peaks[1].apex, 20);
        assert_eq!(peaks[0].end, peaks[1].start);
    }

    #[test]
    fn test_wide_peak_increases_scale() {
        // A wide bump under-responds at scale 2; the search must keep
        // stretching the kernel until the response reaches the raw
        // maximum somewhere.
        let intensities: Vec<f64> = (0..120)
            .map(|i| 100.0 * (-((i as f64 - 60.0).powi(2)) / (2.0 * 144.0)).exp())
            .collect();
        let r = resolver(0.5);
        let (scale, wavelet) = r.effective_scale(&intensities, 100.0);
        assert!(scale > 2, "scale stuck at {}", scale);
        assert!(wavelet.iter().any(|w| w.abs() >= 100.0));

        let trace = trace_from(&intensities);
        let peaks = r.resolve(&trace);
        assert_eq!(peaks.len(), 1, "peaks: {:?}", peaks);
        assert_eq!(peaks[0].apex, 60);
    }

    #[test]
    fn test_flat_trace_yields_no_peaks() {
        let trace = trace_from(&[10.0; 12]);
        assert!(resolver(0.5).resolve(&trace).is_empty());
    }

    #[test]
    fn test_min_height_filter() {
        let intensities: Vec<f64> = (0..15)
            .map(|i| 100.0 * (-((i as f64 - 7.0).powi(2)) / 8.0).exp())
            .collect();
        let trace = trace_from(&intensities);
        let params = DetectionParams {
            wavelet_threshold_quantile: 0.5,
            minimum_peak_height: 150.0,
            minimum_peak_duration: 0.0,
            ..DetectionParams::default()
        };
        let peaks = WaveletPeakResolver::new(params).unwrap().resolve(&trace);
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_min_duration_filter() {
        let intensities: Vec<f64> = (0..15)
            .map(|i| 100.0 * (-((i as f64 - 7.0).powi(2)) / 8.0).exp())
            .collect();
        let trace = trace_from(&intensities);
        let params = DetectionParams {
            wavelet_threshold_quantile: 0.5,
            minimum_peak_height: 0.0,
            // Region spans positions 5..15 at 0.1 min steps, so 0.9 min.
            minimum_peak_duration: 2.0,
            ..DetectionParams::default()
        };
        let peaks = WaveletPeakResolver::new(params).unwrap().resolve(&trace);
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = DetectionParams {
            wavelet_kernel_resolution: 0,
            ..DetectionParams::default()
        };
        assert!(WaveletPeakResolver::new(params).is_err());
    }

    #[test]
    fn test_sub_threshold_regions_discarded() {
        let wavelet = [-0.1, 0.2, 0.1, -0.2, 0.1, 0.2, -0.1];
        assert!(segment(&wavelet, 10.0).is_empty());
    }

    #[test]
    fn test_confirmed_region_survives_trailing_wiggle() {
        // A sub-threshold up-crossing after a confirmed bump must not
        // discard the bump.
        let wavelet = [-1.0, 10.0, -1.0, -0.1, 0.1, 0.1];
        assert_eq!(segment(&wavelet, 2.0), vec![(1, 4)]);
    }

    #[test]
    fn test_overlap_tail_survives_double_zero() {
        // Hard close while in the overlap tail: both regions come out.
        let wavelet = [-1.0, 5.0, -2.0, 5.0, 0.0, 0.0];
        assert_eq!(segment(&wavelet, 1.5), vec![(1, 3), (3, 5)]);
    }

    #[test]
    fn test_double_zero_closes_region() {
        let wavelet = [-1.0, 5.0, 5.0, 0.0, 0.0, 3.0, 1.0];
        let regions = segment(&wavelet, 2.0);
        assert_eq!(regions, vec![(1, 4)]);
    }
}
