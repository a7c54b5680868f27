//! Per-file detection workers.
//!
//! One worker owns one raw file's scans end to end; files are fully
//! independent, so the multi-file driver is a plain rayon parallel map
//! with no shared mutable state. Progress is a single-writer pair of
//! atomics and cancellation is a cooperative flag checked once per scan.

use std::sync::atomic::{
    AtomicBool,
    AtomicUsize,
    Ordering,
};

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use tracing::{
    debug,
    info,
};

use crate::errors::FeatraceError;
use crate::models::{
    DetectionParams,
    Feature,
    FeatureStatus,
    Scan,
};
use crate::trace_builder::TraceBuilder;
use crate::wavelet::WaveletPeakResolver;

/// Scan-level progress of one worker. Written by the worker only; safe
/// for concurrent reads by the scheduler.
#[derive(Debug, Default)]
pub struct WorkerProgress {
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl WorkerProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fraction(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.processed.load(Ordering::Relaxed) as f64 / total as f64
    }

    fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
    }

    fn tick(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cooperative cancellation flag shared between the scheduler and any
/// number of workers.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Runs detection over one raw file's scans, in retention-time order.
///
/// Returns `Ok(None)` on cancellation; partially built traces are
/// discarded, never published. The cancellation flag is checked at the
/// top of each scan iteration, not mid-convolution.
pub fn detect_features(
    scans: &[Scan],
    params: &DetectionParams,
    progress: &WorkerProgress,
    cancel: &CancellationToken,
) -> Result<Option<Vec<Feature>>, FeatraceError> {
    let resolver = WaveletPeakResolver::new(*params)?;
    progress.start(scans.len());

    let mut builder = TraceBuilder::new(params.mz_tolerance);
    for scan in scans {
        if cancel.is_cancelled() {
            debug!("detection cancelled, discarding partial traces");
            return Ok(None);
        }
        builder.process_scan(scan.scan_number, scan);
        progress.tick();
    }

    let traces = builder.finish_all();
    debug!(traces = traces.len(), "built traces");

    let mut features = Vec::new();
    for trace in &traces {
        for peak in resolver.resolve(trace) {
            let apex_entry = trace.entries()[peak.apex];
            features.push(Feature {
                mz: trace.center_mz(),
                rt: apex_entry.retention_time,
                height: peak.height,
                area: peak.area,
                rt_range: peak.rt_range,
                mz_range: peak.mz_range,
                representative_scan: apex_entry.scan_index,
                fragment_scan: None,
                status: FeatureStatus::Detected,
            });
        }
    }
    debug!(features = features.len(), "resolved features");
    Ok(Some(features))
}

/// Detects features across raw files in parallel, one worker per file.
///
/// Returns `Ok(None)` if the token was cancelled while any file was
/// still in flight.
pub fn detect_features_parallel(
    files: &[Vec<Scan>],
    params: &DetectionParams,
    cancel: &CancellationToken,
) -> Result<Option<Vec<Vec<Feature>>>, FeatraceError> {
    info!(files = files.len(), "starting parallel detection");
    let per_file: Result<Vec<Option<Vec<Feature>>>, FeatraceError> = files
        .par_iter()
        .progress_count(files.len() as u64)
        .map(|scans| {
            let progress = WorkerProgress::new();
            detect_features(scans, params, &progress, cancel)
        })
        .collect();
    Ok(per_file?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataPoint;

    fn gaussian_file() -> Vec<Scan> {
        (0..15)
            .map(|i| {
                let intensity = 1000.0 * (-((i as f64 - 7.0).powi(2)) / 8.0).exp();
                Scan::new(
                    i,
                    i as f32 * 0.1,
                    vec![DataPoint::new(500.0, intensity)],
                )
            })
            .collect()
    }

    fn params() -> DetectionParams {
        DetectionParams {
            wavelet_threshold_quantile: 0.5,
            minimum_peak_height: 0.0,
            minimum_peak_duration: 0.0,
            ..DetectionParams::default()
        }
    }

    #[test]
    fn test_detects_single_feature() {
        let scans = gaussian_file();
        let progress = WorkerProgress::new();
        let cancel = CancellationToken::new();
        let features = detect_features(&scans, &params(), &progress, &cancel)
            .unwrap()
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].status, FeatureStatus::Detected);
        assert_eq!(features[0].height, 1000.0);
        assert_eq!(features[0].representative_scan, 7);
        assert_eq!(progress.fraction(), 1.0);
    }

    #[test]
    fn test_cancellation_discards_partial_results() {
        let scans = gaussian_file();
        let progress = WorkerProgress::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = detect_features(&scans, &params(), &progress, &cancel).unwrap();
        assert!(outcome.is_none());
        assert_eq!(progress.fraction(), 0.0);
    }

    #[test]
    fn test_parallel_driver_keeps_file_order() {
        let files = vec![gaussian_file(), Vec::new(), gaussian_file()];
        let cancel = CancellationToken::new();
        let per_file = detect_features_parallel(&files, &params(), &cancel)
            .unwrap()
            .unwrap();
        assert_eq!(per_file.len(), 3);
        assert_eq!(per_file[0].len(), 1);
        assert!(per_file[1].is_empty());
        assert_eq!(per_file[2].len(), 1);
    }

    #[test]
    fn test_invalid_params_error_propagates() {
        let params = DetectionParams {
            wavelet_kernel_resolution: 0,
            ..DetectionParams::default()
        };
        let progress = WorkerProgress::new();
        let cancel = CancellationToken::new();
        assert!(detect_features(&[], &params, &progress, &cancel).is_err());
    }

    #[test]
    fn test_progress_fraction_before_start() {
        assert_eq!(WorkerProgress::new().fraction(), 0.0);
    }
}
