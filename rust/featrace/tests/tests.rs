use featrace::{
    detect_features,
    detect_features_parallel,
    CancellationToken,
    DataPoint,
    DetectionParams,
    FeatureStatus,
    Gap,
    Scan,
    WorkerProgress,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn gaussian(i: usize, apex: f64, height: f64, width: f64) -> f64 {
    height * (-((i as f64 - apex).powi(2)) / width).exp()
}

fn test_params() -> DetectionParams {
    DetectionParams {
        mz_tolerance: 0.01,
        wavelet_threshold_quantile: 0.5,
        minimum_peak_height: 0.0,
        minimum_peak_duration: 0.0,
        ..DetectionParams::default()
    }
}

/// Two species eluting in the same file, one of them as two overlapping
/// bumps, end to end through trace building and wavelet resolution.
#[test]
fn test_end_to_end_detection() {
    init_tracing();
    let scans: Vec<Scan> = (0..20)
        .map(|i| {
            let mut points = Vec::new();
            // Species A: two overlapping bumps at positions 6 and 13.
            let a = gaussian(i, 6.0, 1000.0, 4.0) + gaussian(i, 13.0, 800.0, 4.0);
            points.push(DataPoint::new(500.0, a));
            // Species B: a single bump at position 10.
            points.push(DataPoint::new(610.0, gaussian(i, 10.0, 500.0, 8.0)));
            Scan::new(i, i as f32 * 0.05, points)
        })
        .collect();

    let progress = WorkerProgress::new();
    let cancel = CancellationToken::new();
    let features = detect_features(&scans, &test_params(), &progress, &cancel)
        .unwrap()
        .unwrap();

    let at_500: Vec<_> = features.iter().filter(|f| f.mz < 550.0).collect();
    let at_610: Vec<_> = features.iter().filter(|f| f.mz > 550.0).collect();
    assert_eq!(at_500.len(), 2, "features: {:?}", features);
    assert_eq!(at_610.len(), 1, "features: {:?}", features);

    assert_eq!(at_500[0].representative_scan, 6);
    assert_eq!(at_500[1].representative_scan, 13);
    assert_eq!(at_610[0].representative_scan, 10);
    assert!(features
        .iter()
        .all(|f| f.status == FeatureStatus::Detected));
    assert_eq!(progress.fraction(), 1.0);
}

#[test]
fn test_detection_then_gap_fill() {
    init_tracing();
    // File 1 contains the species; file 2 misses it at low abundance.
    let file1: Vec<Scan> = (0..15)
        .map(|i| {
            Scan::new(
                i,
                i as f32 * 0.1,
                vec![DataPoint::new(500.0, gaussian(i, 7.0, 1000.0, 8.0))],
            )
        })
        .collect();
    let file2: Vec<Scan> = (0..15)
        .map(|i| {
            Scan::new(
                i,
                i as f32 * 0.1,
                vec![DataPoint::new(500.001, gaussian(i, 8.0, 40.0, 8.0))],
            )
        })
        .collect();

    let params = DetectionParams {
        minimum_peak_height: 100.0,
        ..test_params()
    };
    let cancel = CancellationToken::new();
    let per_file = detect_features_parallel(&[file1.clone(), file2.clone()], &params, &cancel)
        .unwrap()
        .unwrap();
    assert_eq!(per_file[0].len(), 1);
    assert!(per_file[1].is_empty(), "below the height threshold");

    // Gap-fill file 2 using file 1's detected window.
    let detected = &per_file[0][0];
    let mut gap = Gap::new(
        (detected.mz - 0.01, detected.mz + 0.01).try_into().unwrap(),
        (
            detected.rt_range.start() - 0.2,
            detected.rt_range.end() + 0.2,
        )
            .try_into()
            .unwrap(),
        0.3,
    );
    for scan in &file2 {
        gap.offer_next_scan(scan);
    }
    let estimated = gap.no_more_offers(|_, _| None).unwrap();
    assert_eq!(estimated.status, FeatureStatus::Estimated);
    assert_eq!(estimated.height, 40.0);
    assert_eq!(estimated.representative_scan, 8);
    assert!(estimated.area > 0.0);
}

#[test]
fn test_cancelled_run_publishes_nothing() {
    let scans: Vec<Scan> = (0..15)
        .map(|i| {
            Scan::new(
                i,
                i as f32 * 0.1,
                vec![DataPoint::new(500.0, gaussian(i, 7.0, 1000.0, 8.0))],
            )
        })
        .collect();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let outcome = detect_features_parallel(&[scans], &test_params(), &cancel).unwrap();
    assert!(outcome.is_none());
}

#[test]
fn test_params_from_json_config() {
    let text = r#"{
        "mz_tolerance": 0.02,
        "intensity_tolerance": 0.3,
        "minimum_peak_height": 250.0
    }"#;
    let params: DetectionParams = serde_json::from_str(text).unwrap();
    params.validate().unwrap();
    assert_eq!(params.mz_tolerance, 0.02);
    assert_eq!(params.minimum_peak_height, 250.0);
    // Unspecified fields keep their defaults.
    assert_eq!(
        params.wavelet_threshold_quantile,
        DetectionParams::default().wavelet_threshold_quantile
    );
}
