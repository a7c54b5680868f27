#![doc = include_str!("../README.md")]

// Re-export main structures
pub use crate::models::{
    BuildingTrace,
    DataPoint,
    DetectionParams,
    Feature,
    FeatureStatus,
    Mobilogram,
    ResolvedPeak,
    Scan,
    Trace,
    TraceEntry,
};

pub use crate::gap_filler::Gap;
pub use crate::mobility::IonMobilityTraceBuilder;
pub use crate::regression::RegressionFit;
pub use crate::scorer::MatchScorer;
pub use crate::trace_builder::TraceBuilder;
pub use crate::wavelet::WaveletPeakResolver;
pub use crate::worker::{
    detect_features,
    detect_features_parallel,
    CancellationToken,
    WorkerProgress,
};

// Declare modules
pub mod errors;
pub mod gap_filler;
pub mod mobility;
pub mod models;
pub mod regression;
pub mod scorer;
pub mod trace_builder;
pub mod utils;
pub mod wavelet;
pub mod worker;
pub use crate::utils::TupleRange;

// Re-export errors
pub use crate::errors::{
    ConfigError,
    DataProcessingError,
    FeatraceError,
};
