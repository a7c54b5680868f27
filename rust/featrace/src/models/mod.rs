pub mod datapoint;
pub mod feature;
pub mod mobilogram;
pub mod params;
pub mod trace;

pub use datapoint::{
    DataPoint,
    Scan,
};
pub use feature::{
    Feature,
    FeatureStatus,
    ResolvedPeak,
};
pub use mobilogram::Mobilogram;
pub use params::DetectionParams;
pub use trace::{
    BuildingTrace,
    Trace,
    TraceEntry,
};
