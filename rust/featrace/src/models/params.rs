use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::ConfigError;

/// Detection parameters supplied by the outer parameter layer.
///
/// All fields are plain numbers so the struct round-trips through json
/// config files unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    /// Max |trace center - candidate| m/z distance for a match.
    pub mz_tolerance: f64,
    /// Relative intensity tolerance for shoulder walking, in [0, 1).
    pub intensity_tolerance: f64,
    pub minimum_peak_height: f64,
    /// Minutes.
    pub minimum_peak_duration: f64,
    /// Quantile of |wavelet response| used as noise threshold, in [0, 1].
    pub wavelet_threshold_quantile: f64,
    /// Samples per unit of kernel support.
    pub wavelet_kernel_resolution: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            mz_tolerance: 0.005,
            intensity_tolerance: 0.5,
            minimum_peak_height: 100.0,
            minimum_peak_duration: 0.0,
            wavelet_threshold_quantile: 0.8,
            wavelet_kernel_resolution: 60,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mz_tolerance >= 0.0) {
            return Err(ConfigError::OutOfDomain {
                parameter: "mz_tolerance",
                value: self.mz_tolerance,
            });
        }
        if !(0.0..1.0).contains(&self.intensity_tolerance) {
            return Err(ConfigError::OutOfDomain {
                parameter: "intensity_tolerance",
                value: self.intensity_tolerance,
            });
        }
        if !(self.minimum_peak_height >= 0.0) {
            return Err(ConfigError::OutOfDomain {
                parameter: "minimum_peak_height",
                value: self.minimum_peak_height,
            });
        }
        if !(self.minimum_peak_duration >= 0.0) {
            return Err(ConfigError::OutOfDomain {
                parameter: "minimum_peak_duration",
                value: self.minimum_peak_duration,
            });
        }
        if !(0.0..=1.0).contains(&self.wavelet_threshold_quantile) {
            return Err(ConfigError::OutOfDomain {
                parameter: "wavelet_threshold_quantile",
                value: self.wavelet_threshold_quantile,
            });
        }
        if self.wavelet_kernel_resolution == 0 {
            return Err(ConfigError::ZeroResolution);
        }
        Ok(())
    }
}
