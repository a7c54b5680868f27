use std::fmt::Display;

#[derive(Debug)]
pub enum FeatraceError {
    DataProcessingError(DataProcessingError),
    ConfigError(ConfigError),
}

impl Display for FeatraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataProcessingError {
    ExpectedNonEmptyData,
    InsufficientData { real: usize, expected: usize },
    SingularSystem,
    NonFiniteValue(f64),
}

impl Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExpectedNonEmptyData => write!(f, "Expected non-empty data"),
            Self::InsufficientData { real, expected } => {
                write!(f, "Insufficient data: got {}, expected {}", real, expected)
            }
            Self::SingularSystem => write!(f, "Singular system of equations"),
            Self::NonFiniteValue(v) => write!(f, "Non-finite value: {}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    OutOfDomain {
        parameter: &'static str,
        value: f64,
    },
    ZeroResolution,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfDomain { parameter, value } => {
                write!(f, "Parameter {} out of domain: {}", parameter, value)
            }
            Self::ZeroResolution => write!(f, "Wavelet kernel resolution must be > 0"),
        }
    }
}

impl From<DataProcessingError> for FeatraceError {
    fn from(e: DataProcessingError) -> Self {
        FeatraceError::DataProcessingError(e)
    }
}

impl From<ConfigError> for FeatraceError {
    fn from(e: ConfigError) -> Self {
        FeatraceError::ConfigError(e)
    }
}
