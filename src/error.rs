use thiserror::Error;

/// Coordinate values that cannot describe a point on the WGS-84 ellipsoid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate is not a finite number")]
    NotFinite,
}

/// Failures reported by the course, round and location repositories.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Malformed input rejected at the ingestion boundary.
#[derive(Error, Debug, Clone)]
pub enum IngestError {
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("invalid coordinate: {0}")]
    Coordinate(#[from] GeoError),
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: f64 },
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
