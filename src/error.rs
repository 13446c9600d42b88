use thiserror::Error;

/// Error taxonomy for the inference engine.
#[derive(Error, Debug)]
pub enum NcnnError {
    #[error("allocation failed for {size} bytes")]
    AllocationFailed { size: usize },
    #[error("malformed topology: {0}")]
    MalformedTopology(String),
    #[error("malformed weights: {0}")]
    MalformedWeights(String),
    #[error("unknown layer type: {0}")]
    UnknownLayerType(String),
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("blob not found: {0}")]
    BlobNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NcnnError>;
