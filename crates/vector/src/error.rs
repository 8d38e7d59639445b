use thiserror::Error;

/// Errors raised while training, filling or querying an index
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorError {
    /// Dimension mismatch
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Fewer training points than clusters
    #[error("need at least {clusters} training points, got {points}")]
    InsufficientTrainingData { points: usize, clusters: usize },

    /// Index used before `train`
    #[error("index is not trained")]
    NotTrained,

    /// Non-finite component in a vector
    #[error("vector contains a non-finite component")]
    NonFinite,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
